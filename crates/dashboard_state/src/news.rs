//! News coordinator. Failures keep the last headlines on screen.

use common::config::NewsConfig;
use common::{FetchState, NewsSource};
use tracing::{debug, error, warn};

use crate::gate::SourceGate;
use crate::generation::{Generation, Outcome};
use crate::store::StateHandle;

pub const NEWS_FAILURE: &str = "Failed to fetch news.";

pub struct NewsCoordinator<N> {
    source: SourceGate<N>,
    state: StateHandle,
    settings: NewsConfig,
    generation: Generation,
}

impl<N> Clone for NewsCoordinator<N> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            state: self.state.clone(),
            settings: self.settings.clone(),
            generation: self.generation.clone(),
        }
    }
}

impl<N: NewsSource> NewsCoordinator<N> {
    pub fn new(source: SourceGate<N>, state: StateHandle, settings: NewsConfig) -> Self {
        Self {
            source,
            state,
            settings,
            generation: Generation::new(),
        }
    }

    pub async fn refresh(&self) -> Outcome {
        let generation = self.generation.issue();
        self.state.update(|s| s.news.fetch = FetchState::loading());

        let result = match self.source.source() {
            Ok(source) => source
                .fetch_news(&self.settings.query, &self.settings.language)
                .await
                .map_err(|e| {
                    warn!("News refresh failed: {}", e);
                    e.display_message(NEWS_FAILURE)
                }),
            Err(e) => {
                error!("News feed unavailable: {}", e);
                Err(e.display_message(NEWS_FAILURE))
            }
        };

        let mut outcome = Outcome::Superseded;
        self.state.update_if(|s| {
            if !self.generation.is_current(generation) {
                return false;
            }
            match &result {
                Ok(articles) => {
                    s.news.articles = articles
                        .iter()
                        .take(self.settings.max_articles)
                        .cloned()
                        .collect();
                    s.news.fetch = FetchState::succeeded();
                    outcome = Outcome::Succeeded;
                }
                Err(message) => {
                    s.news.fetch = FetchState::failed(message.clone());
                    outcome = Outcome::Failed;
                }
            }
            true
        });

        if outcome == Outcome::Superseded {
            debug!("Discarded news response for generation {}", generation);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{article, FakeNews};
    use common::{Error, FetchStatus};
    use std::sync::Arc;

    fn setup() -> (Arc<FakeNews>, StateHandle, NewsCoordinator<FakeNews>) {
        let source = Arc::new(FakeNews::default());
        let state = StateHandle::default();
        let news = NewsCoordinator::new(
            SourceGate::Ready(source.clone()),
            state.clone(),
            NewsConfig::default(),
        );
        (source, state, news)
    }

    #[tokio::test]
    async fn test_keeps_top_five() {
        let (source, state, news) = setup();
        source.push(Ok((1..=8).map(|i| article(&format!("Story {i}"))).collect()));

        assert_eq!(news.refresh().await, Outcome::Succeeded);

        let snap = state.snapshot();
        assert_eq!(snap.news.articles.len(), 5);
        assert_eq!(snap.news.articles[0].title, "Story 1");
        assert_eq!(snap.news.fetch.status, FetchStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_error_body_fails_but_keeps_articles() {
        let (source, state, news) = setup();
        source.push(Ok(vec![article("Bitcoin rallies")]));
        source.push(Err(Error::Upstream {
            status: 200,
            message: "API key is invalid".into(),
        }));

        news.refresh().await;
        assert_eq!(news.refresh().await, Outcome::Failed);

        let snap = state.snapshot();
        assert_eq!(snap.news.articles.len(), 1);
        assert_eq!(snap.news.fetch, FetchState::failed("API key is invalid"));
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let state = StateHandle::default();
        let gate: SourceGate<FakeNews> = SourceGate::Blocked("NEWSDATA_API_KEY is not configured".into());
        let news = NewsCoordinator::new(gate, state.clone(), NewsConfig::default());

        assert_eq!(news.refresh().await, Outcome::Failed);
        assert_eq!(
            state.snapshot().news.fetch.last_error.as_deref(),
            Some("NEWSDATA_API_KEY is not configured")
        );
    }

    #[tokio::test]
    async fn test_transport_error_uses_generic_message() {
        let (source, state, news) = setup();
        source.push(Err(Error::Http("dns failure".into())));

        news.refresh().await;

        assert_eq!(state.snapshot().news.fetch, FetchState::failed(NEWS_FAILURE));
        assert_eq!(source.calls(), 1);
    }
}
