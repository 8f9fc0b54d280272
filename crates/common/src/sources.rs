//! Request/response contracts for the three upstream feeds.
//!
//! The HTTP clients implement these; coordinators only see the traits, so
//! tests can drive them with scripted fakes.

use std::future::Future;

use crate::types::{City, NewsArticle, PriceQuote, WeatherSnapshot};
use crate::Result;

/// Batched USD quotes for a set of asset ids.
pub trait PriceSource: Send + Sync + 'static {
    /// Quotes for every id the upstream knows about. Unknown ids are left
    /// out of the result rather than reported as errors.
    fn fetch_prices(&self, ids: &[String]) -> impl Future<Output = Result<Vec<PriceQuote>>> + Send;
}

/// Current conditions, per city or by free-text name.
pub trait WeatherSource: Send + Sync + 'static {
    fn fetch_city(&self, city: &City) -> impl Future<Output = Result<WeatherSnapshot>> + Send;

    fn search(&self, query: &str) -> impl Future<Output = Result<WeatherSnapshot>> + Send;
}

/// Headlines filtered by query and language.
pub trait NewsSource: Send + Sync + 'static {
    fn fetch_news(
        &self,
        query: &str,
        language: &str,
    ) -> impl Future<Output = Result<Vec<NewsArticle>>> + Send;
}
