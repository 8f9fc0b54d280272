//! newsdata.io headline client.
//!
//! The endpoint answers some failures with HTTP 200 and
//! `{"status":"error", ...}`, so the body status is checked on every
//! response, not just the transport status.

use std::time::Duration;

use common::{Error, NewsArticle, NewsSource};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const GENERIC_FAILURE: &str = "News provider reported an error";

/// newsdata.io API client.
#[derive(Debug, Clone)]
pub struct NewsDataClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Response envelope from `GET /news`.
///
/// `results` is an article list on success and an error object otherwise.
#[derive(Debug, Deserialize)]
pub struct NewsResponse {
    pub status: String,
    #[serde(default)]
    pub results: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewsDataClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("nexus-dashboard/0.1")
            .timeout(timeout)
            .build()
            .expect("failed to build newsdata HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

impl NewsSource for NewsDataClient {
    async fn fetch_news(&self, query: &str, language: &str) -> Result<Vec<NewsArticle>, Error> {
        let url = format!("{}/news", self.base_url);

        debug!("Fetching news: {} q={} language={}", url, query, language);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("q", query),
                ("language", language),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("newsdata request failed: {e}")))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Http(format!("newsdata body: {e}")))?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<NewsResponse>(&body)
                .ok()
                .and_then(|r| error_message(&r.results))
                .unwrap_or_else(|| GENERIC_FAILURE.to_string());
            return Err(Error::Upstream { status, message });
        }

        let parsed: NewsResponse = serde_json::from_str(&body)?;
        into_articles(status, parsed)
    }
}

fn error_message(results: &Value) -> Option<String> {
    results
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Validate the envelope and keep articles that have a title and a link.
fn into_articles(http_status: u16, parsed: NewsResponse) -> Result<Vec<NewsArticle>, Error> {
    if parsed.status != "success" {
        return Err(Error::Upstream {
            status: http_status,
            message: error_message(&parsed.results).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        });
    }

    let raw: Vec<RawArticle> = match parsed.results {
        Value::Null => Vec::new(),
        other => serde_json::from_value(other)
            .map_err(|e| Error::Parse(format!("newsdata results: {e}")))?,
    };

    Ok(raw
        .into_iter()
        .filter_map(|a| {
            Some(NewsArticle {
                title: a.title?,
                link: a.link?,
                description: a.description.filter(|d| !d.trim().is_empty()),
                published_at: a.pub_date,
                image_url: a.image_url,
            })
        })
        .collect())
}
