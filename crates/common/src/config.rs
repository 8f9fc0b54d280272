//! Dashboard configuration types.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{default_cities, City};

pub const WEATHER_KEY_ENV: &str = "OPENWEATHER_API_KEY";
pub const NEWS_KEY_ENV: &str = "NEWSDATA_API_KEY";

/// Top-level dashboard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// OpenWeather API key. Required by the weather feed.
    #[serde(default)]
    pub openweather_api_key: String,

    /// newsdata.io API key. Required by the news feed.
    #[serde(default)]
    pub newsdata_api_key: String,

    /// Asset ids tracked on startup.
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,

    /// Cities shown while no favorite city is set.
    #[serde(default = "default_cities")]
    pub cities: Vec<City>,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub news: NewsConfig,

    #[serde(default)]
    pub endpoints: EndpointConfig,
}

/// Timing configuration (all values in seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Price poll interval while the dashboard is active.
    #[serde(default = "default_crypto_poll")]
    pub crypto_poll_secs: u64,

    /// Interval of the state summary log line.
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

/// Simulated alert feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between generated alerts.
    #[serde(default = "default_alert_period")]
    pub period_secs: u64,

    /// Seconds an alert stays visible.
    #[serde(default = "default_alert_ttl")]
    pub ttl_secs: u64,

    /// Maximum buffered alerts; the oldest is evicted on overflow.
    #[serde(default = "default_alert_capacity")]
    pub capacity: usize,
}

/// How a weather batch treats a failure of one city.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Any failed city fails the batch and clears the list.
    #[default]
    AllOrNothing,
    /// Successful cities are kept; failures are reported in the fetch state.
    PerCity,
}

impl std::str::FromStr for BatchPolicy {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all_or_nothing" | "all-or-nothing" => Ok(BatchPolicy::AllOrNothing),
            "per_city" | "per-city" => Ok(BatchPolicy::PerCity),
            other => Err(Error::Config(format!(
                "unknown weather batch policy '{other}' (expected all_or_nothing or per_city)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub batch_policy: BatchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_query")]
    pub query: String,
    #[serde(default = "default_news_language")]
    pub language: String,
    /// Articles kept from each response.
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
}

/// Upstream base URLs, overridable for staging mirrors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_coingecko_url")]
    pub coingecko_base_url: String,
    #[serde(default = "default_openweather_url")]
    pub openweather_base_url: String,
    #[serde(default = "default_newsdata_url")]
    pub newsdata_base_url: String,
}

impl DashboardConfig {
    /// The weather key, or the configuration failure that blocks the feed.
    pub fn weather_api_key(&self) -> Result<&str, Error> {
        require_secret(&self.openweather_api_key, WEATHER_KEY_ENV, "weather")
    }

    /// The news key, or the configuration failure that blocks the feed.
    pub fn news_api_key(&self) -> Result<&str, Error> {
        require_secret(&self.newsdata_api_key, NEWS_KEY_ENV, "news")
    }
}

fn require_secret<'a>(value: &'a str, env_name: &str, feature: &str) -> Result<&'a str, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Config(format!(
            "{env_name} is not configured; the {feature} feed is disabled (set it in .env or environment)"
        )));
    }
    Ok(trimmed)
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_watchlist() -> Vec<String> {
    vec!["bitcoin".into(), "ethereum".into(), "dogecoin".into()]
}
fn default_crypto_poll() -> u64 {
    60
}
fn default_heartbeat() -> u64 {
    30
}
fn default_http_timeout() -> u64 {
    30
}
fn default_alert_period() -> u64 {
    30
}
fn default_alert_ttl() -> u64 {
    5
}
fn default_alert_capacity() -> usize {
    3
}
fn default_news_query() -> String {
    "cryptocurrency".into()
}
fn default_news_language() -> String {
    "en".into()
}
fn default_max_articles() -> usize {
    5
}
fn default_coingecko_url() -> String {
    "https://api.coingecko.com/api/v3".into()
}
fn default_openweather_url() -> String {
    "https://api.openweathermap.org/data/2.5".into()
}
fn default_newsdata_url() -> String {
    "https://newsdata.io/api/1".into()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: String::new(),
            newsdata_api_key: String::new(),
            watchlist: default_watchlist(),
            cities: default_cities(),
            timing: TimingConfig::default(),
            alerts: AlertConfig::default(),
            weather: WeatherConfig::default(),
            news: NewsConfig::default(),
            endpoints: EndpointConfig::default(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            crypto_poll_secs: default_crypto_poll(),
            heartbeat_secs: default_heartbeat(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            period_secs: default_alert_period(),
            ttl_secs: default_alert_ttl(),
            capacity: default_alert_capacity(),
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            query: default_news_query(),
            language: default_news_language(),
            max_articles: default_max_articles(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            coingecko_base_url: default_coingecko_url(),
            openweather_base_url: default_openweather_url(),
            newsdata_base_url: default_newsdata_url(),
        }
    }
}
