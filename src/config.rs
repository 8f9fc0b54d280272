//! Configuration loader: merges env vars, .env file, and config.toml.

use common::config::{BatchPolicy, NEWS_KEY_ENV, WEATHER_KEY_ENV};
use common::{DashboardConfig, Error};
use std::path::Path;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_config(config: &DashboardConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.cities.is_empty() {
        issues.push("cities must contain at least one default city".into());
    }
    if config.cities.iter().any(|c| c.name.trim().is_empty()) {
        issues.push("cities entries must have a name".into());
    }

    if config.timing.crypto_poll_secs == 0 {
        issues.push("timing.crypto_poll_secs must be > 0".into());
    }
    if config.timing.heartbeat_secs == 0 {
        issues.push("timing.heartbeat_secs must be > 0".into());
    }
    if config.timing.http_timeout_secs == 0 {
        issues.push("timing.http_timeout_secs must be > 0".into());
    }

    if config.alerts.period_secs == 0 {
        issues.push("alerts.period_secs must be > 0".into());
    }
    if config.alerts.capacity == 0 {
        issues.push("alerts.capacity must be > 0".into());
    }

    if config.news.max_articles == 0 {
        issues.push("news.max_articles must be > 0".into());
    }
    if config.news.query.trim().is_empty() {
        issues.push("news.query must not be empty".into());
    }

    for (name, url) in [
        ("endpoints.coingecko_base_url", &config.endpoints.coingecko_base_url),
        ("endpoints.openweather_base_url", &config.endpoints.openweather_base_url),
        ("endpoints.newsdata_base_url", &config.endpoints.newsdata_base_url),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            issues.push(format!("{name} must be an http(s) URL"));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load dashboard configuration from environment and optional config file.
///
/// Missing API keys are not an error here: they close the matching feed
/// and are reported when the dashboard is built.
pub fn load_config() -> Result<DashboardConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = DashboardConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(key) = std::env::var(WEATHER_KEY_ENV) {
        config.openweather_api_key = key;
    }
    if let Ok(key) = std::env::var(NEWS_KEY_ENV) {
        config.newsdata_api_key = key;
    }
    if let Ok(raw) = std::env::var("NEXUS_CRYPTO_POLL_SECS") {
        config.timing.crypto_poll_secs = parse_positive_u64(&raw, "NEXUS_CRYPTO_POLL_SECS")?;
    }
    if let Ok(raw) = std::env::var("NEXUS_WEATHER_BATCH_POLICY") {
        config.weather.batch_policy = raw.parse::<BatchPolicy>()?;
    }
    if let Ok(raw) = std::env::var("NEXUS_WATCHLIST") {
        config.watchlist = parse_id_list(&raw);
    }
    if let Ok(url) = std::env::var("COINGECKO_BASE_URL") {
        config.endpoints.coingecko_base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Ok(url) = std::env::var("OPENWEATHER_BASE_URL") {
        config.endpoints.openweather_base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Ok(url) = std::env::var("NEWSDATA_BASE_URL") {
        config.endpoints.newsdata_base_url = url.trim().trim_end_matches('/').to_string();
    }

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}
