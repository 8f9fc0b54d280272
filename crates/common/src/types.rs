//! Domain types shared across the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Price types ───────────────────────────────────────────────────────

/// Latest USD quote for one tracked asset.
///
/// The numeric fields are optional: the price endpoint omits some of them
/// for thinly traded assets, and a missing field is shown as unavailable
/// rather than failing the whole refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub asset_id: String,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub change_24h_pct: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

// ── Weather types ─────────────────────────────────────────────────────

/// A city the weather feed can be asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Display name, also used for lookup when `id` is absent.
    pub name: String,
    /// Upstream city id.
    #[serde(default)]
    pub id: Option<String>,
}

impl City {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Some(id.into()),
        }
    }

    /// A city known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }
}

/// Cities shown when the user has no favorites.
pub fn default_cities() -> Vec<City> {
    vec![
        City::new("London", "2643743"),
        City::new("New York", "5128581"),
        City::new("Tokyo", "1850147"),
        City::new("Paris", "2988507"),
        City::new("Dubai", "292223"),
    ]
}

/// Current conditions for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city_id: Option<String>,
    pub city_name: String,
    pub temp_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub condition_code: Option<u32>,
    pub condition_text: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

// ── News types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub description: Option<String>,
    pub link: String,
    pub published_at: Option<String>,
    pub image_url: Option<String>,
}

// ── Alert types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

/// Unique, monotonically assigned alert identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlertId(pub u64);

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "alert-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub severity: Severity,
    pub message: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ── Fetch status ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Status of the most recent retrieval for one coordinator.
///
/// `Loading` is advisory: overlapping refreshes are allowed and the status
/// reflects whichever request was issued last.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FetchState {
    pub status: FetchStatus,
    pub last_error: Option<String>,
}

impl FetchState {
    pub fn loading() -> Self {
        Self {
            status: FetchStatus::Loading,
            last_error: None,
        }
    }

    pub fn succeeded() -> Self {
        Self {
            status: FetchStatus::Succeeded,
            last_error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: FetchStatus::Failed,
            last_error: Some(message.into()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}
