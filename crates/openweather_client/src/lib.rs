//! OpenWeather current-conditions client.
//!
//! Looks cities up by id or by free-text name on the `weather` endpoint
//! and converts the payload to the shared `WeatherSnapshot` format.

use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{City, Error, WeatherSnapshot, WeatherSource};
use serde::Deserialize;
use tracing::debug;

/// OpenWeather API client.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Response from `GET /weather`.
///
/// Every block is optional: a city record with a missing measurement is
/// still a valid snapshot, the field is just unavailable.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeatherResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub main: Option<MainBlock>,
    #[serde(default)]
    pub wind: Option<WindBlock>,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainBlock {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindBlock {
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionBlock {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Error body, e.g. `{"cod":"404","message":"city not found"}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

enum Lookup<'a> {
    Id(&'a str),
    Name(&'a str),
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("nexus-dashboard/0.1")
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()
            .expect("failed to build OpenWeather HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn fetch_current(
        &self,
        lookup: Lookup<'_>,
        label: &str,
    ) -> Result<CurrentWeatherResponse, Error> {
        let url = format!("{}/weather", self.base_url);
        let (key, value) = match lookup {
            Lookup::Id(id) => ("id", id),
            Lookup::Name(name) => ("q", name),
        };

        debug!("Fetching OpenWeather conditions: {} {}={}", url, key, value);

        let resp = self
            .client
            .get(&url)
            .query(&[
                (key, value),
                ("units", "metric"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("OpenWeather request for {label} failed: {e}")))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Http(format!("OpenWeather body for {label}: {e}")))?;

        if !(200..300).contains(&status) {
            return Err(Error::Upstream {
                status,
                message: upstream_message(&body)
                    .unwrap_or_else(|| format!("Failed to fetch weather for {label}")),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl WeatherSource for OpenWeatherClient {
    async fn fetch_city(&self, city: &City) -> Result<WeatherSnapshot, Error> {
        let lookup = match city.id.as_deref() {
            Some(id) => Lookup::Id(id),
            None => Lookup::Name(&city.name),
        };
        let payload = self.fetch_current(lookup, &city.name).await?;
        Ok(to_snapshot(Some(city), payload, Utc::now()))
    }

    async fn search(&self, query: &str) -> Result<WeatherSnapshot, Error> {
        let payload = self.fetch_current(Lookup::Name(query), query).await?;
        let mut snapshot = to_snapshot(None, payload, Utc::now());
        if snapshot.city_name.is_empty() {
            snapshot.city_name = query.to_string();
        }
        Ok(snapshot)
    }
}

fn upstream_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()?
        .message
        .filter(|m| !m.trim().is_empty())
}

/// Build a snapshot. The requested city's name and id win over the
/// payload's so snapshots line up with what the caller asked for.
fn to_snapshot(
    requested: Option<&City>,
    payload: CurrentWeatherResponse,
    now: DateTime<Utc>,
) -> WeatherSnapshot {
    let main = payload.main.as_ref();
    let condition = payload.weather.first();

    WeatherSnapshot {
        city_id: requested
            .and_then(|c| c.id.clone())
            .or_else(|| payload.id.map(|id| id.to_string())),
        city_name: requested
            .map(|c| c.name.clone())
            .or(payload.name.clone())
            .unwrap_or_default(),
        temp_c: main.and_then(|m| m.temp),
        feels_like_c: main.and_then(|m| m.feels_like),
        humidity_pct: main.and_then(|m| m.humidity),
        wind_speed_ms: payload.wind.as_ref().and_then(|w| w.speed),
        condition_code: condition.and_then(|c| c.id),
        condition_text: condition.and_then(|c| c.description.clone()),
        fetched_at: now,
    }
}
