//! Scripted sources for coordinator tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use common::{
    City, Error, NewsArticle, NewsSource, PriceQuote, PriceSource, WeatherSnapshot, WeatherSource,
};

pub fn quote(id: &str, price: f64) -> PriceQuote {
    PriceQuote {
        asset_id: id.to_string(),
        price_usd: Some(price),
        market_cap_usd: Some(price * 1_000.0),
        change_24h_pct: Some(0.5),
        fetched_at: Utc::now(),
    }
}

pub fn snapshot(name: &str, temp: f64) -> WeatherSnapshot {
    WeatherSnapshot {
        city_id: None,
        city_name: name.to_string(),
        temp_c: Some(temp),
        feels_like_c: Some(temp - 1.0),
        humidity_pct: Some(50.0),
        wind_speed_ms: Some(3.0),
        condition_code: Some(800),
        condition_text: Some("clear sky".into()),
        fetched_at: Utc::now(),
    }
}

pub fn article(title: &str) -> NewsArticle {
    NewsArticle {
        title: title.to_string(),
        description: None,
        link: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
        published_at: None,
        image_url: None,
    }
}

// ── Prices ────────────────────────────────────────────────────────────

/// Answers from a queue of scripted responses; once the queue is empty,
/// every requested id gets a quote at 1.0.
#[derive(Default)]
pub struct FakePrices {
    script: Mutex<VecDeque<(Duration, Result<Vec<PriceQuote>, String>)>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakePrices {
    pub fn push_ok(&self, delay: Duration, quotes: Vec<PriceQuote>) {
        self.script.lock().unwrap().push_back((delay, Ok(quotes)));
    }

    pub fn push_err(&self, delay: Duration, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back((delay, Err(message.to_string())));
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl PriceSource for FakePrices {
    async fn fetch_prices(&self, ids: &[String]) -> Result<Vec<PriceQuote>, Error> {
        let next = {
            self.calls.lock().unwrap().push(ids.to_vec());
            self.script.lock().unwrap().pop_front()
        };
        let (delay, result) = next.unwrap_or_else(|| {
            (Duration::ZERO, Ok(ids.iter().map(|id| quote(id, 1.0)).collect()))
        });
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result.map_err(Error::Http)
    }
}

// ── Weather ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum CityScript {
    Ok { delay: Duration, temp: f64 },
    Fail { delay: Duration, error: fn() -> Error },
}

/// Per-city scripted weather. Unscripted cities succeed at 20°C.
#[derive(Default)]
pub struct FakeWeather {
    cities: Mutex<HashMap<String, CityScript>>,
    calls: AtomicUsize,
}

impl FakeWeather {
    pub fn script(&self, name: &str, script: CityScript) {
        self.cities.lock().unwrap().insert(name.to_string(), script);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(&self, name: &str) -> Result<WeatherSnapshot, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.cities.lock().unwrap().get(name).cloned();
        match script {
            Some(CityScript::Ok { delay, temp }) => {
                tokio::time::sleep(delay).await;
                Ok(snapshot(name, temp))
            }
            Some(CityScript::Fail { delay, error }) => {
                tokio::time::sleep(delay).await;
                Err(error())
            }
            None => Ok(snapshot(name, 20.0)),
        }
    }
}

impl WeatherSource for FakeWeather {
    async fn fetch_city(&self, city: &City) -> Result<WeatherSnapshot, Error> {
        let mut snap = self.answer(&city.name).await?;
        snap.city_id = city.id.clone();
        Ok(snap)
    }

    async fn search(&self, query: &str) -> Result<WeatherSnapshot, Error> {
        self.answer(query).await
    }
}

pub fn not_found() -> Error {
    Error::Upstream {
        status: 404,
        message: "city not found".into(),
    }
}

pub fn connection_reset() -> Error {
    Error::Http("connection reset".into())
}

// ── News ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeNews {
    script: Mutex<VecDeque<Result<Vec<NewsArticle>, Error>>>,
    calls: AtomicUsize,
}

impl FakeNews {
    pub fn push(&self, result: Result<Vec<NewsArticle>, Error>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NewsSource for FakeNews {
    async fn fetch_news(&self, _query: &str, _language: &str) -> Result<Vec<NewsArticle>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}
