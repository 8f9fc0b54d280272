//! One dashboard: the state container plus every coordinator that writes
//! to it.

use std::sync::Arc;
use std::time::Duration;

use common::{City, DashboardConfig, NewsSource, PriceSource, WeatherSource};
use tokio::task::JoinHandle;
use tracing::info;

use crate::alerts::{AlertManager, AlertSettings};
use crate::crypto::{CryptoCoordinator, PollGuard};
use crate::gate::SourceGate;
use crate::generation::Outcome;
use crate::news::NewsCoordinator;
use crate::preferences::FavoriteSet;
use crate::store::{DashboardState, StateHandle};
use crate::watchlist::{Watchlist, WatchlistCoordinator};
use crate::weather::{active_cities, WeatherCoordinator};

pub struct Dashboard<P, W, N> {
    state: StateHandle,
    crypto: CryptoCoordinator<P>,
    watchlist: WatchlistCoordinator<P>,
    weather: WeatherCoordinator<W>,
    news: NewsCoordinator<N>,
    alerts: AlertManager,
    cities: Vec<City>,
    poll_period: Duration,
}

impl<P, W, N> Dashboard<P, W, N>
where
    P: PriceSource,
    W: WeatherSource,
    N: NewsSource,
{
    /// Build a dashboard seeded with the configured watchlist.
    pub fn new(
        config: &DashboardConfig,
        prices: Arc<P>,
        weather: SourceGate<W>,
        news: SourceGate<N>,
    ) -> Self {
        let state = StateHandle::new(DashboardState {
            watchlist: Watchlist::from_ids(&config.watchlist),
            ..DashboardState::default()
        });

        let crypto = CryptoCoordinator::new(prices, state.clone());
        Self {
            watchlist: WatchlistCoordinator::new(state.clone(), crypto.clone()),
            weather: WeatherCoordinator::new(weather, state.clone(), config.weather.batch_policy),
            news: NewsCoordinator::new(news, state.clone(), config.news.clone()),
            alerts: AlertManager::new(state.clone(), AlertSettings::from(&config.alerts)),
            crypto,
            cities: config.cities.clone(),
            poll_period: Duration::from_secs(config.timing.crypto_poll_secs.max(1)),
            state,
        }
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Start price polling. Polling stops when the guard is dropped.
    pub fn activate(&self) -> PollGuard {
        self.crypto.activate(self.poll_period)
    }

    pub fn watchlist(&self) -> &WatchlistCoordinator<P> {
        &self.watchlist
    }

    pub async fn refresh_prices(&self) -> Outcome {
        self.crypto.refresh(self.state.watchlist_ids()).await
    }

    // ── Weather ──────────────────────────────────────────────────────

    /// Cities currently shown: favorites, or the configured defaults.
    pub fn active_cities(&self) -> Vec<City> {
        self.state.read(|s| active_cities(&s.preferences, &self.cities))
    }

    pub async fn refresh_weather(&self) -> Outcome {
        self.weather.refresh_batch(self.active_cities()).await
    }

    pub async fn search_city(&self, query: &str) -> Outcome {
        self.weather.search_city(query).await
    }

    // ── News ─────────────────────────────────────────────────────────

    pub async fn refresh_news(&self) -> Outcome {
        self.news.refresh().await
    }

    // ── Preferences ──────────────────────────────────────────────────

    pub fn add_favorite_crypto(&self, id: &str) -> bool {
        self.state.update_if(|s| s.preferences.add_favorite_crypto(id))
    }

    pub fn remove_favorite_crypto(&self, id: &str) -> bool {
        self.state.update_if(|s| s.preferences.remove_favorite_crypto(id))
    }

    /// Returns the weather refresh for the new city set, if the favorites
    /// changed.
    pub fn add_favorite_city(&self, name: &str) -> Option<JoinHandle<Outcome>> {
        self.edit_cities(|favorites| favorites.add_favorite_city(name))
    }

    pub fn remove_favorite_city(&self, name: &str) -> Option<JoinHandle<Outcome>> {
        self.edit_cities(|favorites| favorites.remove_favorite_city(name))
    }

    pub fn toggle_favorite(&self, name: &str) -> Option<JoinHandle<Outcome>> {
        self.edit_cities(|favorites| favorites.toggle_favorite(name))
    }

    fn edit_cities(&self, f: impl FnOnce(&mut FavoriteSet) -> bool) -> Option<JoinHandle<Outcome>> {
        let mut claimed = None;
        self.state.update_if(|s| {
            if !f(&mut s.preferences) {
                return false;
            }
            let cities = active_cities(&s.preferences, &self.cities);
            claimed = Some((self.weather.begin_batch_in(s), cities));
            true
        });
        let (generation, cities) = claimed?;
        info!("Favorite cities changed; refreshing {} cities", cities.len());
        Some(self.weather.spawn_run_batch(generation, cities))
    }

    // ── Alerts ───────────────────────────────────────────────────────

    pub fn start_alerts(&mut self) {
        self.alerts.start();
    }

    pub fn stop_alerts(&mut self) {
        self.alerts.stop();
    }

    /// Run every feed once: prices, weather and news concurrently.
    pub async fn refresh_all(&self) -> (Outcome, Outcome, Outcome) {
        tokio::join!(
            self.refresh_prices(),
            self.refresh_weather(),
            self.refresh_news()
        )
    }
}
