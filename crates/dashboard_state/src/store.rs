//! Central state container.
//!
//! The whole dashboard tree lives in one `watch` channel. Writers mutate it
//! through synchronous closures, so a reader never sees a half-applied
//! update, and subscribers are woken only when a write reports a change.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use common::{Alert, FetchState, NewsArticle, PriceQuote, WeatherSnapshot};
use serde::Serialize;
use tokio::sync::watch;

use crate::preferences::FavoriteSet;
use crate::watchlist::Watchlist;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CryptoState {
    /// Replaced wholesale by each applied response; kept on failure.
    pub quotes: BTreeMap<String, PriceQuote>,
    pub fetch: FetchState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CitySearch {
    pub query: Option<String>,
    pub result: Option<WeatherSnapshot>,
    pub fetch: FetchState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherState {
    /// Aligned to the order of the last applied batch; cleared on failure.
    pub snapshots: Vec<WeatherSnapshot>,
    pub fetch: FetchState,
    /// Free-text lookup slot, independent of `snapshots`.
    pub search: CitySearch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewsState {
    pub articles: Vec<NewsArticle>,
    pub fetch: FetchState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertFeed {
    /// Newest first.
    pub items: VecDeque<Alert>,
    pub connected: bool,
}

/// Everything a view can render.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardState {
    pub crypto: CryptoState,
    pub weather: WeatherState,
    pub news: NewsState,
    pub alerts: AlertFeed,
    pub preferences: FavoriteSet,
    pub watchlist: Watchlist,
}

/// Shared handle to the dashboard state tree.
#[derive(Debug, Clone)]
pub struct StateHandle {
    tx: Arc<watch::Sender<DashboardState>>,
}

impl StateHandle {
    pub fn new(initial: DashboardState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Owned copy of the current tree.
    pub fn snapshot(&self) -> DashboardState {
        self.tx.borrow().clone()
    }

    /// Run a read-only query against the current tree.
    pub fn read<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Apply a write and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut DashboardState)) {
        self.tx.send_modify(f);
    }

    /// Apply a write that may decide it changed nothing. Subscribers are
    /// only notified when `f` returns true.
    pub fn update_if(&self, f: impl FnOnce(&mut DashboardState) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    /// Receiver that is marked changed after every notifying write.
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.tx.subscribe()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn quote(&self, asset_id: &str) -> Option<PriceQuote> {
        self.read(|s| s.crypto.quotes.get(asset_id).cloned())
    }

    pub fn watchlist_ids(&self) -> Vec<String> {
        self.read(|s| s.watchlist.ids().to_vec())
    }

    pub fn is_favorite_city(&self, name: &str) -> bool {
        self.read(|s| s.preferences.is_favorite_city(name))
    }

    pub fn is_favorite_crypto(&self, id: &str) -> bool {
        self.read(|s| s.preferences.is_favorite_crypto(id))
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.read(|s| s.alerts.items.iter().cloned().collect())
    }

    pub fn weather_snapshots(&self) -> Vec<WeatherSnapshot> {
        self.read(|s| s.weather.snapshots.clone())
    }
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new(DashboardState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_if_false_does_not_notify() {
        let state = StateHandle::default();
        let mut rx = state.subscribe();

        let changed = state.update_if(|_| false);
        assert!(!changed);
        assert!(!rx.has_changed().unwrap());

        state.update(|s| s.alerts.connected = true);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().alerts.connected);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let state = StateHandle::default();
        let before = state.snapshot();
        state.update(|s| {
            s.watchlist.add("bitcoin");
        });
        assert!(before.watchlist.is_empty());
        assert_eq!(state.watchlist_ids(), vec!["bitcoin".to_string()]);
    }
}
