//! Tracked asset ids.

use common::PriceSource;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::info;

use crate::crypto::CryptoCoordinator;
use crate::generation::Outcome;
use crate::store::StateHandle;

/// Ordered, duplicate-free list of asset ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Watchlist {
    ids: Vec<String>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `ids`, keeping the first occurrence of each.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for id in ids {
            list.add(id.as_ref());
        }
        list
    }

    /// Append `id` unless it is already tracked.
    pub fn add(&mut self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() || self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| existing != id.trim());
        self.ids.len() != before
    }

    /// Case-insensitive substring match, in list order.
    pub fn filter(&self, query: &str) -> Vec<String> {
        let needle = query.trim().to_lowercase();
        self.ids
            .iter()
            .filter(|id| id.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Turn free search text into an asset id: "Shiba Inu " → "shiba-inu".
pub fn normalize_search(query: &str) -> Option<String> {
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    Some(words.join("-").to_lowercase())
}

/// Watchlist edits against the state container. Every effective edit
/// triggers a price refresh for the new id set.
pub struct WatchlistCoordinator<P> {
    state: StateHandle,
    crypto: CryptoCoordinator<P>,
}

impl<P> Clone for WatchlistCoordinator<P> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            crypto: self.crypto.clone(),
        }
    }
}

impl<P: PriceSource> WatchlistCoordinator<P> {
    pub fn new(state: StateHandle, crypto: CryptoCoordinator<P>) -> Self {
        Self { state, crypto }
    }

    /// Returns the triggered refresh, or `None` if `id` was already tracked.
    pub fn add(&self, id: &str) -> Option<JoinHandle<Outcome>> {
        let (generation, ids) = self.edit(|list| list.add(id))?;
        info!("Watchlist +{} ({} tracked)", id.trim(), ids.len());
        Some(self.crypto.spawn_run(generation, ids))
    }

    /// Returns the triggered refresh, or `None` if `id` was not tracked.
    pub fn remove(&self, id: &str) -> Option<JoinHandle<Outcome>> {
        let (generation, ids) = self.edit(|list| list.remove(id))?;
        info!("Watchlist -{} ({} tracked)", id.trim(), ids.len());
        Some(self.crypto.spawn_run(generation, ids))
    }

    /// Add the asset named by free search text.
    pub fn add_from_search(&self, query: &str) -> Option<JoinHandle<Outcome>> {
        let id = normalize_search(query)?;
        self.add(&id)
    }

    pub fn filter(&self, query: &str) -> Vec<String> {
        self.state.read(|s| s.watchlist.filter(query))
    }

    /// Apply `f` and, if it changed the list, claim a price refresh for the
    /// new id set in the same write.
    fn edit(&self, f: impl FnOnce(&mut Watchlist) -> bool) -> Option<(u64, Vec<String>)> {
        let mut claimed = None;
        self.state.update_if(|s| {
            if !f(&mut s.watchlist) {
                return false;
            }
            claimed = Some((self.crypto.begin_in(s), s.watchlist.ids().to_vec()));
            true
        });
        claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePrices;
    use std::sync::Arc;

    #[test]
    fn test_filter_eth() {
        let list = Watchlist::from_ids(["bitcoin", "ethereum", "dogecoin"]);
        assert_eq!(list.filter("eth"), vec!["ethereum".to_string()]);
        assert_eq!(list.filter("ETH"), vec!["ethereum".to_string()]);
        assert_eq!(list.filter("coin"), vec!["bitcoin".to_string(), "dogecoin".to_string()]);
        assert_eq!(list.filter("").len(), 3);
        assert_eq!(list.len(), 3, "filter must not mutate");
    }

    #[test]
    fn test_add_remove_sequence_keeps_order_without_duplicates() {
        let mut list = Watchlist::new();
        let ops: [(bool, &str); 10] = [
            (true, "bitcoin"),
            (true, "ethereum"),
            (true, "bitcoin"),
            (true, "dogecoin"),
            (false, "ethereum"),
            (true, "solana"),
            (false, "cardano"),
            (true, "ethereum"),
            (true, "solana"),
            (false, "bitcoin"),
        ];
        for (add, id) in ops {
            if add {
                list.add(id);
            } else {
                list.remove(id);
            }
            let mut seen = std::collections::HashSet::new();
            assert!(list.ids().iter().all(|id| seen.insert(id.clone())));
        }
        assert_eq!(list.ids(), ["dogecoin", "solana", "ethereum"]);
    }

    #[test]
    fn test_remove_preserves_relative_order() {
        let mut list = Watchlist::from_ids(["a", "b", "c", "d"]);
        assert!(list.remove("b"));
        assert!(!list.remove("x"));
        assert_eq!(list.ids(), ["a", "c", "d"]);
    }

    #[test]
    fn test_normalize_search() {
        assert_eq!(normalize_search("  Shiba   Inu "), Some("shiba-inu".into()));
        assert_eq!(normalize_search("Bitcoin"), Some("bitcoin".into()));
        assert_eq!(normalize_search("   "), None);
    }

    #[tokio::test]
    async fn test_edits_trigger_refresh_with_new_ids() {
        let source = Arc::new(FakePrices::default());
        let state = StateHandle::default();
        let crypto = CryptoCoordinator::new(source.clone(), state.clone());
        let watchlist = WatchlistCoordinator::new(state.clone(), crypto);

        watchlist.add("bitcoin").unwrap().await.unwrap();
        watchlist.add_from_search("Ethereum").unwrap().await.unwrap();
        assert!(watchlist.add("bitcoin").is_none(), "duplicate add is a no-op");
        watchlist.remove("bitcoin").unwrap().await.unwrap();
        assert!(watchlist.remove("bitcoin").is_none());

        let calls = source.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], vec!["bitcoin".to_string(), "ethereum".to_string()]);
        assert_eq!(calls[2], vec!["ethereum".to_string()]);

        let snap = state.snapshot();
        assert_eq!(snap.watchlist.ids(), ["ethereum"]);
        assert_eq!(snap.crypto.quotes.keys().collect::<Vec<_>>(), vec!["ethereum"]);
        assert_eq!(watchlist.filter("eth"), vec!["ethereum".to_string()]);
    }
}
