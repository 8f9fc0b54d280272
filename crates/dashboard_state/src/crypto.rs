//! Crypto price coordinator.
//!
//! Keeps the quote map in the state container in sync with the watchlist:
//! once on activation, on a fixed interval while the view is active, and
//! whenever the watchlist changes. Failures leave the last applied quotes
//! visible.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common::{FetchState, PriceSource};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::generation::{Generation, Outcome};
use crate::store::{DashboardState, StateHandle};

pub const CRYPTO_FAILURE: &str = "Failed to fetch cryptocurrency data.";

pub struct CryptoCoordinator<P> {
    source: Arc<P>,
    state: StateHandle,
    generation: Generation,
}

impl<P> Clone for CryptoCoordinator<P> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            state: self.state.clone(),
            generation: self.generation.clone(),
        }
    }
}

impl<P: PriceSource> CryptoCoordinator<P> {
    pub fn new(source: Arc<P>, state: StateHandle) -> Self {
        Self {
            source,
            state,
            generation: Generation::new(),
        }
    }

    /// Claim the next generation and mark the feed loading, inside a
    /// write the caller already holds. The refresh that carries the
    /// returned generation is the one that may apply.
    pub fn begin_in(&self, s: &mut DashboardState) -> u64 {
        s.crypto.fetch = FetchState::loading();
        self.generation.issue()
    }

    /// Fetch quotes for `ids` and, unless a newer refresh was triggered in
    /// the meantime, replace the quote map with the result.
    pub async fn refresh(&self, ids: Vec<String>) -> Outcome {
        let mut generation = 0;
        self.state.update(|s| generation = self.begin_in(s));
        self.run(generation, ids).await
    }

    /// Start a refresh without waiting for it. The generation is taken
    /// here, so refreshes rank by trigger order whatever order their tasks
    /// start in.
    pub fn spawn_refresh(&self, ids: Vec<String>) -> JoinHandle<Outcome> {
        let mut generation = 0;
        self.state.update(|s| generation = self.begin_in(s));
        self.spawn_run(generation, ids)
    }

    /// Run a refresh whose generation was claimed with [`Self::begin_in`].
    pub fn spawn_run(&self, generation: u64, ids: Vec<String>) -> JoinHandle<Outcome> {
        let this = self.clone();
        tokio::spawn(async move { this.run(generation, ids).await })
    }

    async fn run(&self, generation: u64, ids: Vec<String>) -> Outcome {
        let result = if ids.is_empty() {
            Ok(Vec::new())
        } else {
            self.source.fetch_prices(&ids).await
        };

        let mut outcome = Outcome::Superseded;
        self.state.update_if(|s| {
            if !self.generation.is_current(generation) {
                return false;
            }
            match &result {
                Ok(quotes) => {
                    s.crypto.quotes = quotes
                        .iter()
                        .filter(|q| ids.contains(&q.asset_id))
                        .map(|q| (q.asset_id.clone(), q.clone()))
                        .collect::<BTreeMap<_, _>>();
                    s.crypto.fetch = FetchState::succeeded();
                    outcome = Outcome::Succeeded;
                }
                Err(_) => {
                    s.crypto.fetch = FetchState::failed(CRYPTO_FAILURE);
                    outcome = Outcome::Failed;
                }
            }
            true
        });

        match (&outcome, &result) {
            (Outcome::Succeeded, Ok(quotes)) => {
                debug!("Applied {} quotes (generation {})", quotes.len(), generation)
            }
            (Outcome::Failed, Err(e)) => warn!("Price refresh failed: {}", e),
            _ => debug!("Discarded price response for generation {}", generation),
        }
        outcome
    }

    /// Refresh the current watchlist now and then every `period` until the
    /// returned guard is dropped. Refreshes already in flight when the
    /// guard drops still complete.
    pub fn activate(&self, period: Duration) -> PollGuard {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Read the ids and claim the generation in one write so a
                // concurrent watchlist edit is ordered before or after it.
                let mut claimed = (0, Vec::new());
                this.state.update(|s| {
                    claimed = (this.begin_in(s), s.watchlist.ids().to_vec());
                });
                let (generation, ids) = claimed;
                debug!("Price poll tick: {} ids", ids.len());
                this.spawn_run(generation, ids);
            }
        });
        info!("Price polling active every {}s", period.as_secs());
        PollGuard { handle }
    }
}

/// Keeps the price poll running. Dropping it cancels the interval.
#[derive(Debug)]
pub struct PollGuard {
    handle: JoinHandle<()>,
}

impl PollGuard {
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("Price polling released");
    }
}
