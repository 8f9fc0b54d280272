//! Weather coordinator.
//!
//! Two independent paths: a batch refresh that owns the snapshot list, and
//! a free-text city search that only writes the search slot. The batch is
//! fail-closed: a failed batch clears the list rather than leaving stale
//! conditions on screen.

use common::config::BatchPolicy;
use common::{City, Error, FetchState, WeatherSnapshot, WeatherSource};
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::gate::SourceGate;
use crate::generation::{Generation, Outcome};
use crate::preferences::FavoriteSet;
use crate::store::{DashboardState, StateHandle};

pub const WEATHER_FAILURE: &str = "Failed to fetch weather data.";
pub const EMPTY_SEARCH: &str = "Enter a city name to search.";

pub struct WeatherCoordinator<W> {
    source: SourceGate<W>,
    state: StateHandle,
    policy: BatchPolicy,
    batch_generation: Generation,
    search_generation: Generation,
}

impl<W> Clone for WeatherCoordinator<W> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            state: self.state.clone(),
            policy: self.policy,
            batch_generation: self.batch_generation.clone(),
            search_generation: self.search_generation.clone(),
        }
    }
}

/// Cities to show: favorites if there are any, otherwise `defaults`.
/// Favorites that match a known city reuse its id; others are looked up
/// by name.
pub fn active_cities(favorites: &FavoriteSet, defaults: &[City]) -> Vec<City> {
    if !favorites.has_cities() {
        return defaults.to_vec();
    }
    favorites
        .city_names()
        .map(|name| {
            defaults
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .cloned()
                .unwrap_or_else(|| City::named(name))
        })
        .collect()
}

enum BatchResult {
    Snapshots(Vec<WeatherSnapshot>),
    Partial {
        snapshots: Vec<WeatherSnapshot>,
        failed: Vec<String>,
    },
    Failed(String),
}

impl<W: WeatherSource> WeatherCoordinator<W> {
    pub fn new(source: SourceGate<W>, state: StateHandle, policy: BatchPolicy) -> Self {
        Self {
            source,
            state,
            policy,
            batch_generation: Generation::new(),
            search_generation: Generation::new(),
        }
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }

    /// Claim the next batch generation and mark the batch loading, inside
    /// a write the caller already holds.
    pub fn begin_batch_in(&self, s: &mut DashboardState) -> u64 {
        s.weather.fetch = FetchState::loading();
        self.batch_generation.issue()
    }

    /// Fetch every city concurrently and apply the joined result under the
    /// configured batch policy.
    pub async fn refresh_batch(&self, cities: Vec<City>) -> Outcome {
        let mut generation = 0;
        self.state.update(|s| generation = self.begin_batch_in(s));
        self.run_batch(generation, cities).await
    }

    /// Start a batch without waiting for it. The generation is taken before
    /// the task is spawned.
    pub fn spawn_refresh_batch(&self, cities: Vec<City>) -> JoinHandle<Outcome> {
        let mut generation = 0;
        self.state.update(|s| generation = self.begin_batch_in(s));
        self.spawn_run_batch(generation, cities)
    }

    /// Run a batch whose generation was claimed with [`Self::begin_batch_in`].
    pub fn spawn_run_batch(&self, generation: u64, cities: Vec<City>) -> JoinHandle<Outcome> {
        let this = self.clone();
        tokio::spawn(async move { this.run_batch(generation, cities).await })
    }

    async fn run_batch(&self, generation: u64, cities: Vec<City>) -> Outcome {
        let result = match self.source.source() {
            Ok(source) => {
                let results = join_all(cities.iter().map(|city| source.fetch_city(city))).await;
                self.collect(&cities, results)
            }
            Err(e) => {
                error!("Weather feed unavailable: {}", e);
                BatchResult::Failed(e.display_message(WEATHER_FAILURE))
            }
        };

        let mut outcome = Outcome::Superseded;
        self.state.update_if(|s| {
            if !self.batch_generation.is_current(generation) {
                return false;
            }
            match &result {
                BatchResult::Snapshots(snapshots) => {
                    s.weather.snapshots = snapshots.clone();
                    s.weather.fetch = FetchState::succeeded();
                    outcome = Outcome::Succeeded;
                }
                BatchResult::Partial { snapshots, failed } => {
                    s.weather.snapshots = snapshots.clone();
                    s.weather.fetch = FetchState {
                        status: common::FetchStatus::Succeeded,
                        last_error: Some(format!(
                            "Failed to fetch weather for {}",
                            failed.join(", ")
                        )),
                    };
                    outcome = Outcome::Succeeded;
                }
                BatchResult::Failed(message) => {
                    s.weather.snapshots.clear();
                    s.weather.fetch = FetchState::failed(message.clone());
                    outcome = Outcome::Failed;
                }
            }
            true
        });

        if outcome == Outcome::Superseded {
            debug!("Discarded weather batch for generation {}", generation);
        }
        outcome
    }

    fn collect(
        &self,
        cities: &[City],
        results: Vec<Result<WeatherSnapshot, Error>>,
    ) -> BatchResult {
        let mut snapshots = Vec::with_capacity(results.len());
        let mut failed = Vec::new();
        let mut first_error: Option<Error> = None;

        for (city, result) in cities.iter().zip(results) {
            match result {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!("Weather fetch for {} failed: {}", city.name, e);
                    failed.push(city.name.clone());
                    first_error.get_or_insert(e);
                }
            }
        }

        let Some(first_error) = first_error else {
            info!("Weather batch: {} cities", snapshots.len());
            return BatchResult::Snapshots(snapshots);
        };

        match self.policy {
            BatchPolicy::PerCity if !snapshots.is_empty() => {
                info!(
                    "Weather batch: kept {} cities, {} failed",
                    snapshots.len(),
                    failed.len()
                );
                BatchResult::Partial { snapshots, failed }
            }
            _ => BatchResult::Failed(first_error.display_message(WEATHER_FAILURE)),
        }
    }

    /// Look up one city by free text. Only the search slot is written.
    pub async fn search_city(&self, query: &str) -> Outcome {
        let query = query.trim().to_string();
        let generation = self.search_generation.issue();

        let source = match self.source.source() {
            Ok(source) if !query.is_empty() => source,
            Ok(_) => return self.finish_search(generation, &query, Err(EMPTY_SEARCH.into())),
            Err(e) => {
                let message = e.display_message(WEATHER_FAILURE);
                return self.finish_search(generation, &query, Err(message));
            }
        };

        self.state.update(|s| {
            s.weather.search.query = Some(query.clone());
            s.weather.search.fetch = FetchState::loading();
        });

        let result = source.search(&query).await.map_err(|e| {
            warn!("City search for '{}' failed: {}", query, e);
            e.display_message(WEATHER_FAILURE)
        });
        self.finish_search(generation, &query, result)
    }

    fn finish_search(
        &self,
        generation: u64,
        query: &str,
        result: Result<WeatherSnapshot, String>,
    ) -> Outcome {
        let mut outcome = Outcome::Superseded;
        self.state.update_if(|s| {
            if !self.search_generation.is_current(generation) {
                return false;
            }
            let slot = &mut s.weather.search;
            slot.query = (!query.is_empty()).then(|| query.to_string());
            match &result {
                Ok(snapshot) => {
                    slot.result = Some(snapshot.clone());
                    slot.fetch = FetchState::succeeded();
                    outcome = Outcome::Succeeded;
                }
                Err(message) => {
                    slot.result = None;
                    slot.fetch = FetchState::failed(message.clone());
                    outcome = Outcome::Failed;
                }
            }
            true
        });
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{connection_reset, not_found, CityScript, FakeWeather};
    use common::{default_cities, FetchStatus};
    use std::sync::Arc;
    use std::time::Duration;

    fn three_cities() -> Vec<City> {
        vec![
            City::new("New York", "5128581"),
            City::new("London", "2643743"),
            City::new("Tokyo", "1850147"),
        ]
    }

    fn setup(policy: BatchPolicy) -> (Arc<FakeWeather>, StateHandle, WeatherCoordinator<FakeWeather>) {
        let source = Arc::new(FakeWeather::default());
        let state = StateHandle::default();
        let weather =
            WeatherCoordinator::new(SourceGate::Ready(source.clone()), state.clone(), policy);
        (source, state, weather)
    }

    #[tokio::test]
    async fn test_batch_success_is_aligned_to_input_order() {
        let (source, state, weather) = setup(BatchPolicy::AllOrNothing);
        // Tokyo answers first; order must still follow the request.
        source.script("New York", CityScript::Ok { delay: Duration::from_millis(30), temp: 18.0 });
        source.script("Tokyo", CityScript::Ok { delay: Duration::ZERO, temp: 25.0 });

        let outcome = weather.refresh_batch(three_cities()).await;

        assert_eq!(outcome, Outcome::Succeeded);
        let snaps = state.weather_snapshots();
        let names: Vec<&str> = snaps.iter().map(|s| s.city_name.as_str()).collect();
        assert_eq!(names, vec!["New York", "London", "Tokyo"]);
        assert_eq!(snaps[0].temp_c, Some(18.0));
        assert_eq!(snaps[1].city_id.as_deref(), Some("2643743"));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_one_failed_city_clears_whole_batch() {
        let (source, state, weather) = setup(BatchPolicy::AllOrNothing);
        weather.refresh_batch(three_cities()).await;
        assert_eq!(state.weather_snapshots().len(), 3);

        source.script("London", CityScript::Fail { delay: Duration::ZERO, error: connection_reset });
        let outcome = weather.refresh_batch(three_cities()).await;

        assert_eq!(outcome, Outcome::Failed);
        let snap = state.snapshot();
        assert_eq!(snap.weather.fetch, FetchState::failed(WEATHER_FAILURE));
        assert!(snap.weather.snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_message_is_surfaced() {
        let (source, state, weather) = setup(BatchPolicy::AllOrNothing);
        source.script("Tokyo", CityScript::Fail { delay: Duration::ZERO, error: not_found });

        weather.refresh_batch(three_cities()).await;

        assert_eq!(
            state.snapshot().weather.fetch.last_error.as_deref(),
            Some("city not found")
        );
    }

    #[tokio::test]
    async fn test_per_city_policy_keeps_successes() {
        let (source, state, weather) = setup(BatchPolicy::PerCity);
        source.script("London", CityScript::Fail { delay: Duration::ZERO, error: connection_reset });

        let outcome = weather.refresh_batch(three_cities()).await;

        assert_eq!(outcome, Outcome::Succeeded);
        let snap = state.snapshot();
        let names: Vec<&str> = snap.weather.snapshots.iter().map(|s| s.city_name.as_str()).collect();
        assert_eq!(names, vec!["New York", "Tokyo"]);
        assert_eq!(snap.weather.fetch.status, FetchStatus::Succeeded);
        assert_eq!(
            snap.weather.fetch.last_error.as_deref(),
            Some("Failed to fetch weather for London")
        );
    }

    #[tokio::test]
    async fn test_per_city_policy_all_failed_is_failure() {
        let (source, state, weather) = setup(BatchPolicy::PerCity);
        for city in three_cities() {
            source.script(&city.name, CityScript::Fail { delay: Duration::ZERO, error: connection_reset });
        }

        assert_eq!(weather.refresh_batch(three_cities()).await, Outcome::Failed);
        assert!(state.weather_snapshots().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let state = StateHandle::default();
        let gate: SourceGate<FakeWeather> =
            SourceGate::from_secret(Err(Error::Config("OPENWEATHER_API_KEY is not configured".into())), |_| {
                FakeWeather::default()
            });
        let weather = WeatherCoordinator::new(gate, state.clone(), BatchPolicy::AllOrNothing);

        assert_eq!(weather.refresh_batch(default_cities()).await, Outcome::Failed);
        assert_eq!(weather.search_city("Paris").await, Outcome::Failed);

        let snap = state.snapshot();
        assert_eq!(
            snap.weather.fetch.last_error.as_deref(),
            Some("OPENWEATHER_API_KEY is not configured")
        );
        assert_eq!(snap.weather.search.fetch.status, FetchStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_batch_is_discarded() {
        let (source, state, weather) = setup(BatchPolicy::AllOrNothing);
        source.script("Slowtown", CityScript::Ok { delay: Duration::from_secs(10), temp: 1.0 });

        let slow = weather.spawn_refresh_batch(vec![City::named("Slowtown")]);
        tokio::time::sleep(Duration::from_millis(1)).await;
        let fast = weather.spawn_refresh_batch(vec![City::named("Fastville")]);

        assert_eq!(fast.await.unwrap(), Outcome::Succeeded);
        assert_eq!(slow.await.unwrap(), Outcome::Superseded);
        let snaps = state.weather_snapshots();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].city_name, "Fastville");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_later_batch_trigger_wins() {
        let (_source, state, weather) = setup(BatchPolicy::AllOrNothing);

        let trigger = weather.clone();
        let (first, second) = tokio::spawn(async move {
            let first = trigger.spawn_refresh_batch(three_cities());
            let second = trigger.spawn_refresh_batch(vec![City::named("Reykjavik")]);
            (first, second)
        })
        .await
        .unwrap();

        assert_eq!(second.await.unwrap(), Outcome::Succeeded);
        first.await.unwrap();

        let names: Vec<String> = state.weather_snapshots().into_iter().map(|s| s.city_name).collect();
        assert_eq!(names, vec!["Reykjavik".to_string()]);
    }

    #[tokio::test]
    async fn test_search_never_touches_batch_list() {
        let (source, state, weather) = setup(BatchPolicy::AllOrNothing);
        weather.refresh_batch(three_cities()).await;
        source.script("Atlantis", CityScript::Fail { delay: Duration::ZERO, error: not_found });

        assert_eq!(weather.search_city("Paris").await, Outcome::Succeeded);
        let snap = state.snapshot();
        assert_eq!(snap.weather.search.result.as_ref().unwrap().city_name, "Paris");
        assert_eq!(snap.weather.snapshots.len(), 3);

        assert_eq!(weather.search_city("Atlantis").await, Outcome::Failed);
        let snap = state.snapshot();
        assert!(snap.weather.search.result.is_none());
        assert_eq!(snap.weather.search.fetch.last_error.as_deref(), Some("city not found"));
        assert_eq!(snap.weather.search.query.as_deref(), Some("Atlantis"));
        assert_eq!(snap.weather.snapshots.len(), 3);
        assert_eq!(snap.weather.fetch.status, FetchStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_blank_search_skips_network() {
        let (source, state, weather) = setup(BatchPolicy::AllOrNothing);
        assert_eq!(weather.search_city("   ").await, Outcome::Failed);
        assert_eq!(source.calls(), 0);
        assert_eq!(
            state.snapshot().weather.search.fetch.last_error.as_deref(),
            Some(EMPTY_SEARCH)
        );
    }

    #[test]
    fn test_active_cities_prefers_favorites() {
        let defaults = default_cities();
        assert_eq!(active_cities(&FavoriteSet::new(), &defaults), defaults);

        let mut favorites = FavoriteSet::new();
        favorites.add_favorite_city("Reykjavik");
        favorites.add_favorite_city("paris");
        let cities = active_cities(&favorites, &defaults);

        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0], City::named("Reykjavik"));
        assert_eq!(cities[1], City::new("Paris", "2988507"));
    }
}
