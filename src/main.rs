//! Crypto-Weather Nexus: live dashboard state for crypto prices, city
//! weather, crypto news and simulated weather alerts.
//!
//! Single-binary Tokio application that:
//! 1. Polls CoinGecko for the watchlist
//! 2. Fetches OpenWeather conditions for favorite or default cities
//! 3. Pulls the latest crypto headlines from newsdata.io
//! 4. Runs the simulated alert feed

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, warn};

use coingecko_client::CoinGeckoClient;
use common::{Alert, AlertId, DashboardConfig, FetchStatus};
use dashboard_state::{Dashboard, DashboardState, SourceGate};
use newsdata_client::NewsDataClient;
use openweather_client::OpenWeatherClient;

type NexusDashboard = Dashboard<CoinGeckoClient, OpenWeatherClient, NewsDataClient>;

/// Crypto-Weather Nexus dashboard
#[derive(Parser)]
#[command(name = "nexus-dashboard", about = "Crypto prices, city weather, news and alerts")]
struct Cli {
    /// Refresh every feed once, print the state as JSON, then exit.
    #[arg(long)]
    once: bool,

    /// Add an asset id to the watchlist (repeatable).
    #[arg(long = "watch", value_name = "ID")]
    watch: Vec<String>,

    /// Mark a city as favorite (repeatable).
    #[arg(long = "favorite-city", value_name = "NAME")]
    favorite_city: Vec<String>,

    /// Do not start the simulated alert feed.
    #[arg(long)]
    no_alerts: bool,
}

fn build_dashboard(cfg: &DashboardConfig) -> NexusDashboard {
    let timeout = Duration::from_secs(cfg.timing.http_timeout_secs);

    let prices = Arc::new(CoinGeckoClient::new(&cfg.endpoints.coingecko_base_url, timeout));
    let weather = SourceGate::from_secret(cfg.weather_api_key(), |key| {
        OpenWeatherClient::new(key, &cfg.endpoints.openweather_base_url, timeout)
    });
    let news = SourceGate::from_secret(cfg.news_api_key(), |key| {
        NewsDataClient::new(key, &cfg.endpoints.newsdata_base_url, timeout)
    });

    for (feed, blocked) in [("Weather", weather.source().err()), ("News", news.source().err())] {
        if let Some(e) = blocked {
            warn!("{} feed disabled: {}", feed, e);
        }
    }

    Dashboard::new(cfg, prices, weather, news)
}

fn status_label(status: FetchStatus) -> &'static str {
    match status {
        FetchStatus::Idle => "idle",
        FetchStatus::Loading => "loading",
        FetchStatus::Succeeded => "ok",
        FetchStatus::Failed => "failed",
    }
}

fn log_summary(state: &DashboardState) {
    info!(
        "HEARTBEAT: quotes={} ({}) cities={} ({}) articles={} ({}) alerts={} connected={} favorites={}",
        state.crypto.quotes.len(),
        status_label(state.crypto.fetch.status),
        state.weather.snapshots.len(),
        status_label(state.weather.fetch.status),
        state.news.articles.len(),
        status_label(state.news.fetch.status),
        state.alerts.items.len(),
        state.alerts.connected,
        state.preferences.city_names().count(),
    );
}

/// Alerts newer than `seen`, oldest first.
fn new_alerts(state: &DashboardState, seen: AlertId) -> impl Iterator<Item = &Alert> {
    state.alerts.items.iter().rev().filter(move |a| a.id > seen)
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "nexus_dashboard=info,dashboard_state=info,coingecko_client=info,openweather_client=info,newsdata_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("Crypto-Weather Nexus starting up...");

    // Load configuration.
    let mut cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    cfg.watchlist.extend(cli.watch.iter().cloned());
    if cli.no_alerts {
        cfg.alerts.enabled = false;
    }

    info!("Watchlist: {:?}", cfg.watchlist);
    info!(
        "Default cities: {:?}",
        cfg.cities.iter().map(|c| &c.name).collect::<Vec<_>>()
    );
    info!(
        "Timing: crypto_poll={}s, heartbeat={}s, http_timeout={}s; weather batch policy {:?}",
        cfg.timing.crypto_poll_secs,
        cfg.timing.heartbeat_secs,
        cfg.timing.http_timeout_secs,
        cfg.weather.batch_policy,
    );

    let mut dashboard = build_dashboard(&cfg);
    dashboard.state().update(|s| {
        for name in &cli.favorite_city {
            s.preferences.add_favorite_city(name);
        }
    });

    // ── Once mode ────────────────────────────────────────────────────
    if cli.once {
        info!("Refreshing every feed once...");
        let (crypto, weather, news) = dashboard.refresh_all().await;
        info!("Crypto: {:?}, weather: {:?}, news: {:?}", crypto, weather, news);

        match serde_json::to_string_pretty(&dashboard.state().snapshot()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("Failed to serialize dashboard state: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // ── Spawn tasks ──────────────────────────────────────────────────
    info!("Spawning tasks...");

    // Task 1: price polling, released when the guard drops.
    let poll_guard = dashboard.activate();

    // Task 2: alert feed.
    if cfg.alerts.enabled {
        dashboard.start_alerts();
    } else {
        info!("Alert feed disabled");
    }

    // Task 3: change log. Surfaces fetch failures and new alerts.
    let mut changes = dashboard.state().subscribe();
    let watch_handle = tokio::spawn(async move {
        let mut last_alert = AlertId(0);
        let mut last_errors: [Option<String>; 4] = Default::default();

        while changes.changed().await.is_ok() {
            let state = changes.borrow_and_update().clone();

            for alert in new_alerts(&state, last_alert) {
                info!(
                    "ALERT {} [{:?}] {} ({})",
                    alert.id, alert.severity, alert.message, alert.location
                );
            }
            if let Some(newest) = state.alerts.items.front() {
                last_alert = last_alert.max(newest.id);
            }

            let errors = [
                ("crypto", &state.crypto.fetch.last_error),
                ("weather", &state.weather.fetch.last_error),
                ("news", &state.news.fetch.last_error),
                ("city search", &state.weather.search.fetch.last_error),
            ];
            for (slot, (feed, current)) in last_errors.iter_mut().zip(errors) {
                if *slot != *current {
                    if let Some(message) = current {
                        warn!("{} feed: {}", feed, message);
                    }
                    slot.clone_from(current);
                }
            }
            debug!(
                "State changed: quotes={} cities={} articles={}",
                state.crypto.quotes.len(),
                state.weather.snapshots.len(),
                state.news.articles.len()
            );
        }
    });

    // Task 4: heartbeat.
    let hb_state = dashboard.state().clone();
    let hb_period = Duration::from_secs(cfg.timing.heartbeat_secs);
    let heartbeat_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(hb_period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            hb_state.read(log_summary);
        }
    });

    // Initial weather and news load; prices come from the poll.
    let (weather, news) = tokio::join!(dashboard.refresh_weather(), dashboard.refresh_news());
    info!("Initial load: weather {:?}, news {:?}", weather, news);

    // ── Wait for shutdown ────────────────────────────────────────────
    info!("Nexus dashboard is running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        r = watch_handle => {
            error!("Change log task exited: {:?}", r);
        }
        r = heartbeat_handle => {
            error!("Heartbeat task exited: {:?}", r);
        }
    }

    dashboard.stop_alerts();
    drop(poll_guard);
    dashboard.state().read(log_summary);
    info!("Nexus dashboard stopped");
}
