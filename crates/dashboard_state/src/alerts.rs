//! Simulated weather alert feed.
//!
//! One generator task per running manager. It owns the repeating timer and
//! every pending expiry timer, so stopping the task cancels all of them at
//! once; no expiry can fire into a manager that was stopped or restarted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::config::AlertConfig;
use common::{Alert, AlertId, Severity};
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::generation::Generation;
use crate::store::StateHandle;

#[derive(Debug, Clone, Copy)]
pub struct AlertTemplate {
    pub severity: Severity,
    pub message: &'static str,
    pub location: &'static str,
}

pub const CATALOG: [AlertTemplate; 3] = [
    AlertTemplate {
        severity: Severity::Warning,
        message: "Heavy rain expected in the next hour",
        location: "Current Location",
    },
    AlertTemplate {
        severity: Severity::Danger,
        message: "Severe thunderstorm warning",
        location: "Current Location",
    },
    AlertTemplate {
        severity: Severity::Info,
        message: "Temperature dropping rapidly",
        location: "Current Location",
    },
];

#[derive(Debug, Clone, Copy)]
pub struct AlertSettings {
    pub period: Duration,
    pub ttl: Duration,
    pub capacity: usize,
}

impl From<&AlertConfig> for AlertSettings {
    fn from(cfg: &AlertConfig) -> Self {
        Self {
            period: Duration::from_secs(cfg.period_secs),
            ttl: Duration::from_secs(cfg.ttl_secs),
            capacity: cfg.capacity,
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self::from(&AlertConfig::default())
    }
}

pub struct AlertManager {
    state: StateHandle,
    settings: AlertSettings,
    worker: Option<JoinHandle<()>>,
    epoch: Generation,
    next_id: Arc<AtomicU64>,
}

impl AlertManager {
    pub fn new(state: StateHandle, settings: AlertSettings) -> Self {
        Self {
            state,
            settings,
            worker: None,
            epoch: Generation::new(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Start generating alerts. Restarts cleanly if already running, so
    /// at most one generator is ever active.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }

        let epoch = self.epoch.issue();
        let worker = Worker {
            state: self.state.clone(),
            settings: self.settings,
            epoch: self.epoch.clone(),
            current: epoch,
            next_id: Arc::clone(&self.next_id),
        };
        self.worker = Some(tokio::spawn(worker.run()));
        self.state.update(|s| s.alerts.connected = true);
        info!(
            "Alert feed connected (every {}s, ttl {}s)",
            self.settings.period.as_secs(),
            self.settings.ttl.as_secs()
        );
    }

    /// Stop the generator and cancel every pending expiry. Buffered alerts
    /// are dropped with their timers.
    pub fn stop(&mut self) {
        // Invalidate first so a generator mid-poll cannot write afterwards.
        self.epoch.issue();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        self.state.update(|s| {
            s.alerts.items.clear();
            s.alerts.connected = false;
        });
        info!("Alert feed disconnected");
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }
}

impl Drop for AlertManager {
    fn drop(&mut self) {
        self.epoch.issue();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

struct Worker {
    state: StateHandle,
    settings: AlertSettings,
    epoch: Generation,
    current: u64,
    next_id: Arc<AtomicU64>,
}

impl Worker {
    async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.settings.period, self.settings.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut rng = StdRng::from_entropy();
        let mut expiries: FuturesUnordered<BoxFuture<'static, AlertId>> = FuturesUnordered::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let template = CATALOG[rng.gen_range(0..CATALOG.len())];
                    let id = self.publish(template);
                    let ttl = self.settings.ttl;
                    expiries.push(Box::pin(async move {
                        tokio::time::sleep(ttl).await;
                        id
                    }));
                }
                Some(id) = expiries.next(), if !expiries.is_empty() => {
                    self.expire(id);
                }
            }
        }
    }

    fn publish(&self, template: AlertTemplate) -> AlertId {
        let id = AlertId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let created_at = Utc::now();
        let ttl = chrono::Duration::from_std(self.settings.ttl).unwrap_or_else(|_| chrono::Duration::zero());
        let alert = Alert {
            id,
            severity: template.severity,
            message: template.message.to_string(),
            location: template.location.to_string(),
            created_at,
            expires_at: created_at + ttl,
        };

        let capacity = self.settings.capacity;
        self.state.update_if(|s| {
            if !self.epoch.is_current(self.current) {
                return false;
            }
            s.alerts.items.push_front(alert);
            s.alerts.items.truncate(capacity);
            true
        });
        debug!("Alert {} published: {:?} {}", id, template.severity, template.message);
        id
    }

    fn expire(&self, id: AlertId) {
        let removed = self.state.update_if(|s| {
            if !self.epoch.is_current(self.current) {
                return false;
            }
            let before = s.alerts.items.len();
            s.alerts.items.retain(|a| a.id != id);
            s.alerts.items.len() != before
        });
        if removed {
            debug!("Alert {} expired", id);
        }
    }
}
