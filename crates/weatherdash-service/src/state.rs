//! Application state shared across handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock, watch};

use weatherdash_core::{Clock, SystemClock, WeatherAnalytics};
use weatherdash_store::Store;

use crate::config::Config;
use crate::openmeteo::OpenMeteoClient;

/// Shared application state.
pub struct AppState {
    /// The data store (wrapped in Mutex for thread-safe access).
    pub store: Mutex<Store>,
    /// Configuration, fixed at startup.
    pub config: Config,
    /// Analytics over the store.
    pub analytics: WeatherAnalytics,
    /// Upstream weather provider.
    pub open_meteo: OpenMeteoClient,
    /// Collector control state.
    pub collector: CollectorState,
}

impl AppState {
    /// Create new application state driven by the system clock.
    pub fn new(store: Store, config: Config) -> Arc<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create application state with an explicit clock.
    pub fn with_clock(store: Store, config: Config, clock: Arc<dyn Clock>) -> Arc<Self> {
        let analytics = WeatherAnalytics::with_clock(config.analytics_config(), clock);
        let open_meteo = OpenMeteoClient::new(config.collector.base_url.clone());
        Arc::new(Self {
            store: Mutex::new(store),
            analytics,
            open_meteo,
            collector: CollectorState::new(),
            config,
        })
    }
}

/// State for tracking and controlling the collector.
pub struct CollectorState {
    /// Whether the collector is currently running.
    running: AtomicBool,
    /// When the collector was started (Unix timestamp).
    started_at: AtomicU64,
    /// Channel to signal the collector task to stop.
    stop_tx: watch::Sender<bool>,
    /// Receiver for stop signal (cloned by the collector task).
    stop_rx: watch::Receiver<bool>,
    /// Poll statistics.
    pub stats: RwLock<CollectionStats>,
}

impl CollectorState {
    /// Create a new collector state.
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            running: AtomicBool::new(false),
            started_at: AtomicU64::new(0),
            stop_tx,
            stop_rx,
            stats: RwLock::new(CollectionStats::default()),
        }
    }

    /// Check if the collector is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark the collector as started or stopped.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
        if running {
            let now = OffsetDateTime::now_utc().unix_timestamp().max(0) as u64;
            self.started_at.store(now, Ordering::SeqCst);
        }
    }

    /// Get the collector start time.
    pub fn started_at(&self) -> Option<OffsetDateTime> {
        let ts = self.started_at.load(Ordering::SeqCst);
        if ts == 0 {
            None
        } else {
            OffsetDateTime::from_unix_timestamp(ts as i64).ok()
        }
    }

    /// Get a receiver for the stop signal.
    pub fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Signal the collector task to stop.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
        self.running.store(false, Ordering::SeqCst);
    }

    /// Record a successful poll.
    pub async fn record_success(&self, at: OffsetDateTime) {
        let mut stats = self.stats.write().await;
        stats.success_count += 1;
        stats.last_poll_at = Some(at);
    }

    /// Record a failed poll.
    pub async fn record_failure(&self, at: OffsetDateTime, error: String) {
        let mut stats = self.stats.write().await;
        stats.failure_count += 1;
        stats.last_error_at = Some(at);
        stats.last_error = Some(error);
    }
}

impl Default for CollectorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Collection statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionStats {
    /// Time of last successful poll.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_poll_at: Option<OffsetDateTime>,
    /// Time of last failed poll.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_error_at: Option<OffsetDateTime>,
    /// Last error message.
    pub last_error: Option<String>,
    /// Total successful polls.
    pub success_count: u64,
    /// Total failed polls.
    pub failure_count: u64,
}
