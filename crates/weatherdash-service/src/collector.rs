//! Background data collector.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use weatherdash_types::WeatherRecord;

use crate::openmeteo::OpenMeteoError;
use crate::state::AppState;

/// Background collector that polls Open-Meteo on the configured interval.
pub struct Collector {
    state: Arc<AppState>,
}

impl Collector {
    /// Create a new collector.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Start polling in the background.
    ///
    /// Returns `None` if the collector is already running. The first poll
    /// happens immediately.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.state.collector.is_running() {
            info!("Collector is already running");
            return None;
        }

        let interval_secs = self.state.config.collector.interval_secs;
        info!(
            "Starting collector for {} (interval: {}s)",
            self.state.config.location.name, interval_secs
        );

        self.state.collector.set_running(true);
        let state = Arc::clone(&self.state);
        Some(tokio::spawn(async move {
            run(state, Duration::from_secs(interval_secs)).await;
        }))
    }
}

async fn run(state: Arc<AppState>, poll_interval: Duration) {
    let mut stop_rx = state.collector.subscribe_stop();
    let mut interval_timer = interval(poll_interval);
    let mut consecutive_failures = 0u32;

    loop {
        tokio::select! {
            _ = interval_timer.tick() => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    info!("Collector stopping");
                    break;
                }
                continue;
            }
        }

        match collect_once(&state).await {
            Ok(record) => {
                consecutive_failures = 0;
                debug!(
                    "Collected reading for {}: {}°C, {}%",
                    record.location, record.temperature, record.humidity
                );
            }
            Err(e) => {
                consecutive_failures += 1;
                if consecutive_failures <= 3 {
                    warn!("Failed to collect weather: {} (attempt {})", e, consecutive_failures);
                } else if consecutive_failures == 4 {
                    error!(
                        "Failed to collect weather after {} attempts, will continue trying silently",
                        consecutive_failures
                    );
                }
            }
        }
    }

    state.collector.set_running(false);
}

/// Fetch current conditions once and ingest them.
///
/// Updates the collector statistics either way.
pub async fn collect_once(state: &AppState) -> Result<WeatherRecord, CollectorError> {
    let now = state.analytics.now();
    let result = fetch_and_store(state, now).await;

    match &result {
        Ok(_) => state.collector.record_success(now).await,
        Err(e) => state.collector.record_failure(now, e.to_string()).await,
    }

    result
}

async fn fetch_and_store(
    state: &AppState,
    now: time::OffsetDateTime,
) -> Result<WeatherRecord, CollectorError> {
    let record = state
        .open_meteo
        .current(state.analytics.config(), now)
        .await
        .map_err(CollectorError::Fetch)?;

    let store = state.store.lock().await;
    state
        .analytics
        .ingest(&store, record)
        .map_err(CollectorError::Store)
}

/// Collector errors.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to fetch: {0}")]
    Fetch(OpenMeteoError),
    #[error("Failed to store: {0}")]
    Store(weatherdash_core::Error),
}
