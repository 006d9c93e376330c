//! Background collector and HTTP REST API for weather analytics.
//!
//! This crate provides a service that:
//! - Polls Open-Meteo for current conditions on a schedule
//! - Stores observations in the local database
//! - Exposes a REST API for listing, summarizing and exporting data
//! - Derives rule-based insights over the last 24 hours
//! - Optional API key authentication
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check (no auth required)
//! - `GET /api/status` - Record count and collector statistics
//! - `POST /api/weather/logs` - Ingest a record
//! - `GET /api/weather/logs` - Paginated records, newest first
//! - `GET /api/weather/last` - Most recent record
//! - `GET /api/weather/summary` - Min/max/avg per metric
//! - `GET /api/weather/timeseries` - Temperature and humidity chart data
//! - `GET /api/weather/insights` - Alerts over the trailing window
//! - `GET /api/weather/export` - CSV or xlsx download
//! - `GET /api/weather/forecast` - Hourly forecast for the next day
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/weatherdash/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! path = "~/.local/share/weatherdash/weather.db"
//!
//! [location]
//! name = "Recife, Brasil"
//! latitude = -8.05
//! longitude = -34.9
//! utc_offset_hours = -3
//!
//! [collector]
//! enabled = true
//! interval_secs = 3600
//!
//! [security]
//! # Require X-API-Key header for all requests (except /api/health)
//! api_key_enabled = true
//! api_key = "your-secure-random-key-at-least-16-chars"
//! ```

pub mod api;
pub mod collector;
pub mod config;
pub mod middleware;
pub mod openmeteo;
pub mod state;

pub use collector::{Collector, CollectorError, collect_once};
pub use config::{
    AnalyticsSettings, CollectorConfig, Config, ConfigError, LocationConfig, SecurityConfig,
    ServerConfig, StorageConfig,
};
pub use openmeteo::{Forecast, OpenMeteoClient, OpenMeteoError};
pub use state::{AppState, CollectionStats};
