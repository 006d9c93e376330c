//! REST API endpoints for weatherdash-service.
//!
//! Every data handler parses its query, takes the store lock, and delegates
//! to [`WeatherAnalytics`](weatherdash_core::WeatherAnalytics). The store
//! lock is never held across an upstream HTTP call.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]:
//! `{"error": "..."}` with 400 for bad input, 404 when no record exists,
//! 502 when Open-Meteo fails, 503 when the store fails.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, warn};

use weatherdash_core::insights::Insights;
use weatherdash_core::{ExportFormat, Summary, Timeseries};
use weatherdash_types::{NewWeatherRecord, Page, TimeRange, WeatherRecord};

use crate::config::MAX_PAGE_LIMIT;
use crate::openmeteo::Forecast;
use crate::state::{AppState, CollectionStats};

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(get_status))
        .route("/api/weather/logs", get(list_logs).post(create_log))
        .route("/api/weather/last", get(get_last))
        .route("/api/weather/summary", get(get_summary))
        .route("/api/weather/timeseries", get(get_timeseries))
        .route("/api/weather/insights", get(get_insights))
        .route("/api/weather/export", get(export_logs))
        .route("/api/weather/forecast", get(get_forecast))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

// ==========================================================================
// Service Status
// ==========================================================================

/// Service status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Monitored location label.
    pub location: String,
    /// Number of stored records.
    pub records: u64,
    pub collector: CollectorStatus,
}

/// Collector status.
#[derive(Debug, Serialize)]
pub struct CollectorStatus {
    /// Whether background collection is configured.
    pub enabled: bool,
    /// Whether the collector task is running.
    pub running: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// How long the collector has been running (in seconds).
    pub uptime_seconds: Option<u64>,
    pub interval_secs: u64,
    #[serde(flatten)]
    pub stats: CollectionStats,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, AppError> {
    let records = {
        let store = state.store.lock().await;
        store
            .count(&TimeRange::unbounded())
            .map_err(weatherdash_core::Error::from)?
    };

    let now = OffsetDateTime::now_utc();
    let started_at = state.collector.started_at();
    let stats = state.collector.stats.read().await.clone();

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now,
        location: state.config.location.name.clone(),
        records,
        collector: CollectorStatus {
            enabled: state.config.collector.enabled,
            running: state.collector.is_running(),
            started_at,
            uptime_seconds: started_at.map(|s| (now - s).whole_seconds().max(0) as u64),
            interval_secs: state.config.collector.interval_secs,
            stats,
        },
    }))
}

// ==========================================================================
// Query Parameters
// ==========================================================================

/// Optional RFC 3339 range bounds.
#[derive(Debug, Deserialize, Default)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RangeQuery {
    /// Parse and validate the bounds. Empty values count as absent.
    pub fn range(&self) -> Result<TimeRange, AppError> {
        let range = TimeRange::new(
            parse_bound("from", self.from.as_deref())?,
            parse_bound("to", self.to.as_deref())?,
        );
        range
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(range)
    }
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<OffsetDateTime>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(text) => OffsetDateTime::parse(text, &Rfc3339).map(Some).map_err(|_| {
            AppError::BadRequest(format!(
                "Invalid '{}' value '{}': expected an RFC 3339 timestamp",
                name, text
            ))
        }),
    }
}

/// Query parameters for record listings.
#[derive(Debug, Deserialize, Default)]
pub struct LogsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query parameters for exports.
#[derive(Debug, Deserialize, Default)]
pub struct ExportQuery {
    /// `csv` (default) or `xlsx`.
    pub format: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

// ==========================================================================
// Weather Endpoints
// ==========================================================================

/// Ingest a record.
async fn create_log(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewWeatherRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<WeatherRecord>), AppError> {
    let Json(record) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let store = state.store.lock().await;
    let stored = state.analytics.ingest(&store, record)?;
    debug!("Ingested record for {} at {}", stored.location, stored.timestamp);
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_last(State(state): State<Arc<AppState>>) -> Result<Json<WeatherRecord>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(state.analytics.last_record(&store)?))
}

async fn list_logs(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> Result<Json<Page<WeatherRecord>>, AppError> {
    let params = query_params(query)?;
    if let Some(limit) = params.limit.filter(|l| *l > MAX_PAGE_LIMIT) {
        return Err(AppError::BadRequest(format!(
            "limit {} exceeds the maximum of {}",
            limit, MAX_PAGE_LIMIT
        )));
    }
    let range = RangeQuery {
        from: params.from,
        to: params.to,
    }
    .range()?;

    let store = state.store.lock().await;
    let page = state
        .analytics
        .list_records(&store, &range, params.page, params.limit)?;
    Ok(Json(page))
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<Summary>, AppError> {
    let range = query_params(query)?.range()?;
    let store = state.store.lock().await;
    Ok(Json(state.analytics.summary(&store, &range)?))
}

async fn get_timeseries(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<Timeseries>, AppError> {
    let range = query_params(query)?.range()?;
    let store = state.store.lock().await;
    Ok(Json(state.analytics.timeseries(&store, &range)?))
}

async fn get_insights(State(state): State<Arc<AppState>>) -> Result<Json<Insights>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(state.analytics.insights(&store)?))
}

/// Download records as a file.
async fn export_logs(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let params = query_params(query)?;
    let format: ExportFormat = params.format.as_deref().unwrap_or("csv").parse()?;
    let range = RangeQuery {
        from: params.from,
        to: params.to,
    }
    .range()?;

    let file = {
        let store = state.store.lock().await;
        state.analytics.export(&store, &range, format)?
    };

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.bytes,
    )
        .into_response())
}

/// Hourly forecast for the next day.
async fn get_forecast(State(state): State<Arc<AppState>>) -> Result<Json<Forecast>, AppError> {
    let forecast = state
        .open_meteo
        .forecast(state.analytics.config(), state.analytics.now())
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    Ok(Json(forecast))
}

// ==========================================================================
// Errors
// ==========================================================================

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Upstream(String),
    Unavailable(String),
    Internal(String),
}

impl From<weatherdash_core::Error> for AppError {
    fn from(e: weatherdash_core::Error) -> Self {
        use weatherdash_core::Error;

        match e {
            Error::Validation(_) | Error::UnsupportedFormat(_) => {
                AppError::BadRequest(e.to_string())
            }
            Error::NotFound => AppError::NotFound(e.to_string()),
            Error::StoreUnavailable(_) => AppError::Unavailable(e.to_string()),
            Error::Encode(_) | Error::Spreadsheet(_) | Error::Timestamp(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(msg) => {
                warn!("Upstream request failed: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::Unavailable(msg) => {
                error!("{}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            AppError::Internal(msg) => {
                error!("{}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use time::Duration;
    use time::macros::datetime;
    use tower::ServiceExt;

    use weatherdash_core::FixedClock;
    use weatherdash_store::Store;

    use crate::config::Config;

    fn now() -> OffsetDateTime {
        datetime!(2025-07-01 12:00:00 UTC)
    }

    fn create_test_state() -> Arc<AppState> {
        let mut config = Config::default();
        config.collector.base_url = "http://127.0.0.1:1/v1/forecast".to_string();
        AppState::with_clock(
            Store::open_in_memory().unwrap(),
            config,
            Arc::new(FixedClock::new(now())),
        )
    }

    fn record_json(timestamp: OffsetDateTime, temperature: f64, rain: f64) -> Value {
        json!({
            "timestamp": timestamp.format(&Rfc3339).unwrap(),
            "location": "Recife, Brasil",
            "latitude": -8.05,
            "longitude": -34.9,
            "temperature": temperature,
            "humidity": 50.0,
            "wind_speed": 10.0,
            "condition": "clear",
            "rain_probability": rain,
            "raw": {"source": "test"}
        })
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router()
            .with_state(Arc::clone(state))
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn get_json(state: &Arc<AppState>, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(state, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(state: &Arc<AppState>, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/weather/logs")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(state, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn seed(state: &Arc<AppState>, hours: i64) {
        for h in 1..=hours {
            let record = record_json(now() - Duration::hours(h), 24.0, 0.1);
            let (status, _) = post_json(state, record.to_string()).await;
            assert_eq!(status, StatusCode::CREATED);
        }
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = create_test_state();
        let (status, json) = get_json(&state, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let state = create_test_state();
        seed(&state, 2).await;

        let (status, json) = get_json(&state, "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["records"], 2);
        assert_eq!(json["location"], "Recife, Brasil");
        assert_eq!(json["collector"]["running"], false);
        assert_eq!(json["collector"]["interval_secs"], 3600);
        assert_eq!(json["collector"]["success_count"], 0);
    }

    #[tokio::test]
    async fn test_last_not_found_on_empty_store() {
        let state = create_test_state();
        let (status, json) = get_json(&state, "/api/weather/last").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("No weather records"));
    }

    #[tokio::test]
    async fn test_ingest_then_last() {
        let state = create_test_state();
        let (status, created) =
            post_json(&state, record_json(now(), 28.0, 0.2).to_string()).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["feels_like"], 28.0);
        assert!(created.get("raw").is_none());

        let (status, last) = get_json(&state, "/api/weather/last").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(last, created);
        assert_eq!(last["timestamp"], "2025-07-01T12:00:00Z");
    }

    #[tokio::test]
    async fn test_ingest_rejects_out_of_range() {
        let state = create_test_state();
        let mut record = record_json(now(), 28.0, 0.2);
        record["humidity"] = json!(140.0);

        let (status, json) = post_json(&state, record.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("humidity"));
    }

    #[tokio::test]
    async fn test_ingest_malformed_json() {
        let state = create_test_state();
        let (status, json) = post_json(&state, "{not json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let (status, _) = post_json(&state, json!({"location": "x"}).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_logs_pagination() {
        let state = create_test_state();
        seed(&state, 5).await;

        let (status, json) = get_json(&state, "/api/weather/logs?page=2&limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["page"], 2);
        assert_eq!(json["limit"], 2);
        assert_eq!(json["total"], 5);
        assert_eq!(json["has_next"], true);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
        assert_eq!(json["data"][0]["timestamp"], "2025-07-01T09:00:00Z");
    }

    #[tokio::test]
    async fn test_list_logs_defaults_and_range() {
        let state = create_test_state();
        seed(&state, 5).await;

        let (status, json) = get_json(
            &state,
            "/api/weather/logs?from=2025-07-01T09:00:00Z&to=2025-07-01T11:00:00%2B00:00",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["page"], 1);
        assert_eq!(json["limit"], 50);
        assert_eq!(json["total"], 3);
        assert_eq!(json["has_next"], false);
    }

    #[tokio::test]
    async fn test_list_logs_bad_input() {
        let state = create_test_state();
        for uri in [
            "/api/weather/logs?page=0",
            "/api/weather/logs?limit=0",
            "/api/weather/logs?limit=1001",
            "/api/weather/logs?page=abc",
            "/api/weather/logs?from=yesterday",
            "/api/weather/logs?from=2025-07-02T00:00:00Z&to=2025-07-01T00:00:00Z",
        ] {
            let (status, json) = get_json(&state, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(json["error"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_summary_empty_is_zero_filled() {
        let state = create_test_state();
        let (status, json) = get_json(&state, "/api/weather/summary").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["location"], "Recife, Brasil");
        assert_eq!(json["records_count"], 0);
        assert_eq!(json["temperature"], json!({"min": 0.0, "max": 0.0, "avg": 0.0}));
        assert_eq!(json["from"], "2025-06-30T12:00:00Z");
        assert_eq!(json["to"], "2025-07-01T12:00:00Z");
    }

    #[tokio::test]
    async fn test_summary_with_data() {
        let state = create_test_state();
        seed(&state, 3).await;

        let (_, json) = get_json(&state, "/api/weather/summary").await;
        assert_eq!(json["records_count"], 3);
        assert_eq!(json["temperature"]["avg"], 24.0);
        assert_eq!(json["humidity"]["max"], 50.0);
    }

    #[tokio::test]
    async fn test_timeseries() {
        let state = create_test_state();
        seed(&state, 3).await;

        let (status, json) = get_json(&state, "/api/weather/timeseries").await;
        assert_eq!(status, StatusCode::OK);
        let points = json["points"].as_array().unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0]["timestamp"], "2025-07-01T09:00:00Z");
        assert_eq!(points[0].as_object().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_insights_empty_window() {
        let state = create_test_state();
        let (status, json) = get_json(&state, "/api/weather/insights").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"alerts": [], "status": "info"}));
    }

    #[tokio::test]
    async fn test_insights_rain_warning() {
        let state = create_test_state();
        let record = record_json(now() - Duration::hours(1), 25.0, 0.85);
        post_json(&state, record.to_string()).await;

        let (_, json) = get_json(&state, "/api/weather/insights").await;
        assert_eq!(json["status"], "warning");
        let alerts = json["alerts"].as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["type"], "warning");
        assert!(alerts[0]["message"].as_str().unwrap().contains("85%"));
    }

    #[tokio::test]
    async fn test_export_csv() {
        let state = create_test_state();
        seed(&state, 2).await;

        let request = Request::builder()
            .uri("/api/weather/export?format=csv")
            .body(Body::empty())
            .unwrap();
        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"weather-data-2025-07-01.csv\""
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("\"timestamp\",\"location\""));
        assert!(lines[1].starts_with("\"2025-07-01T11:00:00Z\""));
    }

    #[tokio::test]
    async fn test_export_xlsx() {
        let state = create_test_state();
        seed(&state, 2).await;

        let request = Request::builder()
            .uri("/api/weather/export?format=xlsx")
            .body(Body::empty())
            .unwrap();
        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"weather-data-2025-07-01.xlsx\""
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"PK\x03\x04"));
    }

    #[tokio::test]
    async fn test_export_unsupported_format() {
        let state = create_test_state();
        let (status, json) = get_json(&state, "/api/weather/export?format=pdf").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .contains("Unsupported export format")
        );
    }

    #[tokio::test]
    async fn test_forecast_upstream_failure() {
        let state = create_test_state();
        let (status, json) = get_json(&state, "/api/weather/forecast").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json["error"].is_string());
    }

    #[test]
    fn test_range_query_parsing() {
        let query = RangeQuery {
            from: Some("2025-07-01T00:00:00-03:00".to_string()),
            to: Some(String::new()),
        };
        let range = query.range().unwrap();
        assert_eq!(range.from, Some(datetime!(2025-07-01 03:00:00 UTC)));
        assert_eq!(range.to, None);
    }
}
