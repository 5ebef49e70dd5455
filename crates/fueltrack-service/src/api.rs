//! REST API endpoints for the dashboard.
//!
//! Every data endpoint takes an optional, repeatable `stations` query
//! parameter, one station key per occurrence. Keys are taken verbatim, so a
//! key may itself contain commas:
//!
//! - absent: all stations are selected
//! - present but empty (`?stations=`): nothing is selected and the result is empty
//!
//! The read path never fails because of the document's state. A missing or
//! damaged price history is served as an empty one with HTTP 200; only
//! malformed query parameters produce an error (400).

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
};
use serde::Serialize;
use time::OffsetDateTime;

use fueltrack_store::{
    PriceStore, Selection, SnapshotSource, StationSummary, Statistics, aggregate,
};
use fueltrack_types::PriceReading;

use crate::state::AppState;

/// Largest `limit` accepted by `/api/readings`.
pub const MAX_READINGS_LIMIT: usize = 10_000;

const DASHBOARD: &str = include_str!("../assets/dashboard.html");

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/health", get(health))
        .route("/api/status", get(get_status))
        .route("/api/stations", get(list_stations))
        .route("/api/series", get(get_series))
        .route("/api/statistics", get(get_statistics))
        .route("/api/readings", get(get_readings))
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Process id of the answering server, so a supervisor can tell its own
    /// child from another instance still holding the port.
    pub pid: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        pid: std::process::id(),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Server and price history overview.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    /// Readings in the price history.
    pub records: usize,
    /// Stations seen in the price history.
    pub stations: usize,
    /// Stations listed in the configuration.
    pub configured_stations: usize,
    pub store: StoreStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct StoreStatus {
    pub path: String,
    pub source: SnapshotSource,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.store.load_all();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        records: snapshot.len(),
        stations: aggregate::list_stations(&snapshot.readings).len(),
        configured_stations: state.config.stations.station_count(),
        store: StoreStatus {
            path: state.store.path().display().to_string(),
            source: snapshot.source,
        },
        started_at: state.started_at,
        uptime_secs: state.uptime_secs(),
    })
}

/// Query parameters shared by the data endpoints.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SelectionQuery {
    /// One entry per `stations` parameter; `None` when the parameter is absent.
    pub stations: Option<Vec<String>>,
    /// Maximum rows, for `/api/readings`.
    pub limit: Option<usize>,
}

impl SelectionQuery {
    /// Parse and validate a raw query string.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(raw.unwrap_or(""))
            .map_err(|e| AppError::BadRequest(format!("Invalid query string: {e}")))?;

        let mut query = Self::default();
        for (name, value) in pairs {
            match name.as_str() {
                "stations" => query.stations.get_or_insert_with(Vec::new).push(value),
                "limit" => {
                    let limit = value.trim().parse().map_err(|_| {
                        AppError::BadRequest(format!("Invalid limit '{value}': not a number"))
                    })?;
                    query.limit = Some(limit);
                }
                _ => {}
            }
        }

        query.validate()?;
        Ok(query)
    }

    /// The stations this query selects.
    pub fn selection(&self) -> Selection {
        match &self.stations {
            None => Selection::All,
            Some(keys) => Selection::only(
                keys.iter()
                    .map(|key| key.trim())
                    .filter(|key| !key.is_empty()),
            ),
        }
    }

    /// Validate the query parameters.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(limit) = self.limit
            && !(1..=MAX_READINGS_LIMIT).contains(&limit)
        {
            return Err(AppError::BadRequest(format!(
                "Invalid limit {limit}: must be between 1 and {MAX_READINGS_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Distinct stations in the price history.
async fn list_stations(State(state): State<Arc<AppState>>) -> Json<Vec<StationSummary>> {
    let snapshot = state.store.load_all();
    Json(aggregate::list_stations(&snapshot.readings))
}

/// Per-station readings, oldest first.
async fn get_series(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Result<Json<BTreeMap<String, Vec<PriceReading>>>, AppError> {
    let query = SelectionQuery::parse(raw.as_deref())?;
    let snapshot = state.store.load_all();
    Ok(Json(aggregate::filtered_series(
        &snapshot.readings,
        &query.selection(),
    )))
}

async fn get_statistics(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Statistics>, AppError> {
    let query = SelectionQuery::parse(raw.as_deref())?;
    let snapshot = state.store.load_all();
    Ok(Json(aggregate::statistics(
        &snapshot.readings,
        &query.selection(),
    )))
}

/// Selected readings, newest first, optionally limited.
async fn get_readings(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Vec<PriceReading>>, AppError> {
    let query = SelectionQuery::parse(raw.as_deref())?;
    let snapshot = state.store.load_all();
    let mut rows = aggregate::recent_first(&snapshot.readings, &query.selection());
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    Ok(Json(rows))
}

/// API errors.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
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
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use fueltrack_store::JsonStore;
    use fueltrack_types::{StationConfig, StationTarget};
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;
    use time::macros::datetime;
    use tower::ServiceExt;

    use crate::config::Config;

    fn create_test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let store = JsonStore::open(dir.path().join("prices.json")).unwrap();
        AppState::new(store, Config::default())
    }

    fn seeded_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let mut store = JsonStore::open(dir.path().join("prices.json")).unwrap();
        let relais = StationTarget::new("92400", StationConfig::new("RELAIS").brand("TOTAL"));
        let auchan = StationTarget::new("92400", StationConfig::new("AUCHAN"));
        {
            let mut guard = store.begin_write().unwrap();
            guard.upsert(relais.reading(dec!(1.80), datetime!(2025-01-01 08:00 UTC)));
            guard.upsert(relais.reading(dec!(1.85), datetime!(2025-01-02 08:00 UTC)));
            guard.upsert(auchan.reading(dec!(1.75), datetime!(2025-01-02 09:00 UTC)));
            guard.commit().unwrap();
        }
        AppState::new(store, Config::default())
    }

    async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router()
            .with_state(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response_body(response).await;
        (status, serde_json::from_str(&body).unwrap())
    }

    async fn response_body(response: axum::response::Response) -> String {
        let body = response.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = get(create_test_state(&dir), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert_eq!(json["pid"], std::process::id());
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_dashboard_page() {
        let dir = tempfile::tempdir().unwrap();
        let response = router()
            .with_state(create_test_state(&dir))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body(response).await;
        assert!(body.contains("/api/series"));
    }

    #[tokio::test]
    async fn test_missing_store_serves_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let state = create_test_state(&dir);

        let (status, json) = get(Arc::clone(&state), "/api/stations").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.as_array().unwrap().is_empty());

        let (status, json) = get(Arc::clone(&state), "/api/statistics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_records"], 0);
        assert!(json["current_price"].is_null());

        let (_, json) = get(state, "/api/status").await;
        assert_eq!(json["records"], 0);
        assert_eq!(json["store"]["source"]["kind"], "missing");
    }

    #[tokio::test]
    async fn test_corrupt_store_serves_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let state = create_test_state(&dir);
        std::fs::write(dir.path().join("prices.json"), "{ broken").unwrap();

        let (status, json) = get(Arc::clone(&state), "/api/series").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.as_object().unwrap().is_empty());

        let (_, json) = get(state, "/api/status").await;
        assert_eq!(json["store"]["source"]["kind"], "corrupt");
    }

    #[tokio::test]
    async fn test_list_stations() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = get(seeded_state(&dir), "/api/stations").await;

        assert_eq!(status, StatusCode::OK);
        let stations = json.as_array().unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0]["station_key"], "AUCHAN");
        assert_eq!(stations[1]["station_key"], "RELAIS | TOTAL");
        assert_eq!(stations[1]["fuel_type"], "SP98");
    }

    #[tokio::test]
    async fn test_series_selection() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(&dir);

        let (_, all) = get(Arc::clone(&state), "/api/series").await;
        assert_eq!(all.as_object().unwrap().len(), 2);
        let relais = all["RELAIS | TOTAL"].as_array().unwrap();
        assert_eq!(relais.len(), 2);
        assert_eq!(relais[0]["price"], 1.8);

        let (_, one) = get(Arc::clone(&state), "/api/series?stations=AUCHAN").await;
        assert_eq!(one.as_object().unwrap().len(), 1);
        assert_eq!(one["AUCHAN"][0]["price"], 1.75);

        let (status, none) = get(state, "/api/series?stations=").await;
        assert_eq!(status, StatusCode::OK);
        assert!(none.as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(&dir);

        let (status, json) = get(Arc::clone(&state), "/api/statistics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_records"], 3);
        assert_eq!(json["current_price"], 1.75);
        assert_eq!(json["min_price"], 1.75);
        assert_eq!(json["max_price"], 1.85);
        assert_eq!(json["current_prices"]["RELAIS | TOTAL"], 1.85);
        assert_eq!(json["last_updated"], "2025-01-02T09:00:00Z");

        let (_, json) = get(state, "/api/statistics?stations=RELAIS%20%7C%20TOTAL").await;
        assert_eq!(json["total_records"], 2);
        assert_eq!(json["min_price"], 1.8);
    }

    #[tokio::test]
    async fn test_readings_newest_first_with_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = get(seeded_state(&dir), "/api/readings?limit=2").await;

        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["station_key"], "AUCHAN");
        assert_eq!(rows[1]["timestamp"], "2025-01-02T08:00:00Z");
    }

    #[tokio::test]
    async fn test_bad_limit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(&dir);

        let (status, json) = get(Arc::clone(&state), "/api/readings?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("limit"));

        let (status, json) = get(state, "/api/readings?limit=lots").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_station_key_with_comma_is_selectable() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(dir.path().join("prices.json")).unwrap();
        let carrefour = StationTarget::new("92400", StationConfig::new("CARREFOUR, COURBEVOIE"));
        let relais = StationTarget::new("92400", StationConfig::new("RELAIS"));
        {
            let mut guard = store.begin_write().unwrap();
            guard.upsert(carrefour.reading(dec!(1.79), datetime!(2025-01-01 08:00 UTC)));
            guard.upsert(relais.reading(dec!(1.82), datetime!(2025-01-01 09:00 UTC)));
            guard.commit().unwrap();
        }
        let state = AppState::new(store, Config::default());

        let (status, one) = get(
            Arc::clone(&state),
            "/api/series?stations=CARREFOUR%2C%20COURBEVOIE",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let series = one.as_object().unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(one["CARREFOUR, COURBEVOIE"][0]["price"], 1.79);

        let (_, both) = get(
            state,
            "/api/series?stations=CARREFOUR%2C%20COURBEVOIE&stations=RELAIS",
        )
        .await;
        assert_eq!(both.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_selection_query_parsing() {
        let query = SelectionQuery::parse(None).unwrap();
        assert_eq!(query, SelectionQuery::default());
        assert_eq!(query.selection(), Selection::All);

        let raw = "stations=+A+&stations=&stations=B&limit=5";
        let query = SelectionQuery::parse(Some(raw)).unwrap();
        assert_eq!(query.selection(), Selection::only(["A", "B"]));
        assert_eq!(query.limit, Some(5));

        let query = SelectionQuery::parse(Some("stations=A%2CB")).unwrap();
        assert_eq!(query.selection(), Selection::only(["A,B"]));

        let query = SelectionQuery::parse(Some("stations=")).unwrap();
        assert!(query.selection().is_empty());

        let query = SelectionQuery::parse(Some("other=1")).unwrap();
        assert_eq!(query.selection(), Selection::All);

        assert!(SelectionQuery::parse(Some("limit=20000")).is_err());
    }
}
