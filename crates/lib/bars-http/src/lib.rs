//! Plain REST query endpoints for bars-mcp.
//!
//! Mirrors the two bar queries without the tool-call envelope:
//! `GET /api/latest_bars/{time_level}/{stock_code}` and
//! `GET /api/bars_range/{time_level}/{stock_code}`. An empty result set is a
//! 200 with `count: 0`, not an error.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use bars_core::{Bar, BarStore, Clock, Granularity, strictly_ascending};

/// Configuration for the REST query server.
#[derive(Debug, Clone)]
pub struct RestServerConfig {
    pub addr: SocketAddr,
}

impl RestServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl Default for RestServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1:4040".parse().expect("valid rest server address"))
    }
}

/// Serves the REST endpoints until shutdown.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve<S, K>(
    store: Arc<S>,
    clock: Arc<K>,
    config: RestServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: BarStore + 'static,
    K: Clock + 'static,
{
    let addr = config.addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = rest_router(store, clock);

    info!("bars rest server listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the REST router around a shared store and clock.
pub fn rest_router<S, K>(store: Arc<S>, clock: Arc<K>) -> Router
where
    S: BarStore + 'static,
    K: Clock + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/latest_bars/:time_level/:stock_code",
            get(latest_bars::<S, K>),
        )
        .route(
            "/api/bars_range/:time_level/:stock_code",
            get(bars_range::<S, K>),
        )
        .with_state(AppState { store, clock })
}

struct AppState<S, K> {
    store: Arc<S>,
    clock: Arc<K>,
}

impl<S, K> Clone for AppState<S, K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse { error: self.message });
        (self.status, payload).into_response()
    }
}

/// Response body shared by both queries.
#[derive(Debug, Serialize)]
struct BarSeriesResponse {
    data: Vec<Bar>,
    count: usize,
    time_level: Granularity,
    stock_code: String,
}

impl BarSeriesResponse {
    fn checked(
        bars: Vec<Bar>,
        time_level: Granularity,
        stock_code: String,
    ) -> Result<Self, ApiError> {
        if !strictly_ascending(&bars) {
            return Err(ApiError::bad_gateway(
                "store returned bars out of ascending timestamp order",
            ));
        }
        Ok(Self {
            count: bars.len(),
            data: bars,
            time_level,
            stock_code,
        })
    }
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct LatestQuery {
    end_time: Option<NaiveDateTime>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
}

fn parse_granularity(token: &str) -> Result<Granularity, ApiError> {
    token
        .parse()
        .map_err(|err: bars_core::GranularityParseError| ApiError::bad_request(err.to_string()))
}

async fn latest_bars<S, K>(
    State(state): State<AppState<S, K>>,
    Path((time_level, stock_code)): Path<(String, String)>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<BarSeriesResponse>, ApiError>
where
    S: BarStore + 'static,
    K: Clock + 'static,
{
    let granularity = parse_granularity(&time_level)?;
    let end_time = query.end_time.unwrap_or_else(|| state.clock.now());
    let limit = query.limit.unwrap_or(10);

    let bars = state
        .store
        .fetch_latest(&stock_code, granularity, end_time, limit)
        .await
        .map_err(|err| ApiError::bad_gateway(err.to_string()))?;

    Ok(Json(BarSeriesResponse::checked(bars, granularity, stock_code)?))
}

async fn bars_range<S, K>(
    State(state): State<AppState<S, K>>,
    Path((time_level, stock_code)): Path<(String, String)>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BarSeriesResponse>, ApiError>
where
    S: BarStore + 'static,
    K: Clock + 'static,
{
    let granularity = parse_granularity(&time_level)?;
    if query.start_time > query.end_time {
        return Err(ApiError::bad_request("start_time is after end_time"));
    }

    let bars = state
        .store
        .fetch_range(&stock_code, granularity, query.start_time, query.end_time)
        .await
        .map_err(|err| ApiError::bad_gateway(err.to_string()))?;

    Ok(Json(BarSeriesResponse::checked(bars, granularity, stock_code)?))
}
