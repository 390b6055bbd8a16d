//! SSE tool server.
//!
//! `GET /sse` answers a discovery request with the static tool catalog.
//! `POST /sse` accepts one function-call envelope and answers with a bounded
//! event stream: exactly one `data:` event carrying the JSON result or the
//! structured error, then end-of-stream. There is no long-lived push channel;
//! each invocation is one request, one event, one close.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::future::{self, Ready};
use futures::stream::{self, Once};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use bars_core::{BarStore, Clock};

use crate::dispatch::{Dispatcher, ToolCallRequest};

/// Configuration for the SSE tool server.
#[derive(Debug, Clone)]
pub struct ToolServerConfig {
    pub addr: SocketAddr,
}

impl ToolServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1:4030".parse().expect("valid tool server address"))
    }
}

/// Serves the tool endpoints until shutdown.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve<S, K>(
    dispatcher: Arc<Dispatcher<S, K>>,
    config: ToolServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: BarStore + 'static,
    K: Clock + 'static,
{
    let addr = config.addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = tool_router(dispatcher);

    info!("bars tool server listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the tool router around a shared dispatcher.
pub fn tool_router<S, K>(dispatcher: Arc<Dispatcher<S, K>>) -> Router
where
    S: BarStore + 'static,
    K: Clock + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/sse", get(discover::<S, K>).post(invoke::<S, K>))
        .with_state(dispatcher)
}

async fn health() -> &'static str {
    "ok"
}

/// Tool-call envelope, modeled after assistant function-calling payloads.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    call_type: String,
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    parameters: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Rejected before dispatch: the envelope itself is malformed.
struct EnvelopeError(String);

impl IntoResponse for EnvelopeError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorBody { error: self.0 });
        (StatusCode::BAD_REQUEST, payload).into_response()
    }
}

async fn discover<S, K>(State(dispatcher): State<Arc<Dispatcher<S, K>>>) -> Json<Value>
where
    S: BarStore + 'static,
    K: Clock + 'static,
{
    Json(json!({ "tools": dispatcher.registry().tools() }))
}

type SingleEvent = Once<Ready<Result<Event, Infallible>>>;

async fn invoke<S, K>(
    State(dispatcher): State<Arc<Dispatcher<S, K>>>,
    Json(body): Json<Value>,
) -> Result<Sse<SingleEvent>, EnvelopeError>
where
    S: BarStore + 'static,
    K: Clock + 'static,
{
    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|err| EnvelopeError(format!("invalid function call format: {err}")))?;
    if envelope.call_type != "function" {
        let call_type = envelope.call_type;
        return Err(EnvelopeError(format!("invalid request type: {call_type}")));
    }

    let request = ToolCallRequest {
        name: envelope.function.name,
        arguments: envelope.function.parameters,
    };

    let payload = match dispatcher.dispatch(&request).await {
        Ok(bars) => json!({ "result": bars }),
        Err(err) => {
            let tool = &request.name;
            warn!("tool dispatch failed for {tool}: {err}");
            json!({ "error": err })
        }
    };

    let event = Event::default().data(payload.to_string());
    Ok(Sse::new(stream::once(future::ready(Ok(event)))))
}
