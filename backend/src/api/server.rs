//! HTTP Server for the bike sales API.
//!
//! Serves the assembled table to downstream analysis code.
//!
//! # API Endpoints
//!
//! | Method | Path               | Description                          |
//! |--------|--------------------|--------------------------------------|
//! | GET    | `/health`          | Health check                         |
//! | GET    | `/api/orderlines`  | Assemble and return the sales table  |
//! | GET    | `/api/logs`        | SSE stream for real-time logs        |
//!
//! `/api/orderlines` takes `?policy=abort` (default) or `?policy=skip_and_log`.

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, row_error_response, AssembleResponse};
use crate::config::{AssemblerConfig, StoreConfig};
use crate::error::{AssembleError, ConnectionError, ServerError};
use crate::store::SqliteStore;
use crate::transform::{assemble, report_skipped, RowPolicy};

/// Shared server configuration
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: StoreConfig,
    pub assembler: AssemblerConfig,
}

#[derive(Debug, Deserialize)]
struct AssembleQuery {
    #[serde(default)]
    policy: RowPolicy,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/orderlines", get(orderlines))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn start_server(port: u16, state: AppState) -> Result<(), ServerError> {
    let database = state.store.database.display().to_string();
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Bike sales server running on http://localhost:{}", port);
    println!("   GET /api/orderlines - Assembled sales table");
    println!("   GET /api/logs       - SSE log stream");
    println!("   GET /health         - Health check");
    println!("   Store: {}", database);
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "bikesales",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "orderlines": "GET /api/orderlines",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Assemble the sales table from the configured store
async fn orderlines(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AssembleQuery>,
) -> Result<Json<AssembleResponse>, ServerError> {
    log_info(format!("📥 Assembly requested (policy: {:?})", query.policy));

    // rusqlite blocks; keep it off the async workers
    let mut assembly = tokio::task::spawn_blocking(move || {
        let store = SqliteStore::new(state.store.clone());
        assemble(&store, &state.assembler)
    })
    .await
    .map_err(|e| ServerError::Task(e.to_string()))?
    .map_err(AssembleError::from)?;

    let total_rows = assembly.len();
    let warnings = std::mem::take(&mut assembly.warnings);
    let (records, issues) = assembly.into_parts();
    match query.policy {
        RowPolicy::Abort => {
            if let Some(err) = issues.into_iter().next() {
                return Err(AssembleError::from(err).into());
            }
            Ok(Json(AssembleResponse::new(total_rows, records, Vec::new(), warnings)))
        }
        RowPolicy::SkipAndLog => {
            report_skipped(&issues);
            Ok(Json(AssembleResponse::new(total_rows, records, issues, warnings)))
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        log_error(self.to_string());
        let (status, body) = match &self {
            ServerError::Assemble(AssembleError::Row(err)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, row_error_response(err))
            }
            ServerError::Assemble(AssembleError::Connection(err)) => {
                (connection_status(err), error_response(&self.to_string()))
            }
            ServerError::Task(_) | ServerError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_response(&self.to_string()))
            }
        };
        (status, Json(body)).into_response()
    }
}

fn connection_status(err: &ConnectionError) -> StatusCode {
    match err {
        ConnectionError::MissingTable(_) | ConnectionError::InvalidTableName(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}
