use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::analytics::{AnalyticsSnapshot, read_snapshot};
use crate::config::Config;
use crate::error::StationError;
use crate::pipeline::{self, BuildReport, IngestReport};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Serializes pipeline runs; the log has no locking of its own
    writer: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            writer: Arc::new(Mutex::new(())),
        }
    }
}

type ApiError = (StatusCode, String);

pub fn create_router(config: Config) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/ingest", post(ingest))
        .route("/build", post(build))
        .route("/analytics", get(get_analytics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(config))
}

/// Root endpoint
async fn root() -> &'static str {
    "Scrobble Station API v0.1.0"
}

/// Ingest a JSON array of raw scrobbles
async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<IngestReport>, ApiError> {
    let _guard = state.writer.lock().await;
    let report = pipeline::ingest_value(&state.config, body)
        .await
        .map_err(error_response)?;
    tracing::debug!(
        "Ingest request: {} accepted, {} skipped",
        report.ingested,
        report.skipped
    );
    Ok(Json(report))
}

/// Rebuild the analytics snapshot
async fn build(State(state): State<AppState>) -> Result<Json<BuildReport>, ApiError> {
    let _guard = state.writer.lock().await;
    pipeline::build(&state.config)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Latest snapshot written by a build
async fn get_analytics(
    State(state): State<AppState>,
) -> Result<Json<AnalyticsSnapshot>, ApiError> {
    let _guard = state.writer.lock().await;
    match read_snapshot(&state.config.snapshot_path()).await {
        Ok(Some(snapshot)) => Ok(Json(snapshot)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            "No analytics snapshot yet, run a build first".to_string(),
        )),
        Err(e) => Err(error_response(e)),
    }
}

fn error_response(err: StationError) -> ApiError {
    let status = match &err {
        StationError::Usage(_) | StationError::InputFormat { .. } | StationError::NotAnArray(_) => {
            StatusCode::BAD_REQUEST
        }
        StationError::StoreCorruption { .. } => {
            tracing::error!("{}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        StationError::Io { .. } | StationError::Serialize(_) => {
            tracing::warn!("{}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}
