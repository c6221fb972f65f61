use crate::backend::Backend;
use crate::error::ApiError;
use audit_core::chain::export_file_name;
use audit_core::{now_millis, AuditLog, ChainSnapshot, ScanResult, Stats, Submission, Verification};
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    log: Arc<Mutex<AuditLog<Backend>>>,
    classifier_online: watch::Receiver<bool>,
    lenient: bool,
}

impl AppState {
    pub fn new(
        log: AuditLog<Backend>,
        classifier_online: watch::Receiver<bool>,
        lenient: bool,
    ) -> Self {
        Self {
            log: Arc::new(Mutex::new(log)),
            classifier_online,
            lenient,
        }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct ClassifierHealth {
    online: bool,
}

#[derive(Serialize)]
struct StatsView {
    #[serde(flatten)]
    stats: Stats,
    average: i64,
}

#[derive(Serialize)]
struct Cleared {
    cleared: bool,
    warnings: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/classifier/health", get(classifier_health))
        .route("/scan", post(scan))
        .route("/chain", get(chain).delete(clear_chain))
        .route("/chain/verify", get(verify))
        .route("/chain/export", get(export))
        .route("/stats", get(stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn classifier_health(State(state): State<AppState>) -> Json<ClassifierHealth> {
    let online = *state.classifier_online.borrow();
    Json(ClassifierHealth { online })
}

async fn scan(
    State(state): State<AppState>,
    Json(scan): Json<ScanResult>,
) -> Result<Json<Submission>, ApiError> {
    let scan = if state.lenient { scan.or_defaults() } else { scan };
    let mut log = state.log.lock().await;
    let submission = log.submit(&scan, now_millis())?;
    for warning in &submission.warnings {
        warn!(
            block_number = submission.block.block_number,
            %warning,
            "scan recorded in memory only"
        );
    }
    Ok(Json(submission))
}

async fn chain(State(state): State<AppState>) -> Json<ChainSnapshot> {
    let log = state.log.lock().await;
    Json(log.chain().snapshot().clone())
}

async fn clear_chain(State(state): State<AppState>) -> Json<Cleared> {
    let mut log = state.log.lock().await;
    let cleared = log.clear_chain();
    Json(Cleared {
        cleared: true,
        warnings: cleared.warning.into_iter().collect(),
    })
}

async fn verify(State(state): State<AppState>) -> Json<Verification> {
    let log = state.log.lock().await;
    Json(log.chain().verify_report())
}

async fn export(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.log.lock().await.chain().export()?;
    let disposition = format!("attachment; filename=\"{}\"", export_file_name(now_millis()));
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

async fn stats(State(state): State<AppState>) -> Json<StatsView> {
    let stats = state.log.lock().await.stats();
    Json(StatsView {
        stats,
        average: stats.average(),
    })
}
