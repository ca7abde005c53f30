use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::db::services;
use crate::inventory::{IngestRequest, InventorySnapshot};
use crate::web::models::IngestResponse;
use crate::web::{AppError, AppState};

async fn ingest_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    let snapshot = InventorySnapshot::try_from(payload)?;

    let outcome = services::ingest_snapshot(
        &app_state.db_pool,
        &snapshot,
        app_state.config.recent_changes_limit,
    )
    .await?;

    info!(
        hostname = %snapshot.hostname,
        created = outcome.created,
        changes_detected = outcome.changes_detected,
        "Inventory snapshot ingested."
    );

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.into())))
}

pub fn ingest_router() -> Router<Arc<AppState>> {
    Router::new().route("/ingest", post(ingest_handler))
}
