use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::db::services;
use crate::web::models::{
    ChangeHistoryQuery, ChangeRecordResponse, DeviceDetailResponse, DeviceListItemResponse,
    DeviceWithChangesResponse, StatusUpdateRequest,
};
use crate::web::{AppError, AppState};

const MAX_HISTORY_LIMIT: u64 = 100;

async fn get_all_devices_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeviceListItemResponse>>, AppError> {
    let now = Utc::now();
    let config = &app_state.config;

    services::sweep_stale_devices(&app_state.db_pool, now, Duration::hours(config.stale_after_hours))
        .await?;
    let change_counts = services::count_changes_since(
        &app_state.db_pool,
        now - Duration::days(config.change_window_days),
    )
    .await?;
    let summaries = services::list_device_summaries(&app_state.db_pool, &change_counts).await?;

    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

async fn get_device_detail_handler(
    State(app_state): State<Arc<AppState>>,
    Path(hostname): Path<String>,
) -> Result<Json<DeviceWithChangesResponse>, AppError> {
    let device = services::find_device_by_hostname(&app_state.db_pool, &hostname)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device '{hostname}' not found")))?;
    let device_id = device.id;

    let stored = services::load_components(&app_state.db_pool, device).await?;
    let open_changes =
        services::recent_changes_for_device(&app_state.db_pool, device_id, MAX_HISTORY_LIMIT).await?;

    Ok(Json(DeviceWithChangesResponse {
        device: stored.into(),
        open_changes: open_changes.into_iter().map(Into::into).collect(),
    }))
}

async fn get_device_changes_handler(
    State(app_state): State<Arc<AppState>>,
    Path(hostname): Path<String>,
    Query(query): Query<ChangeHistoryQuery>,
) -> Result<Json<Vec<ChangeRecordResponse>>, AppError> {
    let device = services::find_device_by_hostname(&app_state.db_pool, &hostname)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device '{hostname}' not found")))?;

    let limit = query
        .limit
        .unwrap_or(app_state.config.recent_changes_limit)
        .clamp(1, MAX_HISTORY_LIMIT);
    let records = services::recent_changes_for_device(&app_state.db_pool, device.id, limit).await?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

async fn update_device_status_handler(
    State(app_state): State<Arc<AppState>>,
    Path(hostname): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<DeviceDetailResponse>, AppError> {
    let device = services::set_device_status(&app_state.db_pool, &hostname, payload.status).await?;
    let stored = services::load_components(&app_state.db_pool, device).await?;
    Ok(Json(stored.into()))
}

pub fn devices_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_all_devices_handler))
        .route("/{hostname}", get(get_device_detail_handler))
        .route("/{hostname}/changes", get(get_device_changes_handler))
        .route("/{hostname}/status", put(update_device_status_handler))
}
