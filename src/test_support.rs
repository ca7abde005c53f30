//! Shared helpers for the database-backed tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

use crate::db::entities::device;
use crate::db::enums::DeviceStatus;
use crate::db::schema::sync_schema;
use crate::inventory::{IngestRequest, InventorySnapshot};
use crate::server::config::ServerConfig;

/// Fresh in-memory SQLite store with the schema applied. One connection, so
/// every query sees the same memory database.
pub async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    sync_schema(&db).await.unwrap();
    db
}

/// Validates an agent body the same way the ingest route does.
pub fn snapshot_from(body: serde_json::Value) -> InventorySnapshot {
    let req: IngestRequest = serde_json::from_value(body).unwrap();
    InventorySnapshot::try_from(req).unwrap()
}

/// Inserts a bare `active` device last seen at `last_seen`.
pub async fn seed_device_seen_at(
    db: &DatabaseConnection,
    hostname: &str,
    last_seen: DateTime<Utc>,
) -> i32 {
    device::ActiveModel {
        hostname: Set(hostname.to_string()),
        status: Set(DeviceStatus::Active),
        last_seen: Set(last_seen),
        created_at: Set(last_seen),
        updated_at: Set(last_seen),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn seed_device(db: &DatabaseConnection, hostname: &str) -> i32 {
    seed_device_seen_at(db, hostname, Utc::now()).await
}

pub fn test_config() -> Arc<ServerConfig> {
    Arc::new(ServerConfig {
        listen_addr: ([127, 0, 0, 1], 0).into(),
        database_url: "sqlite::memory:".to_string(),
        max_db_connections: 1,
        log_dir: "logs".to_string(),
        stale_after_hours: 24,
        change_window_days: 7,
        recent_changes_limit: 10,
    })
}
