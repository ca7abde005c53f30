//! One agent submission, end to end: first contact forms the baseline, every
//! later contact is reconciled against it.
//!
//! The whole read, diff and write sequence runs in a single transaction. A
//! failure anywhere rolls back the scalar updates together with the change
//! record upserts and deletions of that request.

use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info};

use crate::db::enums::DeviceStatus;
use crate::db::models::IngestOutcome;
use crate::db::services::change_record_service::{apply_reconcile_report, recent_changes_for_device};
use crate::db::services::device_service::{
    create_baseline, find_device_by_hostname, load_components, record_contact,
};
use crate::inventory::{Baseline, InventorySnapshot, reconcile};
use crate::web::error::AppError;

pub async fn ingest_snapshot(
    db: &DatabaseConnection,
    snapshot: &InventorySnapshot,
    recent_limit: u64,
) -> Result<IngestOutcome, AppError> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let (device, created, changes_detected) =
        match find_device_by_hostname(&txn, &snapshot.hostname).await? {
            None => {
                let device = create_baseline(&txn, snapshot, now).await?;
                (device, true, 0)
            }
            Some(device) => {
                let stored = load_components(&txn, device).await?;
                let report = reconcile(&Baseline::from(&stored), snapshot);
                let device = stored.device;

                let produced = if device.status == DeviceStatus::Maintenance {
                    let drifts = report.drifts().count();
                    info!(
                        hostname = %device.hostname,
                        drifts,
                        "Device in maintenance; reconciliation logged but not recorded."
                    );
                    0
                } else {
                    let applied =
                        apply_reconcile_report(&txn, device.id, &device.hostname, &report, now).await?;
                    debug!(
                        hostname = %device.hostname,
                        produced = applied.produced,
                        cleared = applied.cleared,
                        "Reconciliation applied."
                    );
                    applied.produced
                };

                let device = record_contact(&txn, device, snapshot, now).await?;
                (device, false, produced)
            }
        };

    let device_id = device.id;
    let device = load_components(&txn, device).await?;
    let recent_changes = recent_changes_for_device(&txn, device_id, recent_limit).await?;
    txn.commit().await?;

    Ok(IngestOutcome {
        created,
        changes_detected,
        device,
        recent_changes,
    })
}
