use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{debug, info, warn};

use crate::db::entities::prelude::*;
use crate::db::enums::{ComponentType, Severity};
use crate::inventory::{Divergence, FamilyOutcome, ReconcileReport};

/// What applying one reconcile report did to the open records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedChanges {
    /// Records inserted or replaced because a new divergence was observed.
    pub produced: usize,
    /// Records deleted because the family matches its baseline again.
    pub cleared: usize,
}

/// The open record of a family at one severity. Warnings and criticals are
/// tracked as separate rows.
pub async fn find_open_record<C: ConnectionTrait>(
    db: &C,
    device_id: i32,
    component_type: ComponentType,
    severity: Severity,
) -> Result<Option<ChangeRecordModel>, DbErr> {
    ChangeRecord::find()
        .filter(ChangeRecordColumn::DeviceId.eq(device_id))
        .filter(ChangeRecordColumn::ComponentType.eq(component_type))
        .filter(ChangeRecordColumn::Severity.eq(severity))
        .one(db)
        .await
}

/// Makes `divergence` the open record of the family at its severity. Returns
/// `false` when that record already describes the same observed state.
pub async fn upsert_open_record<C: ConnectionTrait>(
    db: &C,
    device_id: i32,
    component_type: ComponentType,
    divergence: &Divergence,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    match find_open_record(db, device_id, component_type, divergence.severity).await? {
        Some(existing) if existing.new_value == divergence.new_value => {
            debug!(device_id, component = %component_type, "Divergence already recorded.");
            Ok(false)
        }
        Some(existing) => {
            let mut active_model = existing.into_active_model();
            active_model.change_type = Set(divergence.change_type);
            active_model.old_value = Set(divergence.old_value.clone());
            active_model.new_value = Set(divergence.new_value.clone());
            active_model.message = Set(divergence.message.clone());
            active_model.created_at = Set(now);
            active_model.update(db).await?;
            Ok(true)
        }
        None => {
            ChangeRecordActiveModel {
                device_id: Set(device_id),
                component_type: Set(component_type),
                change_type: Set(divergence.change_type),
                old_value: Set(divergence.old_value.clone()),
                new_value: Set(divergence.new_value.clone()),
                message: Set(divergence.message.clone()),
                severity: Set(divergence.severity),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
            Ok(true)
        }
    }
}

/// Deletes the open warning of the family, if any. Critical records are never
/// cleared here. Returns the number of rows removed.
pub async fn clear_open_warning<C: ConnectionTrait>(
    db: &C,
    device_id: i32,
    component_type: ComponentType,
) -> Result<u64, DbErr> {
    let result = ChangeRecord::delete_many()
        .filter(ChangeRecordColumn::DeviceId.eq(device_id))
        .filter(ChangeRecordColumn::ComponentType.eq(component_type))
        .filter(ChangeRecordColumn::Severity.eq(Severity::Warning))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Persists a reconcile report. Drifting families get the open record of their
/// severity upserted; a critical drift also supersedes the family's open
/// warning. Consistent families have their open warning cleared and keep any
/// critical record. Skipped families are left alone.
pub async fn apply_reconcile_report<C: ConnectionTrait>(
    db: &C,
    device_id: i32,
    hostname: &str,
    report: &ReconcileReport,
    now: DateTime<Utc>,
) -> Result<AppliedChanges, DbErr> {
    let mut applied = AppliedChanges::default();

    for family in &report.families {
        match &family.outcome {
            FamilyOutcome::Skipped => {}
            FamilyOutcome::Consistent => {
                let removed = clear_open_warning(db, device_id, family.component_type).await?;
                if removed > 0 {
                    info!(hostname, component = %family.component_type, "Component matches baseline again; warning cleared.");
                    applied.cleared += removed as usize;
                }
            }
            FamilyOutcome::Drift(divergence) => {
                if divergence.severity == Severity::Critical {
                    applied.cleared +=
                        clear_open_warning(db, device_id, family.component_type).await? as usize;
                }
                if upsert_open_record(db, device_id, family.component_type, divergence, now).await? {
                    match divergence.severity {
                        Severity::Critical => warn!(
                            hostname,
                            component = %family.component_type,
                            change_type = %divergence.change_type,
                            "{}",
                            divergence.message
                        ),
                        Severity::Warning => info!(
                            hostname,
                            component = %family.component_type,
                            change_type = %divergence.change_type,
                            "{}",
                            divergence.message
                        ),
                    }
                    applied.produced += 1;
                }
            }
        }
    }

    Ok(applied)
}

/// Open records of a device, newest first.
pub async fn recent_changes_for_device<C: ConnectionTrait>(
    db: &C,
    device_id: i32,
    limit: u64,
) -> Result<Vec<ChangeRecordModel>, DbErr> {
    ChangeRecord::find()
        .filter(ChangeRecordColumn::DeviceId.eq(device_id))
        .order_by_desc(ChangeRecordColumn::CreatedAt)
        .order_by_desc(ChangeRecordColumn::Id)
        .limit(limit)
        .all(db)
        .await
}

/// Number of records per device created at or after `since`.
pub async fn count_changes_since<C: ConnectionTrait>(
    db: &C,
    since: DateTime<Utc>,
) -> Result<HashMap<i32, i64>, DbErr> {
    let rows: Vec<(i32, i64)> = ChangeRecord::find()
        .select_only()
        .column(ChangeRecordColumn::DeviceId)
        .column_as(ChangeRecordColumn::Id.count(), "count")
        .filter(ChangeRecordColumn::CreatedAt.gte(since))
        .group_by(ChangeRecordColumn::DeviceId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}
