use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveEnum, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use tracing::{debug, warn};

use crate::db::entities::prelude::*;
use crate::db::enums::DeviceStatus;

/// Marks every `active` device that has not reported within `stale_after` as
/// `offline` in one bulk update. Devices in maintenance are never touched.
/// Returns the number of devices demoted.
pub async fn sweep_stale_devices<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Result<u64, DbErr> {
    let cutoff = now - stale_after;
    let result = Device::update_many()
        .col_expr(DeviceColumn::Status, Expr::value(sea_orm::Value::from(DeviceStatus::Offline.into_value())))
        .col_expr(DeviceColumn::UpdatedAt, Expr::value(sea_orm::Value::ChronoDateTimeUtc(Some(Box::new(now)))))
        .filter(DeviceColumn::Status.eq(DeviceStatus::Active))
        .filter(DeviceColumn::LastSeen.lt(cutoff))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        warn!(
            count = result.rows_affected,
            stale_after_hours = stale_after.num_hours(),
            "Devices not seen within the staleness window marked offline."
        );
    } else {
        debug!("Liveness sweep found no stale devices.");
    }
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::services::device_service::{find_device_by_hostname, set_device_status};
    use crate::test_support::{memory_db, seed_device_seen_at};

    #[tokio::test]
    async fn only_stale_active_devices_go_offline() {
        let db = memory_db().await;
        let now = Utc::now();
        seed_device_seen_at(&db, "stale", now - Duration::hours(25)).await;
        seed_device_seen_at(&db, "fresh", now - Duration::hours(2)).await;
        seed_device_seen_at(&db, "parked", now - Duration::days(10)).await;
        set_device_status(&db, "parked", DeviceStatus::Maintenance).await.unwrap();

        let demoted = sweep_stale_devices(&db, now, Duration::hours(24)).await.unwrap();
        assert_eq!(demoted, 1);

        for (host, expected) in [
            ("stale", DeviceStatus::Offline),
            ("fresh", DeviceStatus::Active),
            ("parked", DeviceStatus::Maintenance),
        ] {
            let device = find_device_by_hostname(&db, host).await.unwrap().unwrap();
            assert_eq!(device.status, expected, "{host}");
        }

        assert_eq!(sweep_stale_devices(&db, now, Duration::hours(24)).await.unwrap(), 0);
    }
}
