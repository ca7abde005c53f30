use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::info;

use crate::db::entities::prelude::*;
use crate::db::entities::{
    device, device_cpu, device_gpu, device_motherboard, device_network_interface,
    device_ram_module, device_storage_disk,
};
use crate::db::enums::DeviceStatus;
use crate::db::models::{DeviceSummary, DeviceWithComponents};
use crate::inventory::snapshot::{CpuSpec, GpuSpec, MotherboardSpec, RamModuleSpec, StorageDiskSpec};
use crate::inventory::{Baseline, InventorySnapshot};
use crate::web::error::AppError;

// --- Device Service Functions ---

/// Retrieves a device by its hostname.
pub async fn find_device_by_hostname<C: ConnectionTrait>(
    db: &C,
    hostname: &str,
) -> Result<Option<device::Model>, DbErr> {
    Device::find()
        .filter(DeviceColumn::Hostname.eq(hostname))
        .one(db)
        .await
}

/// Persists a first-seen snapshot verbatim as the device's baseline.
///
/// RAM modules and disks are stored under their explicit index, or their list
/// position when the agent sent none.
pub async fn create_baseline<C: ConnectionTrait>(
    db: &C,
    snapshot: &InventorySnapshot,
    now: DateTime<Utc>,
) -> Result<device::Model, AppError> {
    let ram_slots = snapshot.resolved_ram_slots()?;
    let disks = snapshot.resolved_storage_disks()?;

    let new_device = device::ActiveModel {
        hostname: Set(snapshot.hostname.clone()),
        status: Set(DeviceStatus::Active),
        last_seen: Set(now),
        os: Set(snapshot.os.clone()),
        brand: Set(snapshot.brand.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let device = new_device.insert(db).await?;

    if let Some(cpu) = &snapshot.cpu {
        device_cpu::ActiveModel {
            device_id: Set(device.id),
            model: Set(cpu.model.clone()),
            cores: Set(cpu.cores),
            clock: Set(cpu.clock.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    if let Some(gpu) = &snapshot.gpu {
        device_gpu::ActiveModel {
            device_id: Set(device.id),
            model: Set(gpu.model.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    if let Some(board) = &snapshot.motherboard {
        device_motherboard::ActiveModel {
            device_id: Set(device.id),
            model: Set(board.model.clone()),
            serial_number: Set(board.serial_number.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    for (slot_index, module) in ram_slots {
        device_ram_module::ActiveModel {
            device_id: Set(device.id),
            slot_index: Set(slot_index),
            manufacturer: Set(module.manufacturer.clone()),
            model: Set(module.model.clone()),
            capacity: Set(module.capacity.clone()),
            speed: Set(module.speed.clone()),
            memory_type: Set(module.memory_type.clone()),
            form_factor: Set(module.form_factor.clone()),
            serial_number: Set(module.serial_number.clone()),
            bank: Set(module.bank.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    for (disk_index, disk) in disks {
        device_storage_disk::ActiveModel {
            device_id: Set(device.id),
            disk_index: Set(disk_index),
            manufacturer: Set(disk.manufacturer.clone()),
            model: Set(disk.model.clone()),
            size: Set(disk.size.clone()),
            interface: Set(disk.interface.clone()),
            disk_type: Set(disk.disk_type.clone()),
            serial_number: Set(disk.serial_number.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    for iface in &snapshot.interfaces {
        device_network_interface::ActiveModel {
            device_id: Set(device.id),
            name: Set(iface.name.clone()),
            mac_addr: Set(iface.mac_addr.clone()),
            ipv4: Set(iface.ipv4.clone()),
            is_up: Set(iface.is_up),
            bandwidth: Set(iface.bandwidth.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    info!(
        hostname = %device.hostname,
        device_id = device.id,
        ram_modules = snapshot.ram.len(),
        storage_disks = snapshot.storage.len(),
        "Baseline created for new device."
    );
    Ok(device)
}

/// Loads a device's baseline components.
pub async fn load_components<C: ConnectionTrait>(
    db: &C,
    device: device::Model,
) -> Result<DeviceWithComponents, DbErr> {
    let cpu = DeviceCpu::find()
        .filter(device_cpu::Column::DeviceId.eq(device.id))
        .one(db)
        .await?;
    let gpu = DeviceGpu::find()
        .filter(device_gpu::Column::DeviceId.eq(device.id))
        .one(db)
        .await?;
    let motherboard = DeviceMotherboard::find()
        .filter(device_motherboard::Column::DeviceId.eq(device.id))
        .one(db)
        .await?;
    let ram_modules = DeviceRamModule::find()
        .filter(device_ram_module::Column::DeviceId.eq(device.id))
        .order_by_asc(device_ram_module::Column::SlotIndex)
        .all(db)
        .await?;
    let storage_disks = DeviceStorageDisk::find()
        .filter(device_storage_disk::Column::DeviceId.eq(device.id))
        .order_by_asc(device_storage_disk::Column::DiskIndex)
        .all(db)
        .await?;
    let network_interfaces = DeviceNetworkInterface::find()
        .filter(device_network_interface::Column::DeviceId.eq(device.id))
        .order_by_asc(device_network_interface::Column::Id)
        .all(db)
        .await?;

    Ok(DeviceWithComponents {
        device,
        cpu,
        gpu,
        motherboard,
        ram_modules,
        storage_disks,
        network_interfaces,
    })
}

impl From<&DeviceWithComponents> for Baseline {
    fn from(stored: &DeviceWithComponents) -> Self {
        Baseline {
            cpu: stored.cpu.as_ref().map(|c| CpuSpec {
                model: c.model.clone(),
                cores: c.cores,
                clock: c.clock.clone(),
            }),
            gpu: stored.gpu.as_ref().map(|g| GpuSpec { model: g.model.clone() }),
            motherboard: stored.motherboard.as_ref().map(|m| MotherboardSpec {
                model: m.model.clone(),
                serial_number: m.serial_number.clone(),
            }),
            ram: stored
                .ram_modules
                .iter()
                .map(|r| RamModuleSpec {
                    slot_index: Some(r.slot_index),
                    manufacturer: r.manufacturer.clone(),
                    model: r.model.clone(),
                    capacity: r.capacity.clone(),
                    speed: r.speed.clone(),
                    memory_type: r.memory_type.clone(),
                    form_factor: r.form_factor.clone(),
                    serial_number: r.serial_number.clone(),
                    bank: r.bank.clone(),
                })
                .collect(),
            storage: stored
                .storage_disks
                .iter()
                .map(|d| StorageDiskSpec {
                    disk_index: Some(d.disk_index),
                    manufacturer: d.manufacturer.clone(),
                    model: d.model.clone(),
                    size: d.size.clone(),
                    interface: d.interface.clone(),
                    disk_type: d.disk_type.clone(),
                    serial_number: d.serial_number.clone(),
                })
                .collect(),
        }
    }
}

/// Records contact from the agent: refreshes `last_seen` and the reported
/// scalar fields, and promotes an `offline` device back to `active`.
/// `maintenance` is left as is.
pub async fn record_contact<C: ConnectionTrait>(
    db: &C,
    device: device::Model,
    snapshot: &InventorySnapshot,
    now: DateTime<Utc>,
) -> Result<device::Model, DbErr> {
    let previous_status = device.status;
    let mut active_model = device.into_active_model();
    active_model.last_seen = Set(now);
    active_model.updated_at = Set(now);
    if let Some(os) = &snapshot.os {
        active_model.os = Set(Some(os.clone()));
    }
    if let Some(brand) = &snapshot.brand {
        active_model.brand = Set(Some(brand.clone()));
    }
    if previous_status == DeviceStatus::Offline {
        active_model.status = Set(DeviceStatus::Active);
        info!(hostname = %snapshot.hostname, "Device is back online.");
    }
    active_model.update(db).await
}

/// Administrative status change. Only `active` and `maintenance` can be set by
/// hand; `offline` is derived from liveness.
pub async fn set_device_status<C: ConnectionTrait>(
    db: &C,
    hostname: &str,
    status: DeviceStatus,
) -> Result<device::Model, AppError> {
    if status == DeviceStatus::Offline {
        return Err(AppError::InvalidInput(
            "Status 'offline' is managed automatically and cannot be set.".to_string(),
        ));
    }
    let device = find_device_by_hostname(db, hostname)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device '{hostname}' not found")))?;
    if device.status == status {
        return Ok(device);
    }

    let previous = device.status;
    let mut active_model = device.into_active_model();
    active_model.status = Set(status);
    active_model.updated_at = Set(Utc::now());
    let updated = active_model.update(db).await?;
    info!(hostname = %hostname, from = %previous, to = %status, "Device status changed by administrator.");
    Ok(updated)
}

async fn count_by_device<C, E>(db: &C, device_column: E::Column) -> Result<HashMap<i32, i64>, DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let rows: Vec<(i32, i64)> = E::find()
        .select_only()
        .column(device_column)
        .column_as(device_column.count(), "count")
        .group_by(device_column)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Lists every device with a short component summary. `change_counts` maps
/// device ids to their recent change count.
pub async fn list_device_summaries<C: ConnectionTrait>(
    db: &C,
    change_counts: &HashMap<i32, i64>,
) -> Result<Vec<DeviceSummary>, DbErr> {
    let devices = Device::find()
        .order_by_asc(DeviceColumn::Hostname)
        .all(db)
        .await?;

    let cpu_models: HashMap<i32, Option<String>> = DeviceCpu::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.device_id, c.model))
        .collect();
    let gpu_models: HashMap<i32, Option<String>> = DeviceGpu::find()
        .all(db)
        .await?
        .into_iter()
        .map(|g| (g.device_id, g.model))
        .collect();
    let board_models: HashMap<i32, Option<String>> = DeviceMotherboard::find()
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.device_id, m.model))
        .collect();
    let ram_counts = count_by_device::<_, DeviceRamModule>(db, device_ram_module::Column::DeviceId).await?;
    let disk_counts =
        count_by_device::<_, DeviceStorageDisk>(db, device_storage_disk::Column::DeviceId).await?;

    Ok(devices
        .into_iter()
        .map(|d| DeviceSummary {
            cpu_model: cpu_models.get(&d.id).cloned().flatten(),
            gpu_model: gpu_models.get(&d.id).cloned().flatten(),
            motherboard_model: board_models.get(&d.id).cloned().flatten(),
            ram_module_count: ram_counts.get(&d.id).copied().unwrap_or(0),
            storage_disk_count: disk_counts.get(&d.id).copied().unwrap_or(0),
            recent_change_count: change_counts.get(&d.id).copied().unwrap_or(0),
            id: d.id,
            hostname: d.hostname,
            status: d.status,
            last_seen: d.last_seen,
            os: d.os,
            brand: d.brand,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, snapshot_from};

    #[tokio::test]
    async fn baseline_preserves_submission_order_as_slot_index() {
        let db = memory_db().await;
        let snapshot = snapshot_from(serde_json::json!({
            "hostname": "lab-01",
            "cpuModel": "Intel i5-10400",
            "ramDetails": [
                { "capacity": "8GB", "serialNumber": "R-A" },
                { "capacity": "16GB", "serialNumber": "R-B" }
            ],
            "storageDetails": [{ "model": "Samsung 970", "diskIndex": 4 }],
            "interfaces": [{ "name": "eth0", "isUp": true }]
        }));

        let device = create_baseline(&db, &snapshot, Utc::now()).await.unwrap();
        assert_eq!(device.status, DeviceStatus::Active);

        let stored = load_components(&db, device).await.unwrap();
        assert_eq!(stored.cpu.unwrap().model.as_deref(), Some("Intel i5-10400"));
        assert!(stored.gpu.is_none());
        let slots: Vec<(i32, Option<String>)> = stored
            .ram_modules
            .iter()
            .map(|r| (r.slot_index, r.capacity.clone()))
            .collect();
        assert_eq!(slots, vec![(0, Some("8GB".into())), (1, Some("16GB".into()))]);
        assert_eq!(stored.storage_disks[0].disk_index, 4);
        assert_eq!(stored.network_interfaces.len(), 1);
    }

    #[tokio::test]
    async fn colliding_resolved_slots_reject_the_baseline() {
        let db = memory_db().await;
        let snapshot = snapshot_from(serde_json::json!({
            "hostname": "lab-01",
            "ramDetails": [{ "slotIndex": 1 }, { "capacity": "8GB" }]
        }));
        let err = create_baseline(&db, &snapshot, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(find_device_by_hostname(&db, "lab-01").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn offline_device_is_promoted_on_contact_but_maintenance_sticks() {
        let db = memory_db().await;
        let snapshot = snapshot_from(serde_json::json!({ "hostname": "lab-01", "os": "Windows 11" }));
        let device = create_baseline(&db, &snapshot, Utc::now()).await.unwrap();

        let mut offline = device.clone().into_active_model();
        offline.status = Set(DeviceStatus::Offline);
        let offline = offline.update(&db).await.unwrap();
        let touched = record_contact(&db, offline, &snapshot, Utc::now()).await.unwrap();
        assert_eq!(touched.status, DeviceStatus::Active);

        let in_maintenance = set_device_status(&db, "lab-01", DeviceStatus::Maintenance)
            .await
            .unwrap();
        let touched = record_contact(&db, in_maintenance, &snapshot, Utc::now()).await.unwrap();
        assert_eq!(touched.status, DeviceStatus::Maintenance);
        assert_eq!(touched.os.as_deref(), Some("Windows 11"));
    }

    #[tokio::test]
    async fn offline_cannot_be_set_by_hand_and_unknown_hosts_are_not_found() {
        let db = memory_db().await;
        assert!(matches!(
            set_device_status(&db, "ghost", DeviceStatus::Offline).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            set_device_status(&db, "ghost", DeviceStatus::Maintenance).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn summaries_count_components_per_device() {
        let db = memory_db().await;
        let snapshot = snapshot_from(serde_json::json!({
            "hostname": "lab-02",
            "cpuModel": "Ryzen 5 5600",
            "ramDetails": [{ "capacity": "8GB" }, { "capacity": "8GB" }],
        }));
        let device = create_baseline(&db, &snapshot, Utc::now()).await.unwrap();
        let counts = HashMap::from([(device.id, 3_i64)]);

        let summaries = list_device_summaries(&db, &counts).await.unwrap();
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.cpu_model.as_deref(), Some("Ryzen 5 5600"));
        assert_eq!(summary.ram_module_count, 2);
        assert_eq!(summary.storage_disk_count, 0);
        assert_eq!(summary.recent_change_count, 3);
    }
}
