use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::entities::{
    change_record, device_cpu, device_gpu, device_motherboard, device_network_interface,
    device_ram_module, device_storage_disk,
};
use crate::db::enums::{ChangeType, ComponentType, DeviceStatus, Severity};
use crate::db::models::{DeviceSummary, DeviceWithComponents, IngestOutcome};

// --- Component DTOs ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuResponse {
    pub model: Option<String>,
    pub cores: Option<i32>,
    pub clock: Option<String>,
}

impl From<device_cpu::Model> for CpuResponse {
    fn from(m: device_cpu::Model) -> Self {
        Self { model: m.model, cores: m.cores, clock: m.clock }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuResponse {
    pub model: Option<String>,
}

impl From<device_gpu::Model> for GpuResponse {
    fn from(m: device_gpu::Model) -> Self {
        Self { model: m.model }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotherboardResponse {
    pub model: Option<String>,
    pub serial_number: Option<String>,
}

impl From<device_motherboard::Model> for MotherboardResponse {
    fn from(m: device_motherboard::Model) -> Self {
        Self { model: m.model, serial_number: m.serial_number }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RamModuleResponse {
    pub slot_index: i32,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<String>,
    pub speed: Option<String>,
    #[serde(rename = "type")]
    pub memory_type: Option<String>,
    pub form_factor: Option<String>,
    pub serial_number: Option<String>,
    pub bank: Option<String>,
}

impl From<device_ram_module::Model> for RamModuleResponse {
    fn from(m: device_ram_module::Model) -> Self {
        Self {
            slot_index: m.slot_index,
            manufacturer: m.manufacturer,
            model: m.model,
            capacity: m.capacity,
            speed: m.speed,
            memory_type: m.memory_type,
            form_factor: m.form_factor,
            serial_number: m.serial_number,
            bank: m.bank,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDiskResponse {
    pub disk_index: i32,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub size: Option<String>,
    pub interface: Option<String>,
    #[serde(rename = "type")]
    pub disk_type: Option<String>,
    pub serial_number: Option<String>,
}

impl From<device_storage_disk::Model> for StorageDiskResponse {
    fn from(m: device_storage_disk::Model) -> Self {
        Self {
            disk_index: m.disk_index,
            manufacturer: m.manufacturer,
            model: m.model,
            size: m.size,
            interface: m.interface,
            disk_type: m.disk_type,
            serial_number: m.serial_number,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceResponse {
    pub name: String,
    pub mac_addr: Option<String>,
    pub ipv4: Option<String>,
    pub is_up: bool,
    pub bandwidth: Option<String>,
}

impl From<device_network_interface::Model> for NetworkInterfaceResponse {
    fn from(m: device_network_interface::Model) -> Self {
        Self {
            name: m.name,
            mac_addr: m.mac_addr,
            ipv4: m.ipv4,
            is_up: m.is_up,
            bandwidth: m.bandwidth,
        }
    }
}

// --- Device DTOs ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetailResponse {
    pub id: i32,
    pub hostname: String,
    pub status: DeviceStatus,
    pub last_seen: DateTime<Utc>,
    pub os: Option<String>,
    pub brand: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cpu: Option<CpuResponse>,
    pub gpu: Option<GpuResponse>,
    pub motherboard: Option<MotherboardResponse>,
    pub ram_modules: Vec<RamModuleResponse>,
    pub storage_disks: Vec<StorageDiskResponse>,
    pub network_interfaces: Vec<NetworkInterfaceResponse>,
}

impl From<DeviceWithComponents> for DeviceDetailResponse {
    fn from(d: DeviceWithComponents) -> Self {
        Self {
            id: d.device.id,
            hostname: d.device.hostname,
            status: d.device.status,
            last_seen: d.device.last_seen,
            os: d.device.os,
            brand: d.device.brand,
            created_at: d.device.created_at,
            updated_at: d.device.updated_at,
            cpu: d.cpu.map(Into::into),
            gpu: d.gpu.map(Into::into),
            motherboard: d.motherboard.map(Into::into),
            ram_modules: d.ram_modules.into_iter().map(Into::into).collect(),
            storage_disks: d.storage_disks.into_iter().map(Into::into).collect(),
            network_interfaces: d.network_interfaces.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListItemResponse {
    pub id: i32,
    pub hostname: String,
    pub status: DeviceStatus,
    pub last_seen: DateTime<Utc>,
    pub os: Option<String>,
    pub brand: Option<String>,
    pub cpu_model: Option<String>,
    pub gpu_model: Option<String>,
    pub motherboard_model: Option<String>,
    pub ram_module_count: i64,
    pub storage_disk_count: i64,
    pub recent_change_count: i64,
}

impl From<DeviceSummary> for DeviceListItemResponse {
    fn from(s: DeviceSummary) -> Self {
        Self {
            id: s.id,
            hostname: s.hostname,
            status: s.status,
            last_seen: s.last_seen,
            os: s.os,
            brand: s.brand,
            cpu_model: s.cpu_model,
            gpu_model: s.gpu_model,
            motherboard_model: s.motherboard_model,
            ram_module_count: s.ram_module_count,
            storage_disk_count: s.storage_disk_count,
            recent_change_count: s.recent_change_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecordResponse {
    pub id: i32,
    pub component_type: ComponentType,
    pub change_type: ChangeType,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl From<change_record::Model> for ChangeRecordResponse {
    fn from(m: change_record::Model) -> Self {
        Self {
            id: m.id,
            component_type: m.component_type,
            change_type: m.change_type,
            old_value: m.old_value,
            new_value: m.new_value,
            message: m.message,
            severity: m.severity,
            created_at: m.created_at,
        }
    }
}

/// Device detail plus its open change records.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceWithChangesResponse {
    #[serde(flatten)]
    pub device: DeviceDetailResponse,
    pub open_changes: Vec<ChangeRecordResponse>,
}

// --- Ingest ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub created: bool,
    pub changes_detected: usize,
    pub device: DeviceDetailResponse,
    pub recent_changes: Vec<ChangeRecordResponse>,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(o: IngestOutcome) -> Self {
        Self {
            created: o.created,
            changes_detected: o.changes_detected,
            device: o.device.into(),
            recent_changes: o.recent_changes.into_iter().map(Into::into).collect(),
        }
    }
}

// --- Requests ---

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: DeviceStatus,
}

#[derive(Debug, Deserialize)]
pub struct ChangeHistoryQuery {
    pub limit: Option<u64>,
}
