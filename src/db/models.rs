use chrono::{DateTime, Utc};

use crate::db::entities::{
    change_record, device, device_cpu, device_gpu, device_motherboard, device_network_interface,
    device_ram_module, device_storage_disk,
};
use crate::db::enums::DeviceStatus;

/// A device together with its whole baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceWithComponents {
    pub device: device::Model,
    pub cpu: Option<device_cpu::Model>,
    pub gpu: Option<device_gpu::Model>,
    pub motherboard: Option<device_motherboard::Model>,
    pub ram_modules: Vec<device_ram_module::Model>,
    pub storage_disks: Vec<device_storage_disk::Model>,
    pub network_interfaces: Vec<device_network_interface::Model>,
}

/// Row of the device listing.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSummary {
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
    /// Change records created inside the rolling window.
    pub recent_change_count: i64,
}

/// Result of one ingestion pass.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// `true` when this request formed the baseline.
    pub created: bool,
    pub changes_detected: usize,
    pub device: DeviceWithComponents,
    pub recent_changes: Vec<change_record::Model>,
}
