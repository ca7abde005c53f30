//! Wire schema for agent snapshots and its validated, typed form.
//!
//! Agents post a flat JSON body. [`IngestRequest`] mirrors it field for field;
//! [`InventorySnapshot::try_from`] trims every value, drops empty strings and
//! groups the scalars into per-family specs so the rest of the crate never sees
//! a half-filled family.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::warn;

pub const MAX_HOSTNAME_LEN: usize = 255;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("hostname is required")]
    MissingHostname,
    #[error("hostname exceeds {MAX_HOSTNAME_LEN} characters")]
    HostnameTooLong,
    #[error("{family} index must not be negative (got {index})")]
    NegativeIndex { family: &'static str, index: i32 },
    #[error("{family} index {index} is listed more than once")]
    DuplicateIndex { family: &'static str, index: i32 },
}

/// Accepts a JSON string or number and keeps it as text. Agents disagree on
/// whether capacities and clocks are numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Int(n)) => Some(n.to_string()),
        Some(Raw::Float(f)) => Some(f.to_string()),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub cpu_model: Option<String>,
    #[serde(default)]
    pub cpu_cores: Option<i32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cpu_clock: Option<String>,
    #[serde(default)]
    pub gpu_model: Option<String>,
    #[serde(default)]
    pub motherboard_model: Option<String>,
    #[serde(default)]
    pub motherboard_serial: Option<String>,
    #[serde(default)]
    pub ram_details: Option<Vec<RamDetail>>,
    #[serde(default)]
    pub storage_details: Option<Vec<StorageDetail>>,
    #[serde(default)]
    pub interfaces: Option<Vec<InterfaceDetail>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RamDetail {
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub capacity: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub speed: Option<String>,
    #[serde(default, rename = "type")]
    pub memory_type: Option<String>,
    #[serde(default)]
    pub form_factor: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub slot_index: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDetail {
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub size: Option<String>,
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default, rename = "type")]
    pub disk_type: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub disk_index: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mac_addr: Option<String>,
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub is_up: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bandwidth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuSpec {
    pub model: Option<String>,
    pub cores: Option<i32>,
    pub clock: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GpuSpec {
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MotherboardSpec {
    pub model: Option<String>,
    pub serial_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RamModuleSpec {
    /// `None` when the agent did not report a slot; matching then falls back
    /// to the entry's position in the submitted list.
    pub slot_index: Option<i32>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<String>,
    pub speed: Option<String>,
    pub memory_type: Option<String>,
    pub form_factor: Option<String>,
    pub serial_number: Option<String>,
    pub bank: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageDiskSpec {
    pub disk_index: Option<i32>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub size: Option<String>,
    pub interface: Option<String>,
    pub disk_type: Option<String>,
    pub serial_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkInterfaceSpec {
    pub name: String,
    pub mac_addr: Option<String>,
    pub ipv4: Option<String>,
    pub is_up: bool,
    pub bandwidth: Option<String>,
}

/// A validated hardware snapshot for one hostname.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InventorySnapshot {
    pub hostname: String,
    pub os: Option<String>,
    pub brand: Option<String>,
    pub cpu: Option<CpuSpec>,
    pub gpu: Option<GpuSpec>,
    pub motherboard: Option<MotherboardSpec>,
    pub ram: Vec<RamModuleSpec>,
    pub storage: Vec<StorageDiskSpec>,
    pub interfaces: Vec<NetworkInterfaceSpec>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_indices<I>(family: &'static str, indices: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = i32>,
{
    let mut seen = HashSet::new();
    for index in indices {
        if index < 0 {
            return Err(ValidationError::NegativeIndex { family, index });
        }
        if !seen.insert(index) {
            return Err(ValidationError::DuplicateIndex { family, index });
        }
    }
    Ok(())
}

impl TryFrom<IngestRequest> for InventorySnapshot {
    type Error = ValidationError;

    fn try_from(req: IngestRequest) -> Result<Self, Self::Error> {
        let hostname = clean(req.hostname).ok_or(ValidationError::MissingHostname)?;
        if hostname.chars().count() > MAX_HOSTNAME_LEN {
            return Err(ValidationError::HostnameTooLong);
        }

        let cpu = CpuSpec {
            model: clean(req.cpu_model),
            cores: req.cpu_cores,
            clock: clean(req.cpu_clock),
        };
        let cpu = (cpu != CpuSpec::default()).then_some(cpu);

        let gpu = clean(req.gpu_model).map(|model| GpuSpec { model: Some(model) });

        let motherboard = MotherboardSpec {
            model: clean(req.motherboard_model),
            serial_number: clean(req.motherboard_serial),
        };
        let motherboard = (motherboard != MotherboardSpec::default()).then_some(motherboard);

        let ram: Vec<RamModuleSpec> = req
            .ram_details
            .unwrap_or_default()
            .into_iter()
            .map(|r| RamModuleSpec {
                slot_index: r.slot_index,
                manufacturer: clean(r.manufacturer),
                model: clean(r.model),
                capacity: clean(r.capacity),
                speed: clean(r.speed),
                memory_type: clean(r.memory_type),
                form_factor: clean(r.form_factor),
                serial_number: clean(r.serial_number),
                bank: clean(r.bank),
            })
            .collect();
        check_indices("RAM slot", ram.iter().filter_map(|r| r.slot_index))?;

        let storage: Vec<StorageDiskSpec> = req
            .storage_details
            .unwrap_or_default()
            .into_iter()
            .map(|d| StorageDiskSpec {
                disk_index: d.disk_index,
                manufacturer: clean(d.manufacturer),
                model: clean(d.model),
                size: clean(d.size),
                interface: clean(d.interface),
                disk_type: clean(d.disk_type),
                serial_number: clean(d.serial_number),
            })
            .collect();
        check_indices("storage disk", storage.iter().filter_map(|d| d.disk_index))?;

        // Interfaces are informational only, so a nameless one is dropped
        // instead of failing the whole snapshot.
        let interfaces = req
            .interfaces
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(position, i)| {
                let Some(name) = clean(i.name) else {
                    warn!(hostname = %hostname, position, "Dropping network interface without a name.");
                    return None;
                };
                Some(NetworkInterfaceSpec {
                    name,
                    mac_addr: clean(i.mac_addr),
                    ipv4: clean(i.ipv4),
                    is_up: i.is_up.unwrap_or(false),
                    bandwidth: clean(i.bandwidth),
                })
            })
            .collect();

        Ok(InventorySnapshot {
            hostname,
            os: clean(req.os),
            brand: clean(req.brand),
            cpu,
            gpu,
            motherboard,
            ram,
            storage,
            interfaces,
        })
    }
}

impl InventorySnapshot {
    /// Slot index each RAM entry is stored under when this snapshot becomes a
    /// baseline: the explicit index if given, otherwise its list position.
    pub fn resolved_ram_slots(&self) -> Result<Vec<(i32, &RamModuleSpec)>, ValidationError> {
        let resolved: Vec<(i32, &RamModuleSpec)> = self
            .ram
            .iter()
            .enumerate()
            .map(|(position, r)| (r.slot_index.unwrap_or(position as i32), r))
            .collect();
        check_indices("RAM slot", resolved.iter().map(|(i, _)| *i))?;
        Ok(resolved)
    }

    pub fn resolved_storage_disks(&self) -> Result<Vec<(i32, &StorageDiskSpec)>, ValidationError> {
        let resolved: Vec<(i32, &StorageDiskSpec)> = self
            .storage
            .iter()
            .enumerate()
            .map(|(position, d)| (d.disk_index.unwrap_or(position as i32), d))
            .collect();
        check_indices("storage disk", resolved.iter().map(|(i, _)| *i))?;
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: serde_json::Value) -> Result<InventorySnapshot, ValidationError> {
        let req: IngestRequest = serde_json::from_value(body).expect("request should deserialize");
        InventorySnapshot::try_from(req)
    }

    #[test]
    fn missing_or_blank_hostname_is_rejected() {
        assert_eq!(parse(serde_json::json!({})), Err(ValidationError::MissingHostname));
        assert_eq!(
            parse(serde_json::json!({ "hostname": "   " })),
            Err(ValidationError::MissingHostname)
        );
    }

    #[test]
    fn families_are_grouped_and_trimmed() {
        let snapshot = parse(serde_json::json!({
            "hostname": " lab-01 ",
            "cpuModel": "Intel i5-10400 ",
            "cpuCores": 6,
            "cpuClock": 2.9,
            "motherboardSerial": "MB-1",
            "gpuModel": "",
            "ramDetails": [{ "capacity": 8, "serialNumber": "R1", "type": "DDR4" }],
        }))
        .unwrap();

        assert_eq!(snapshot.hostname, "lab-01");
        let cpu = snapshot.cpu.unwrap();
        assert_eq!(cpu.model.as_deref(), Some("Intel i5-10400"));
        assert_eq!(cpu.cores, Some(6));
        assert_eq!(cpu.clock.as_deref(), Some("2.9"));
        assert!(snapshot.gpu.is_none());
        assert_eq!(
            snapshot.motherboard,
            Some(MotherboardSpec { model: None, serial_number: Some("MB-1".into()) })
        );
        assert_eq!(snapshot.ram[0].capacity.as_deref(), Some("8"));
        assert_eq!(snapshot.ram[0].memory_type.as_deref(), Some("DDR4"));
        assert!(snapshot.storage.is_empty());
    }

    #[test]
    fn duplicate_explicit_slot_is_rejected() {
        let err = parse(serde_json::json!({
            "hostname": "lab-01",
            "ramDetails": [{ "slotIndex": 1 }, { "slotIndex": 1 }],
        }))
        .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateIndex { family: "RAM slot", index: 1 });
    }

    #[test]
    fn negative_disk_index_is_rejected() {
        let err = parse(serde_json::json!({
            "hostname": "lab-01",
            "storageDetails": [{ "diskIndex": -1 }],
        }))
        .unwrap_err();
        assert_eq!(err, ValidationError::NegativeIndex { family: "storage disk", index: -1 });
    }

    #[test]
    fn nameless_interface_is_dropped_not_rejected() {
        let snapshot = parse(serde_json::json!({
            "hostname": "lab-01",
            "cpuModel": "i5",
            "interfaces": [{ "name": "eth0", "isUp": true }, { "macAddr": "aa:bb", "isUp": true }],
        }))
        .unwrap();
        assert_eq!(snapshot.interfaces.len(), 1);
        assert_eq!(snapshot.interfaces[0].name, "eth0");
        assert_eq!(snapshot.cpu.unwrap().model.as_deref(), Some("i5"));
    }

    #[test]
    fn overlong_hostname_is_rejected() {
        let hostname = "h".repeat(MAX_HOSTNAME_LEN + 1);
        assert_eq!(
            parse(serde_json::json!({ "hostname": hostname })),
            Err(ValidationError::HostnameTooLong)
        );
    }

    #[test]
    fn resolved_slots_fall_back_to_position() {
        let snapshot = parse(serde_json::json!({
            "hostname": "lab-01",
            "ramDetails": [{ "capacity": "8GB" }, { "slotIndex": 3, "capacity": "16GB" }],
        }))
        .unwrap();
        let slots: Vec<i32> = snapshot.resolved_ram_slots().unwrap().iter().map(|(i, _)| *i).collect();
        assert_eq!(slots, vec![0, 3]);
    }

    #[test]
    fn resolved_slots_detect_collision_between_explicit_and_positional() {
        let snapshot = parse(serde_json::json!({
            "hostname": "lab-01",
            "ramDetails": [{ "slotIndex": 1 }, { "capacity": "8GB" }],
        }))
        .unwrap();
        assert_eq!(
            snapshot.resolved_ram_slots().unwrap_err(),
            ValidationError::DuplicateIndex { family: "RAM slot", index: 1 }
        );
    }
}
