use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "device_status_enum")]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    #[sea_orm(string_value = "offline")]
    Offline,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceStatus::Active => "active",
            DeviceStatus::Maintenance => "maintenance",
            DeviceStatus::Offline => "offline",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "change_severity_enum")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "critical")]
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

/// Hardware family a change record is tracked under. One open record per
/// device and family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "component_type_enum")]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    #[sea_orm(string_value = "cpu")]
    Cpu,
    #[sea_orm(string_value = "gpu")]
    Gpu,
    #[sea_orm(string_value = "motherboard")]
    Motherboard,
    #[sea_orm(string_value = "ram")]
    Ram,
    #[sea_orm(string_value = "storage")]
    Storage,
}

impl ComponentType {
    /// Label used in human-readable change messages.
    pub fn label(&self) -> &'static str {
        match self {
            ComponentType::Cpu => "CPU",
            ComponentType::Gpu => "GPU",
            ComponentType::Motherboard => "Motherboard",
            ComponentType::Ram => "RAM",
            ComponentType::Storage => "Storage",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "change_type_enum")]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    #[sea_orm(string_value = "mismatch")]
    Mismatch,
    #[sea_orm(string_value = "replaced")]
    Replaced,
    #[sea_orm(string_value = "serial_changed")]
    SerialChanged,
    #[sea_orm(string_value = "model_changed")]
    ModelChanged,
    #[sea_orm(string_value = "modified")]
    Modified,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}
