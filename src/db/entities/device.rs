use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::DeviceStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub hostname: String,
    pub status: DeviceStatus,
    pub last_seen: ChronoDateTimeUtc,
    pub os: Option<String>,
    pub brand: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::device_cpu::Entity")]
    Cpu,
    #[sea_orm(has_one = "super::device_gpu::Entity")]
    Gpu,
    #[sea_orm(has_one = "super::device_motherboard::Entity")]
    Motherboard,
    #[sea_orm(has_many = "super::device_ram_module::Entity")]
    RamModules,
    #[sea_orm(has_many = "super::device_storage_disk::Entity")]
    StorageDisks,
    #[sea_orm(has_many = "super::device_network_interface::Entity")]
    NetworkInterfaces,
    #[sea_orm(has_many = "super::change_record::Entity")]
    ChangeRecords,
}

impl Related<super::device_cpu::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cpu.def()
    }
}

impl Related<super::device_gpu::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gpu.def()
    }
}

impl Related<super::device_motherboard::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Motherboard.def()
    }
}

impl Related<super::device_ram_module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RamModules.def()
    }
}

impl Related<super::device_storage_disk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StorageDisks.def()
    }
}

impl Related<super::device_network_interface::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NetworkInterfaces.def()
    }
}

impl Related<super::change_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChangeRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
