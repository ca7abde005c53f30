//! SeaORM entities for the inventory store.
//!
//! A `device` row owns its baseline components and its open change records.
//! Component rows are written once, when the baseline is formed.

pub mod change_record;
pub mod device;
pub mod device_cpu;
pub mod device_gpu;
pub mod device_motherboard;
pub mod device_network_interface;
pub mod device_ram_module;
pub mod device_storage_disk;

pub mod prelude {
    pub use super::device::Entity as Device;
    pub use super::device::Column as DeviceColumn;

    pub use super::device_cpu::Entity as DeviceCpu;
    pub use super::device_gpu::Entity as DeviceGpu;
    pub use super::device_motherboard::Entity as DeviceMotherboard;
    pub use super::device_ram_module::Entity as DeviceRamModule;
    pub use super::device_storage_disk::Entity as DeviceStorageDisk;
    pub use super::device_network_interface::Entity as DeviceNetworkInterface;

    pub use super::change_record::Entity as ChangeRecord;
    pub use super::change_record::Model as ChangeRecordModel;
    pub use super::change_record::ActiveModel as ChangeRecordActiveModel;
    pub use super::change_record::Column as ChangeRecordColumn;
}
