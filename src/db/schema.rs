//! Idempotent schema bootstrap built from the entity definitions.

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::db::entities::{
    change_record, device, device_cpu, device_gpu, device_motherboard, device_network_interface,
    device_ram_module, device_storage_disk,
};

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

async fn create_index<C: ConnectionTrait>(db: &C, stmt: IndexCreateStatement) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Creates every table and unique index if missing. Parents first so the
/// foreign keys resolve.
pub async fn sync_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, device::Entity).await?;
    create_table(db, &schema, device_cpu::Entity).await?;
    create_table(db, &schema, device_gpu::Entity).await?;
    create_table(db, &schema, device_motherboard::Entity).await?;
    create_table(db, &schema, device_ram_module::Entity).await?;
    create_table(db, &schema, device_storage_disk::Entity).await?;
    create_table(db, &schema, device_network_interface::Entity).await?;
    create_table(db, &schema, change_record::Entity).await?;

    create_index(
        db,
        Index::create()
            .name("idx_device_ram_modules_device_slot")
            .table(device_ram_module::Entity)
            .col(device_ram_module::Column::DeviceId)
            .col(device_ram_module::Column::SlotIndex)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_device_storage_disks_device_disk")
            .table(device_storage_disk::Entity)
            .col(device_storage_disk::Column::DeviceId)
            .col(device_storage_disk::Column::DiskIndex)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;
    // Superseded by the per-severity key below.
    let backend = db.get_database_backend();
    let legacy = Index::drop()
        .name("idx_change_records_device_component")
        .table(change_record::Entity)
        .if_exists()
        .to_owned();
    db.execute(backend.build(&legacy)).await?;

    // One open record per family and severity.
    create_index(
        db,
        Index::create()
            .name("idx_change_records_device_component_severity")
            .table(change_record::Entity)
            .col(change_record::Column::DeviceId)
            .col(change_record::Column::ComponentType)
            .col(change_record::Column::Severity)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_change_records_created_at")
            .table(change_record::Entity)
            .col(change_record::Column::CreatedAt)
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    info!("Database schema is up to date.");
    Ok(())
}
