use sea_orm_migration::prelude::*;

mod m20260201_000001_create_asset_tables;
mod m20260205_000001_add_dispatch_columns;
mod m20260210_000001_add_maintenance_status_set_at;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260201_000001_create_asset_tables::Migration),
            Box::new(m20260205_000001_add_dispatch_columns::Migration),
            Box::new(m20260210_000001_add_maintenance_status_set_at::Migration),
        ]
    }
}
