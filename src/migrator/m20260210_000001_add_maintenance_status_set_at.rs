use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Moment of the last explicit status change, for overdue derivation
        manager
            .alter_table(
                Table::alter()
                    .table(MaintenanceItems::Table)
                    .add_column(ColumnDef::new(MaintenanceItems::StatusSetAt).date_time())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(MaintenanceItems::Table)
                    .drop_column(MaintenanceItems::StatusSetAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum MaintenanceItems {
    Table,
    StatusSetAt,
}
