use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Service dispatch tracking
        manager
            .alter_table(
                Table::alter()
                    .table(FireExtinguishers::Table)
                    .add_column(
                        ColumnDef::new(FireExtinguishers::DispatchStatus)
                            .string()
                            .default("none")
                            .not_null(),
                    )
                    .add_column(ColumnDef::new(FireExtinguishers::DispatchDate).date_time())
                    .add_column(ColumnDef::new(FireExtinguishers::ReceivedDate).date_time())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_fire_extinguishers_dispatch_status")
                    .table(FireExtinguishers::Table)
                    .col(FireExtinguishers::DispatchStatus)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_fire_extinguishers_dispatch_status")
                    .table(FireExtinguishers::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(FireExtinguishers::Table)
                    .drop_column(FireExtinguishers::DispatchStatus)
                    .drop_column(FireExtinguishers::DispatchDate)
                    .drop_column(FireExtinguishers::ReceivedDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum FireExtinguishers {
    Table,
    DispatchStatus,
    DispatchDate,
    ReceivedDate,
}
