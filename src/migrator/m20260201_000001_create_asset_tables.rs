use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SmokeDetectors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SmokeDetectors::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SmokeDetectors::Name).string().not_null())
                    .col(ColumnDef::new(SmokeDetectors::Location).string().not_null())
                    .col(
                        ColumnDef::new(SmokeDetectors::BatteryLevel)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(SmokeDetectors::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(SmokeDetectors::LastTriggered).date_time())
                    .col(ColumnDef::new(SmokeDetectors::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(SmokeDetectors::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FireExtinguishers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FireExtinguishers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(FireExtinguishers::Name).string().not_null())
                    .col(ColumnDef::new(FireExtinguishers::Location).string().not_null())
                    .col(
                        ColumnDef::new(FireExtinguishers::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(FireExtinguishers::LastRefill).date_time().not_null())
                    .col(ColumnDef::new(FireExtinguishers::NextRefillDue).date_time().not_null())
                    .col(
                        ColumnDef::new(FireExtinguishers::LastPressureTest)
                            .date_time()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FireExtinguishers::NextPressureTestDue)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FireExtinguishers::LastTriggered).date_time())
                    .col(ColumnDef::new(FireExtinguishers::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(FireExtinguishers::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MaintenanceItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MaintenanceItems::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(MaintenanceItems::Name).string().not_null())
                    .col(
                        ColumnDef::new(MaintenanceItems::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(MaintenanceItems::Priority)
                            .string()
                            .not_null()
                            .default("medium"),
                    )
                    .col(ColumnDef::new(MaintenanceItems::AssignedTo).string())
                    .col(
                        ColumnDef::new(MaintenanceItems::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(MaintenanceItems::DueDate).date_time())
                    .col(ColumnDef::new(MaintenanceItems::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(MaintenanceItems::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MaintenanceNotes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MaintenanceNotes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(MaintenanceNotes::ItemId).uuid().not_null())
                    .col(ColumnDef::new(MaintenanceNotes::Text).text().not_null())
                    .col(ColumnDef::new(MaintenanceNotes::CreatedBy).string().not_null())
                    .col(ColumnDef::new(MaintenanceNotes::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_maintenance_notes_item_id")
                            .from(MaintenanceNotes::Table, MaintenanceNotes::ItemId)
                            .to(MaintenanceItems::Table, MaintenanceItems::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // No foreign key on source_id: alerts outlive their asset.
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Alerts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alerts::SourceKind).string().not_null())
                    .col(ColumnDef::new(Alerts::SourceId).uuid().not_null())
                    .col(ColumnDef::new(Alerts::Location).string().not_null())
                    .col(ColumnDef::new(Alerts::Message).text().not_null())
                    .col(ColumnDef::new(Alerts::RaisedAt).date_time().not_null())
                    .col(
                        ColumnDef::new(Alerts::Acknowledged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Alerts::AcknowledgedAt).date_time())
                    .col(ColumnDef::new(Alerts::AcknowledgedBy).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_alerts_raised_at")
                    .table(Alerts::Table)
                    .col(Alerts::RaisedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_maintenance_notes_item_id")
                    .table(MaintenanceNotes::Table)
                    .col(MaintenanceNotes::ItemId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MaintenanceNotes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MaintenanceItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FireExtinguishers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SmokeDetectors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SmokeDetectors {
    Table,
    Id,
    Name,
    Location,
    BatteryLevel,
    Status,
    LastTriggered,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FireExtinguishers {
    Table,
    Id,
    Name,
    Location,
    Status,
    LastRefill,
    NextRefillDue,
    LastPressureTest,
    NextPressureTestDue,
    LastTriggered,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MaintenanceItems {
    Table,
    Id,
    Name,
    Description,
    Priority,
    AssignedTo,
    Status,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MaintenanceNotes {
    Table,
    Id,
    ItemId,
    Text,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    SourceKind,
    SourceId,
    Location,
    Message,
    RaisedAt,
    Acknowledged,
    AcknowledgedAt,
    AcknowledgedBy,
}
