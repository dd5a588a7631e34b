use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use uuid::Uuid;

use super::{Dataset, Mutation, Repository, StorageError};
use crate::engine::alerts::Alert;
use crate::engine::detector::SmokeDetector;
use crate::engine::extinguisher::FireExtinguisher;
use crate::engine::maintenance::{MaintenanceItem, MaintenanceNote};
use crate::entities::{alert, fire_extinguisher, maintenance_item, maintenance_note, smoke_detector};

/// Postgres-backed repository. Timestamps are stored as naive UTC.
#[derive(Clone)]
pub struct SeaOrmRepository {
    db: DatabaseConnection,
}

impl SeaOrmRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for SeaOrmRepository {
    async fn load(&self) -> Result<Dataset, StorageError> {
        let detectors = smoke_detector::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(detector_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let extinguishers = fire_extinguisher::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(extinguisher_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let mut notes: HashMap<Uuid, Vec<MaintenanceNote>> = HashMap::new();
        for row in maintenance_note::Entity::find()
            .order_by_asc(maintenance_note::Column::CreatedAt)
            .all(&self.db)
            .await?
        {
            notes.entry(row.item_id).or_default().push(MaintenanceNote {
                id: row.id,
                text: row.text,
                created_at: utc(row.created_at),
                created_by: row.created_by,
            });
        }

        let maintenance_items = maintenance_item::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| {
                let item_notes = notes.remove(&row.id).unwrap_or_default();
                maintenance_from_row(row, item_notes)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let alerts = alert::Entity::find()
            .order_by_asc(alert::Column::RaisedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(alert_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        if !notes.is_empty() {
            tracing::warn!(orphaned = notes.len(), "Skipping notes with no maintenance item");
        }

        Ok(Dataset {
            detectors,
            extinguishers,
            maintenance_items,
            alerts,
        })
    }

    async fn apply(&self, mutations: &[Mutation]) -> Result<(), StorageError> {
        let txn = self.db.begin().await?;
        for mutation in mutations {
            write(&txn, mutation).await?;
        }
        txn.commit().await?;
        Ok(())
    }
}

async fn write<C: ConnectionTrait>(conn: &C, mutation: &Mutation) -> Result<(), DbErr> {
    match mutation {
        Mutation::UpsertDetector(d) => {
            use smoke_detector::Column;
            smoke_detector::Entity::insert(detector_row(d))
                .on_conflict(
                    OnConflict::column(Column::Id)
                        .update_columns([
                            Column::Name,
                            Column::Location,
                            Column::BatteryLevel,
                            Column::Status,
                            Column::LastTriggered,
                            Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec(conn)
                .await?;
        }
        Mutation::DeleteDetector(id) => {
            smoke_detector::Entity::delete_by_id(*id).exec(conn).await?;
        }
        Mutation::UpsertExtinguisher(e) => {
            use fire_extinguisher::Column;
            fire_extinguisher::Entity::insert(extinguisher_row(e))
                .on_conflict(
                    OnConflict::column(Column::Id)
                        .update_columns([
                            Column::Name,
                            Column::Location,
                            Column::Status,
                            Column::LastRefill,
                            Column::NextRefillDue,
                            Column::LastPressureTest,
                            Column::NextPressureTestDue,
                            Column::LastTriggered,
                            Column::DispatchStatus,
                            Column::DispatchDate,
                            Column::ReceivedDate,
                            Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec(conn)
                .await?;
        }
        Mutation::DeleteExtinguisher(id) => {
            fire_extinguisher::Entity::delete_by_id(*id).exec(conn).await?;
        }
        Mutation::UpsertMaintenance(item) => {
            use maintenance_item::Column;
            maintenance_item::Entity::insert(maintenance_row(item))
                .on_conflict(
                    OnConflict::column(Column::Id)
                        .update_columns([
                            Column::Name,
                            Column::Description,
                            Column::Priority,
                            Column::AssignedTo,
                            Column::Status,
                            Column::DueDate,
                            Column::StatusSetAt,
                            Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec(conn)
                .await?;
        }
        Mutation::AppendNote { item_id, note } => {
            let row = maintenance_note::ActiveModel {
                id: Set(note.id),
                item_id: Set(*item_id),
                text: Set(note.text.clone()),
                created_by: Set(note.created_by.clone()),
                created_at: Set(naive(note.created_at)),
            };
            maintenance_note::Entity::insert(row).exec(conn).await?;
        }
        Mutation::DeleteMaintenance(id) => {
            maintenance_note::Entity::delete_many()
                .filter(maintenance_note::Column::ItemId.eq(*id))
                .exec(conn)
                .await?;
            maintenance_item::Entity::delete_by_id(*id).exec(conn).await?;
        }
        Mutation::UpsertAlert(a) => {
            use alert::Column;
            alert::Entity::insert(alert_row(a))
                .on_conflict(
                    OnConflict::column(Column::Id)
                        .update_columns([
                            Column::Acknowledged,
                            Column::AcknowledgedAt,
                            Column::AcknowledgedBy,
                        ])
                        .to_owned(),
                )
                .exec(conn)
                .await?;
        }
    }
    Ok(())
}

fn naive(at: DateTime<Utc>) -> NaiveDateTime {
    at.naive_utc()
}

fn utc(at: NaiveDateTime) -> DateTime<Utc> {
    at.and_utc()
}

fn parse<T: FromStr>(table: &'static str, id: Uuid, value: &str) -> Result<T, StorageError> {
    value.parse().map_err(|_| StorageError::Corrupt {
        table,
        id,
        detail: format!("unrecognised value {value:?}"),
    })
}

fn detector_row(d: &SmokeDetector) -> smoke_detector::ActiveModel {
    smoke_detector::ActiveModel {
        id: Set(d.id),
        name: Set(d.name.clone()),
        location: Set(d.location.clone()),
        battery_level: Set(d.battery_level),
        status: Set(d.stored_status.to_string()),
        last_triggered: Set(d.last_triggered.map(naive)),
        created_at: Set(naive(d.created_at)),
        updated_at: Set(naive(d.updated_at)),
    }
}

fn detector_from_row(row: smoke_detector::Model) -> Result<SmokeDetector, StorageError> {
    Ok(SmokeDetector {
        stored_status: parse("smoke_detectors", row.id, &row.status)?,
        id: row.id,
        name: row.name,
        location: row.location,
        battery_level: row.battery_level,
        last_triggered: row.last_triggered.map(utc),
        created_at: utc(row.created_at),
        updated_at: utc(row.updated_at),
    })
}

fn extinguisher_row(e: &FireExtinguisher) -> fire_extinguisher::ActiveModel {
    fire_extinguisher::ActiveModel {
        id: Set(e.id),
        name: Set(e.name.clone()),
        location: Set(e.location.clone()),
        status: Set(e.stored_status.to_string()),
        last_refill: Set(naive(e.last_refill)),
        next_refill_due: Set(naive(e.next_refill_due)),
        last_pressure_test: Set(naive(e.last_pressure_test)),
        next_pressure_test_due: Set(naive(e.next_pressure_test_due)),
        last_triggered: Set(e.last_triggered.map(naive)),
        dispatch_status: Set(e.dispatch_status.to_string()),
        dispatch_date: Set(e.dispatch_date.map(naive)),
        received_date: Set(e.received_date.map(naive)),
        created_at: Set(naive(e.created_at)),
        updated_at: Set(naive(e.updated_at)),
    }
}

fn extinguisher_from_row(row: fire_extinguisher::Model) -> Result<FireExtinguisher, StorageError> {
    const TABLE: &str = "fire_extinguishers";
    Ok(FireExtinguisher {
        stored_status: parse(TABLE, row.id, &row.status)?,
        dispatch_status: parse(TABLE, row.id, &row.dispatch_status)?,
        id: row.id,
        name: row.name,
        location: row.location,
        last_refill: utc(row.last_refill),
        next_refill_due: utc(row.next_refill_due),
        last_pressure_test: utc(row.last_pressure_test),
        next_pressure_test_due: utc(row.next_pressure_test_due),
        last_triggered: row.last_triggered.map(utc),
        dispatch_date: row.dispatch_date.map(utc),
        received_date: row.received_date.map(utc),
        created_at: utc(row.created_at),
        updated_at: utc(row.updated_at),
    })
}

fn maintenance_row(item: &MaintenanceItem) -> maintenance_item::ActiveModel {
    maintenance_item::ActiveModel {
        id: Set(item.id),
        name: Set(item.name.clone()),
        description: Set(item.description.clone()),
        priority: Set(item.priority.to_string()),
        assigned_to: Set(item.assigned_to.clone()),
        status: Set(item.status.to_string()),
        due_date: Set(item.due_date.map(naive)),
        status_set_at: Set(item.status_set_at.map(naive)),
        created_at: Set(naive(item.created_at)),
        updated_at: Set(naive(item.updated_at)),
    }
}

fn maintenance_from_row(
    row: maintenance_item::Model,
    notes: Vec<MaintenanceNote>,
) -> Result<MaintenanceItem, StorageError> {
    const TABLE: &str = "maintenance_items";
    Ok(MaintenanceItem {
        priority: parse(TABLE, row.id, &row.priority)?,
        status: parse(TABLE, row.id, &row.status)?,
        id: row.id,
        name: row.name,
        description: row.description,
        assigned_to: row.assigned_to,
        due_date: row.due_date.map(utc),
        status_set_at: row.status_set_at.map(utc),
        notes,
        created_at: utc(row.created_at),
        updated_at: utc(row.updated_at),
    })
}

fn alert_row(a: &Alert) -> alert::ActiveModel {
    alert::ActiveModel {
        id: Set(a.id),
        source_kind: Set(a.source_kind.to_string()),
        source_id: Set(a.source_id),
        location: Set(a.location.clone()),
        message: Set(a.message.clone()),
        raised_at: Set(naive(a.timestamp)),
        acknowledged: Set(a.acknowledged),
        acknowledged_at: Set(a.acknowledged_at.map(naive)),
        acknowledged_by: Set(a.acknowledged_by.clone()),
    }
}

fn alert_from_row(row: alert::Model) -> Result<Alert, StorageError> {
    Ok(Alert {
        source_kind: parse("alerts", row.id, &row.source_kind)?,
        id: row.id,
        source_id: row.source_id,
        location: row.location,
        message: row.message,
        timestamp: utc(row.raised_at),
        acknowledged: row.acknowledged,
        acknowledged_at: row.acknowledged_at.map(utc),
        acknowledged_by: row.acknowledged_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::detector::DetectorStatus;
    use crate::engine::extinguisher::{DispatchStatus, ExtinguisherStatus};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn detector_row_keeps_snake_case_status() {
        let d = SmokeDetector {
            id: Uuid::new_v4(),
            name: "SD-1".into(),
            location: "Lobby".into(),
            battery_level: 80,
            stored_status: DetectorStatus::Triggered,
            last_triggered: Some(at()),
            created_at: at(),
            updated_at: at(),
        };
        let row = detector_row(&d);
        assert_eq!(row.status.as_ref(), "triggered");
    }

    #[test]
    fn extinguisher_model_converts_back() {
        let id = Uuid::new_v4();
        let row = fire_extinguisher::Model {
            id,
            name: "EXT-1".into(),
            location: "Kitchen".into(),
            status: "refill_due".into(),
            last_refill: at().naive_utc(),
            next_refill_due: at().naive_utc(),
            last_pressure_test: at().naive_utc(),
            next_pressure_test_due: at().naive_utc(),
            last_triggered: None,
            dispatch_status: "under_process".into(),
            dispatch_date: Some(at().naive_utc()),
            received_date: None,
            created_at: at().naive_utc(),
            updated_at: at().naive_utc(),
        };
        let e = extinguisher_from_row(row).unwrap();
        assert_eq!(e.stored_status, ExtinguisherStatus::RefillDue);
        assert_eq!(e.dispatch_status, DispatchStatus::UnderProcess);
        assert_eq!(e.dispatch_date, Some(at()));
    }

    #[test]
    fn unknown_status_is_reported_as_corrupt() {
        let id = Uuid::new_v4();
        let row = smoke_detector::Model {
            id,
            name: "SD-1".into(),
            location: "Lobby".into(),
            battery_level: 80,
            status: "melted".into(),
            last_triggered: None,
            created_at: at().naive_utc(),
            updated_at: at().naive_utc(),
        };
        match detector_from_row(row) {
            Err(StorageError::Corrupt { table, id: bad, .. }) => {
                assert_eq!(table, "smoke_detectors");
                assert_eq!(bad, id);
            }
            other => panic!("expected corrupt row, got {other:?}"),
        }
    }

    #[test]
    fn maintenance_row_keeps_status_set_at() {
        use crate::engine::maintenance::{MaintenanceStatus, Priority};

        let item = MaintenanceItem {
            id: Uuid::new_v4(),
            name: "Check hydrant".into(),
            description: String::new(),
            priority: Priority::High,
            assigned_to: None,
            status: MaintenanceStatus::InProgress,
            due_date: Some(at()),
            status_set_at: Some(at()),
            notes: Vec::new(),
            created_at: at(),
            updated_at: at(),
        };
        let row = maintenance_row(&item);
        assert_eq!(row.status.as_ref(), "in_progress");
        assert_eq!(row.status_set_at.as_ref(), &Some(at().naive_utc()));

        let model = maintenance_item::Model {
            id: item.id,
            name: item.name.clone(),
            description: String::new(),
            priority: "high".into(),
            assigned_to: None,
            status: "in_progress".into(),
            due_date: Some(at().naive_utc()),
            status_set_at: Some(at().naive_utc()),
            created_at: at().naive_utc(),
            updated_at: at().naive_utc(),
        };
        assert_eq!(maintenance_from_row(model, Vec::new()).unwrap(), item);
    }
}
