use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::info;
use uuid::Uuid;

use super::error::{require_text, EngineError, EngineResult};
use super::Engine;
use crate::repository::Mutation;

pub(crate) const KIND: &str = "maintenance item";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaintenanceStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceNote {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub assigned_to: Option<String>,
    pub status: MaintenanceStatus,
    pub due_date: Option<DateTime<Utc>>,
    /// When `status` was last set by an explicit update. Overdue is only
    /// derived while this predates the due date.
    #[serde(default)]
    pub status_set_at: Option<DateTime<Utc>>,
    /// Append-only, oldest first.
    pub notes: Vec<MaintenanceNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMaintenanceItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

// Distinguishes an absent field (outer `None`) from an explicit `null`
// (`Some(None)`) so nullable fields can be cleared.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaintenancePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
    /// Trusted verbatim, including a manual `overdue`. Once set on or after
    /// the due date it overrides the derived `overdue`.
    pub status: Option<MaintenanceStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceView {
    #[serde(flatten)]
    pub item: MaintenanceItem,
    pub effective_status: MaintenanceStatus,
}

impl MaintenanceItem {
    fn patched(&self, patch: MaintenancePatch, now: DateTime<Utc>) -> EngineResult<Self> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            require_text("name", &name)?;
            next.name = name;
        }
        if let Some(description) = patch.description {
            next.description = description;
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if let Some(assigned_to) = patch.assigned_to {
            next.assigned_to = assigned_to;
        }
        if let Some(status) = patch.status {
            next.status = status;
            next.status_set_at = Some(now);
        }
        if let Some(due_date) = patch.due_date {
            next.due_date = due_date;
        }
        next.updated_at = now;
        Ok(next)
    }
}

impl Engine {
    pub fn maintenance_view(&self, item: MaintenanceItem) -> MaintenanceView {
        MaintenanceView {
            effective_status: self.deriver.maintenance_status(&item, self.now()),
            item,
        }
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_maintenance_item(
        &self,
        input: NewMaintenanceItem,
    ) -> EngineResult<MaintenanceItem> {
        require_text("name", &input.name)?;
        let now = self.now();
        let item = MaintenanceItem {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            priority: input.priority.unwrap_or(Priority::Medium),
            assigned_to: input.assigned_to,
            status: MaintenanceStatus::Pending,
            due_date: input.due_date,
            status_set_at: None,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.persist(&[Mutation::UpsertMaintenance(item.clone())])
            .await?;
        self.maintenance.insert(item.id, item.clone());
        self.committed(KIND, "create");
        info!(item_id = %item.id, "Created maintenance item");
        Ok(item)
    }

    pub async fn get_maintenance_item(&self, id: Uuid) -> EngineResult<MaintenanceItem> {
        self.maintenance
            .get(id)
            .await
            .ok_or_else(|| EngineError::not_found(KIND, id))
    }

    /// All items, highest priority first, then earliest due date.
    pub async fn list_maintenance_items(&self) -> Vec<MaintenanceItem> {
        let mut items = self.maintenance.snapshot().await;
        items.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| match (a.due_date, b.due_date) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then(a.created_at.cmp(&b.created_at))
        });
        items
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_maintenance_item(
        &self,
        id: Uuid,
        patch: MaintenancePatch,
    ) -> EngineResult<MaintenanceItem> {
        let row = self.maintenance.checkout(id).await?;
        let next = row
            .current
            .patched(patch, self.now())
            .map_err(|e| self.rejected(KIND, "update", e))?;
        self.persist(&[Mutation::UpsertMaintenance(next.clone())])
            .await?;
        let from = row.current.status;
        row.commit(next.clone());
        self.committed(KIND, "update");
        if from != next.status {
            info!(item_id = %id, %from, to = %next.status, "Maintenance status changed");
        }
        Ok(next)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_maintenance_item(&self, id: Uuid) -> EngineResult<()> {
        let row = self.maintenance.checkout(id).await?;
        self.persist(&[Mutation::DeleteMaintenance(id)]).await?;
        self.maintenance.remove(id, row);
        self.committed(KIND, "delete");
        info!(item_id = %id, "Deleted maintenance item");
        Ok(())
    }

    /// Append a note. Leaves status and every other field as they were.
    #[tracing::instrument(skip(self, text))]
    pub async fn add_note(
        &self,
        item_id: Uuid,
        text: String,
        author: String,
    ) -> EngineResult<MaintenanceNote> {
        let row = self.maintenance.checkout(item_id).await?;
        let note = MaintenanceNote {
            id: Uuid::new_v4(),
            text,
            created_at: self.now(),
            created_by: author,
        };
        self.persist(&[Mutation::AppendNote {
            item_id,
            note: note.clone(),
        }])
        .await?;
        let mut next = row.current.clone();
        next.notes.push(note.clone());
        row.commit(next);
        self.committed(KIND, "add_note");
        Ok(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::engine_at;
    use chrono::Duration;

    fn new_item(due_in_days: Option<i64>, now: DateTime<Utc>) -> NewMaintenanceItem {
        NewMaintenanceItem {
            name: "Inspect sprinkler valves".into(),
            description: "Quarterly check".into(),
            priority: Some(Priority::High),
            assigned_to: Some("facilities".into()),
            due_date: due_in_days.map(|d| now + Duration::days(d)),
        }
    }

    #[tokio::test]
    async fn notes_are_appended_in_order_and_keep_status() {
        let (engine, clock) = engine_at();
        let item = engine
            .create_maintenance_item(new_item(Some(7), engine.now()))
            .await
            .unwrap();

        engine
            .add_note(item.id, "Parts ordered".into(), "alice".into())
            .await
            .unwrap();
        clock.advance(Duration::hours(2));
        engine
            .add_note(item.id, "Parts arrived".into(), "bob".into())
            .await
            .unwrap();

        let stored = engine.get_maintenance_item(item.id).await.unwrap();
        let texts: Vec<_> = stored.notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, ["Parts ordered", "Parts arrived"]);
        assert_eq!(stored.notes[1].created_by, "bob");
        assert_eq!(stored.status, MaintenanceStatus::Pending);
    }

    #[tokio::test]
    async fn note_on_unknown_item_is_not_found() {
        let (engine, _clock) = engine_at();
        assert!(matches!(
            engine
                .add_note(Uuid::new_v4(), "x".into(), "alice".into())
                .await,
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn overdue_is_derived_until_explicit_update() {
        let (engine, clock) = engine_at();
        let item = engine
            .create_maintenance_item(new_item(Some(2), engine.now()))
            .await
            .unwrap();
        assert_eq!(
            engine.maintenance_view(item.clone()).effective_status,
            MaintenanceStatus::Pending
        );

        clock.advance(Duration::days(3));
        let stored = engine.get_maintenance_item(item.id).await.unwrap();
        assert_eq!(stored.status, MaintenanceStatus::Pending);
        assert_eq!(
            engine.maintenance_view(stored).effective_status,
            MaintenanceStatus::Overdue
        );

        let done = engine
            .update_maintenance_item(
                item.id,
                MaintenancePatch {
                    status: Some(MaintenanceStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            engine.maintenance_view(done).effective_status,
            MaintenanceStatus::Completed
        );
    }

    #[tokio::test]
    async fn explicit_status_after_due_date_overrides_overdue() {
        let (engine, clock) = engine_at();
        let item = engine
            .create_maintenance_item(new_item(Some(1), engine.now()))
            .await
            .unwrap();
        clock.advance(Duration::days(2));
        assert_eq!(
            engine.maintenance_view(item.clone()).effective_status,
            MaintenanceStatus::Overdue
        );

        let working = engine
            .update_maintenance_item(
                item.id,
                MaintenancePatch {
                    status: Some(MaintenanceStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(working.status_set_at, Some(engine.now()));
        assert_eq!(
            engine.maintenance_view(working.clone()).effective_status,
            MaintenanceStatus::InProgress
        );

        // A later edit that leaves status alone keeps the override.
        clock.advance(Duration::days(1));
        let renamed = engine
            .update_maintenance_item(
                item.id,
                MaintenancePatch {
                    name: Some("Inspect sprinkler valves (east)".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.status_set_at, working.status_set_at);
        assert_eq!(
            engine.maintenance_view(renamed).effective_status,
            MaintenanceStatus::InProgress
        );

        // Pushing the due date out and letting it pass again re-arms overdue.
        engine
            .update_maintenance_item(
                item.id,
                MaintenancePatch {
                    due_date: Some(Some(engine.now() + Duration::days(3))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        clock.advance(Duration::days(4));
        let stored = engine.get_maintenance_item(item.id).await.unwrap();
        assert_eq!(
            engine.maintenance_view(stored).effective_status,
            MaintenanceStatus::Overdue
        );
    }

    #[tokio::test]
    async fn status_set_before_due_date_does_not_block_overdue() {
        let (engine, clock) = engine_at();
        let item = engine
            .create_maintenance_item(new_item(Some(5), engine.now()))
            .await
            .unwrap();
        engine
            .update_maintenance_item(
                item.id,
                MaintenancePatch {
                    status: Some(MaintenanceStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        clock.advance(Duration::days(6));
        let stored = engine.get_maintenance_item(item.id).await.unwrap();
        assert_eq!(stored.status, MaintenanceStatus::InProgress);
        assert_eq!(
            engine.maintenance_view(stored).effective_status,
            MaintenanceStatus::Overdue
        );
    }

    #[tokio::test]
    async fn patch_clears_nullable_fields() {
        let (engine, _clock) = engine_at();
        let item = engine
            .create_maintenance_item(new_item(Some(2), engine.now()))
            .await
            .unwrap();

        let patch: MaintenancePatch =
            serde_json::from_str(r#"{"assigned_to": null, "priority": "low"}"#).unwrap();
        let updated = engine.update_maintenance_item(item.id, patch).await.unwrap();
        assert_eq!(updated.assigned_to, None);
        assert_eq!(updated.priority, Priority::Low);
        assert_eq!(updated.due_date, item.due_date);

        let patch: MaintenancePatch = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        let updated = engine.update_maintenance_item(item.id, patch).await.unwrap();
        assert_eq!(updated.due_date, None);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (engine, _clock) = engine_at();
        let mut input = new_item(None, engine.now());
        input.name = " ".into();
        assert!(matches!(
            engine.create_maintenance_item(input).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn list_orders_by_priority_then_due_date() {
        let (engine, _clock) = engine_at();
        let now = engine.now();
        let mut low = new_item(Some(1), now);
        low.priority = Some(Priority::Low);
        low.name = "low".into();
        let mut later = new_item(Some(20), now);
        later.name = "high later".into();
        let mut sooner = new_item(Some(5), now);
        sooner.name = "high sooner".into();
        for input in [low, later, sooner] {
            engine.create_maintenance_item(input).await.unwrap();
        }

        let names: Vec<_> = engine
            .list_maintenance_items()
            .await
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["high sooner", "high later", "low"]);
    }

    #[tokio::test]
    async fn delete_is_hard() {
        let (engine, _clock) = engine_at();
        let item = engine
            .create_maintenance_item(new_item(None, engine.now()))
            .await
            .unwrap();
        engine.delete_maintenance_item(item.id).await.unwrap();
        assert!(engine.list_maintenance_items().await.is_empty());
    }
}
