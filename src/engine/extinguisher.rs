//! Fire extinguisher lifecycle.
//!
//! Two independent state machines live on the same record:
//!
//! - the primary `stored_status` (`active`, `triggered`, `refill_due`,
//!   `pressure_test_due`), moved by trigger, refill and pressure test;
//! - the dispatch cycle `none -> dispatched -> under_process -> received -> none`
//!   tracking a unit that is physically out for service.
//!
//! A unit can be waiting for a pressure test and out for refill at the same
//! time, so neither dimension is folded into the other.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::info;
use uuid::Uuid;

use super::alerts::{Alert, SourceKind};
use super::error::{require_text, EngineError, EngineResult};
use super::status::{days_until, DueFlags, EffectiveExtinguisherStatus, StatusDeriver};
use super::Engine;
use crate::repository::Mutation;

pub(crate) const KIND: &str = "fire extinguisher";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExtinguisherStatus {
    Active,
    Triggered,
    RefillDue,
    PressureTestDue,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DispatchStatus {
    None,
    Dispatched,
    UnderProcess,
    Received,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireExtinguisher {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub stored_status: ExtinguisherStatus,
    pub last_refill: DateTime<Utc>,
    pub next_refill_due: DateTime<Utc>,
    pub last_pressure_test: DateTime<Utc>,
    pub next_pressure_test_due: DateTime<Utc>,
    pub last_triggered: Option<DateTime<Utc>>,
    pub dispatch_status: DispatchStatus,
    pub dispatch_date: Option<DateTime<Utc>>,
    pub received_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewExtinguisher {
    pub name: String,
    pub location: String,
    pub last_refill: DateTime<Utc>,
    pub last_pressure_test: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtinguisherPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub last_refill: Option<DateTime<Utc>>,
    pub last_pressure_test: Option<DateTime<Utc>>,
    /// Explicit override of the persisted status. `triggered` is reserved
    /// for the trigger operation.
    pub stored_status: Option<ExtinguisherStatus>,
}

/// An extinguisher together with its due flags at read time.
#[derive(Debug, Clone, Serialize)]
pub struct ExtinguisherView {
    #[serde(flatten)]
    pub extinguisher: FireExtinguisher,
    #[serde(flatten)]
    pub due: DueFlags,
    pub effective_status: EffectiveExtinguisherStatus,
}

/// `from + interval`, or a validation error when that falls outside the
/// representable date range.
fn due_after(from: DateTime<Utc>, interval: Duration) -> EngineResult<DateTime<Utc>> {
    from.checked_add_signed(interval).ok_or_else(|| {
        EngineError::Validation(format!(
            "{from} is too far in the future to schedule the next service"
        ))
    })
}

impl FireExtinguisher {
    fn trigger(&self, now: DateTime<Utc>) -> EngineResult<Self> {
        if self.stored_status == ExtinguisherStatus::Triggered {
            return Err(EngineError::invalid(KIND, self.id, self.stored_status, "trigger"));
        }
        Ok(Self {
            stored_status: ExtinguisherStatus::Triggered,
            last_triggered: Some(now),
            updated_at: now,
            ..self.clone()
        })
    }

    /// Record a completed refill. Does not check whether one was due.
    fn refilled(&self, now: DateTime<Utc>, interval: Duration) -> EngineResult<Self> {
        let stored_status = match self.stored_status {
            ExtinguisherStatus::Triggered | ExtinguisherStatus::RefillDue => {
                ExtinguisherStatus::Active
            }
            other => other,
        };
        Ok(Self {
            stored_status,
            last_refill: now,
            next_refill_due: due_after(now, interval)?,
            updated_at: now,
            ..self.clone()
        })
    }

    fn pressure_tested(
        &self,
        now: DateTime<Utc>,
        interval: Duration,
        deriver: &StatusDeriver,
    ) -> EngineResult<Self> {
        let mut next = Self {
            last_pressure_test: now,
            next_pressure_test_due: due_after(now, interval)?,
            updated_at: now,
            ..self.clone()
        };
        if next.stored_status == ExtinguisherStatus::PressureTestDue {
            next.stored_status = ExtinguisherStatus::Active;
            if deriver.refill_due(&next, now) {
                next.stored_status = ExtinguisherStatus::RefillDue;
            }
        }
        Ok(next)
    }

    fn dispatched(&self, now: DateTime<Utc>) -> EngineResult<Self> {
        if self.dispatch_status != DispatchStatus::None {
            return Err(EngineError::invalid(KIND, self.id, self.dispatch_status, "dispatch"));
        }
        Ok(Self {
            dispatch_status: DispatchStatus::Dispatched,
            dispatch_date: Some(now),
            received_date: None,
            updated_at: now,
            ..self.clone()
        })
    }

    /// Close the dispatch cycle. The unit comes back serviced, so the refill
    /// is recorded and the unit becomes eligible for its next dispatch.
    fn received(&self, now: DateTime<Utc>, refill_interval: Duration) -> EngineResult<Self> {
        Ok(Self {
            dispatch_status: DispatchStatus::None,
            received_date: Some(now),
            ..self.refilled(now, refill_interval)?
        })
    }

    fn advanced(
        &self,
        target: DispatchStatus,
        now: DateTime<Utc>,
        refill_interval: Duration,
    ) -> EngineResult<Self> {
        match (self.dispatch_status, target) {
            (DispatchStatus::Dispatched, DispatchStatus::UnderProcess) => Ok(Self {
                dispatch_status: DispatchStatus::UnderProcess,
                updated_at: now,
                ..self.clone()
            }),
            (
                DispatchStatus::Dispatched | DispatchStatus::UnderProcess,
                DispatchStatus::Received,
            ) => self.received(now, refill_interval),
            (_, DispatchStatus::UnderProcess) => Err(EngineError::invalid(
                KIND,
                self.id,
                self.dispatch_status,
                "move to under_process",
            )),
            (_, DispatchStatus::Received) => {
                Err(EngineError::invalid(KIND, self.id, self.dispatch_status, "receive"))
            }
            (_, DispatchStatus::None | DispatchStatus::Dispatched) => Err(EngineError::invalid(
                KIND,
                self.id,
                self.dispatch_status,
                "advance dispatch",
            )),
        }
    }

    fn patched(
        &self,
        patch: ExtinguisherPatch,
        now: DateTime<Utc>,
        engine: &Engine,
    ) -> EngineResult<Self> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            require_text("name", &name)?;
            next.name = name;
        }
        if let Some(location) = patch.location {
            require_text("location", &location)?;
            next.location = location;
        }
        if let Some(last_refill) = patch.last_refill {
            next.last_refill = last_refill;
            next.next_refill_due = due_after(last_refill, engine.settings.refill_interval)?;
        }
        if let Some(last_test) = patch.last_pressure_test {
            next.last_pressure_test = last_test;
            next.next_pressure_test_due =
                due_after(last_test, engine.settings.pressure_test_interval)?;
        }
        if let Some(status) = patch.stored_status {
            if status == ExtinguisherStatus::Triggered {
                return Err(EngineError::Validation(
                    "stored_status cannot be set to triggered; use the trigger action".into(),
                ));
            }
            if self.stored_status == ExtinguisherStatus::Triggered && status != self.stored_status
            {
                return Err(EngineError::invalid(KIND, self.id, self.stored_status, "set status"));
            }
            next.stored_status = status;
        }
        next.updated_at = now;
        Ok(next)
    }
}

impl Engine {
    pub fn extinguisher_view(&self, extinguisher: FireExtinguisher) -> ExtinguisherView {
        let now = self.now();
        ExtinguisherView {
            due: self.deriver.due_flags(&extinguisher, now),
            effective_status: self.deriver.extinguisher_status(&extinguisher, now),
            extinguisher,
        }
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_extinguisher(
        &self,
        input: NewExtinguisher,
    ) -> EngineResult<FireExtinguisher> {
        require_text("name", &input.name)?;
        require_text("location", &input.location)?;

        let now = self.now();
        let extinguisher = FireExtinguisher {
            id: Uuid::new_v4(),
            name: input.name,
            location: input.location,
            stored_status: ExtinguisherStatus::Active,
            last_refill: input.last_refill,
            next_refill_due: due_after(input.last_refill, self.settings.refill_interval)?,
            last_pressure_test: input.last_pressure_test,
            next_pressure_test_due: due_after(
                input.last_pressure_test,
                self.settings.pressure_test_interval,
            )?,
            last_triggered: None,
            dispatch_status: DispatchStatus::None,
            dispatch_date: None,
            received_date: None,
            created_at: now,
            updated_at: now,
        };
        self.persist(&[Mutation::UpsertExtinguisher(extinguisher.clone())])
            .await?;
        self.extinguishers
            .insert(extinguisher.id, extinguisher.clone());
        self.committed(KIND, "create");
        info!(extinguisher_id = %extinguisher.id, "Created fire extinguisher");
        Ok(extinguisher)
    }

    pub async fn get_extinguisher(&self, id: Uuid) -> EngineResult<FireExtinguisher> {
        self.extinguishers
            .get(id)
            .await
            .ok_or_else(|| EngineError::not_found(KIND, id))
    }

    pub async fn list_extinguishers(&self) -> Vec<FireExtinguisher> {
        let mut all = self.extinguishers.snapshot().await;
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        all
    }

    /// Units currently out for service, oldest dispatch first.
    pub async fn list_dispatched(&self) -> Vec<FireExtinguisher> {
        let mut out: Vec<_> = self
            .extinguishers
            .snapshot()
            .await
            .into_iter()
            .filter(|e| e.dispatch_status != DispatchStatus::None)
            .collect();
        out.sort_by_key(|e| e.dispatch_date);
        out
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_extinguisher(
        &self,
        id: Uuid,
        patch: ExtinguisherPatch,
    ) -> EngineResult<FireExtinguisher> {
        let row = self.extinguishers.checkout(id).await?;
        let next = row
            .current
            .patched(patch, self.now(), self)
            .map_err(|e| self.rejected(KIND, "update", e))?;
        self.persist(&[Mutation::UpsertExtinguisher(next.clone())])
            .await?;
        row.commit(next.clone());
        self.committed(KIND, "update");
        Ok(next)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_extinguisher(&self, id: Uuid) -> EngineResult<()> {
        let row = self.extinguishers.checkout(id).await?;
        self.persist(&[Mutation::DeleteExtinguisher(id)]).await?;
        self.extinguishers.remove(id, row);
        self.committed(KIND, "delete");
        info!(extinguisher_id = %id, "Deleted fire extinguisher");
        Ok(())
    }

    /// Record a discharge and raise an alert.
    #[tracing::instrument(skip(self))]
    pub async fn trigger_extinguisher(
        &self,
        id: Uuid,
    ) -> EngineResult<(FireExtinguisher, Alert)> {
        let row = self.extinguishers.checkout(id).await?;
        let now = self.now();
        let next = row
            .current
            .trigger(now)
            .map_err(|e| self.rejected(KIND, "trigger", e))?;
        let alert = Alert::new(
            SourceKind::Extinguisher,
            id,
            &next.location,
            format!("Fire extinguisher discharged at {}", next.location),
            now,
        );

        self.persist(&[
            Mutation::UpsertExtinguisher(next.clone()),
            Mutation::UpsertAlert(alert.clone()),
        ])
        .await?;
        row.commit(next.clone());
        self.alerts.append(alert.clone()).await;
        crate::metrics::increment_alerts_raised(SourceKind::Extinguisher);
        self.committed(KIND, "trigger");
        info!(extinguisher_id = %id, alert_id = %alert.id, "Fire extinguisher triggered");
        Ok((next, alert))
    }

    #[tracing::instrument(skip(self))]
    pub async fn refill_extinguisher(&self, id: Uuid) -> EngineResult<FireExtinguisher> {
        let row = self.extinguishers.checkout(id).await?;
        let now = self.now();
        if !self.deriver.refill_due(&row.current, now) {
            return Err(self.rejected(
                KIND,
                "refill",
                EngineError::ActionNotDue {
                    id,
                    action: "refill",
                    days_remaining: days_until(row.current.next_refill_due, now),
                },
            ));
        }
        let next = row
            .current
            .refilled(now, self.settings.refill_interval)
            .map_err(|e| self.rejected(KIND, "refill", e))?;
        self.persist(&[Mutation::UpsertExtinguisher(next.clone())])
            .await?;
        row.commit(next.clone());
        self.committed(KIND, "refill");
        info!(extinguisher_id = %id, next_refill_due = %next.next_refill_due, "Fire extinguisher refilled");
        Ok(next)
    }

    #[tracing::instrument(skip(self))]
    pub async fn pressure_test_extinguisher(&self, id: Uuid) -> EngineResult<FireExtinguisher> {
        let row = self.extinguishers.checkout(id).await?;
        let now = self.now();
        if !self.deriver.pressure_test_due(&row.current, now) {
            return Err(self.rejected(
                KIND,
                "pressure_test",
                EngineError::ActionNotDue {
                    id,
                    action: "pressure test",
                    days_remaining: days_until(row.current.next_pressure_test_due, now),
                },
            ));
        }
        let next = row
            .current
            .pressure_tested(now, self.settings.pressure_test_interval, &self.deriver)
            .map_err(|e| self.rejected(KIND, "pressure_test", e))?;
        self.persist(&[Mutation::UpsertExtinguisher(next.clone())])
            .await?;
        row.commit(next.clone());
        self.committed(KIND, "pressure_test");
        info!(extinguisher_id = %id, next_pressure_test_due = %next.next_pressure_test_due, "Fire extinguisher pressure tested");
        Ok(next)
    }

    #[tracing::instrument(skip(self))]
    pub async fn dispatch_extinguisher(&self, id: Uuid) -> EngineResult<FireExtinguisher> {
        let row = self.extinguishers.checkout(id).await?;
        let next = row
            .current
            .dispatched(self.now())
            .map_err(|e| self.rejected(KIND, "dispatch", e))?;
        self.persist(&[Mutation::UpsertExtinguisher(next.clone())])
            .await?;
        row.commit(next.clone());
        self.committed(KIND, "dispatch");
        info!(extinguisher_id = %id, "Fire extinguisher dispatched");
        Ok(next)
    }

    /// Move a dispatched unit forward. Reaching `received` closes the cycle
    /// and leaves the unit back at `none`.
    #[tracing::instrument(skip(self))]
    pub async fn advance_dispatch(
        &self,
        id: Uuid,
        target: DispatchStatus,
    ) -> EngineResult<FireExtinguisher> {
        let row = self.extinguishers.checkout(id).await?;
        let next = row
            .current
            .advanced(target, self.now(), self.settings.refill_interval)
            .map_err(|e| self.rejected(KIND, "advance_dispatch", e))?;
        self.persist(&[Mutation::UpsertExtinguisher(next.clone())])
            .await?;
        let from = row.current.dispatch_status;
        row.commit(next.clone());
        self.committed(KIND, "advance_dispatch");
        info!(extinguisher_id = %id, %from, to = %target, "Dispatch advanced");
        Ok(next)
    }

    pub async fn receive_extinguisher(&self, id: Uuid) -> EngineResult<FireExtinguisher> {
        self.advance_dispatch(id, DispatchStatus::Received).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::engine_at;

    async fn seeded(engine: &Engine, refill_in_days: i64, test_in_days: i64) -> FireExtinguisher {
        let now = engine.now();
        let refill = engine.settings.refill_interval;
        let test = engine.settings.pressure_test_interval;
        engine
            .create_extinguisher(NewExtinguisher {
                name: "EXT-7".into(),
                location: "Loading Dock".into(),
                last_refill: now + Duration::days(refill_in_days) - refill,
                last_pressure_test: now + Duration::days(test_in_days) - test,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_computes_due_dates() {
        let (engine, _clock) = engine_at();
        let ext = seeded(&engine, 200, 600).await;
        assert_eq!(ext.next_refill_due, ext.last_refill + Duration::days(365));
        assert_eq!(
            ext.next_pressure_test_due,
            ext.last_pressure_test + Duration::days(365 * 3)
        );
        assert!(ext.next_refill_due >= ext.last_refill);
        assert_eq!(ext.dispatch_status, DispatchStatus::None);
    }

    #[tokio::test]
    async fn refill_rejected_when_far_from_due() {
        let (engine, _clock) = engine_at();
        let ext = seeded(&engine, 400, 600).await;
        let err = engine.refill_extinguisher(ext.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::ActionNotDue { action: "refill", days_remaining: 400, .. }
        ));
        assert_eq!(engine.get_extinguisher(ext.id).await.unwrap(), ext);
    }

    #[tokio::test]
    async fn refill_accepted_inside_lead_window() {
        let (engine, _clock) = engine_at();
        let ext = seeded(&engine, 10, 600).await;
        let refilled = engine.refill_extinguisher(ext.id).await.unwrap();
        assert_eq!(refilled.last_refill, engine.now());
        assert_eq!(refilled.next_refill_due, engine.now() + Duration::days(365));
        assert_eq!(refilled.stored_status, ExtinguisherStatus::Active);
    }

    #[tokio::test]
    async fn triggered_unit_can_be_refilled_early_and_returns_to_active() {
        let (engine, _clock) = engine_at();
        let ext = seeded(&engine, 300, 600).await;
        let (triggered, alert) = engine.trigger_extinguisher(ext.id).await.unwrap();
        assert_eq!(triggered.stored_status, ExtinguisherStatus::Triggered);
        assert_eq!(alert.source_kind, SourceKind::Extinguisher);
        assert!(matches!(
            engine.trigger_extinguisher(ext.id).await,
            Err(EngineError::InvalidTransition { .. })
        ));

        let refilled = engine.refill_extinguisher(ext.id).await.unwrap();
        assert_eq!(refilled.stored_status, ExtinguisherStatus::Active);
        assert_eq!(refilled.last_triggered, triggered.last_triggered);
    }

    #[tokio::test]
    async fn refill_due_flag_does_not_open_the_refill_gate() {
        let (engine, _clock) = engine_at();
        let ext = seeded(&engine, 400, 600).await;
        let flagged = engine
            .update_extinguisher(
                ext.id,
                ExtinguisherPatch {
                    stored_status: Some(ExtinguisherStatus::RefillDue),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let view = engine.extinguisher_view(flagged.clone());
        assert!(!view.due.refill_due);
        assert_eq!(view.effective_status, EffectiveExtinguisherStatus::RefillDue);

        let err = engine.refill_extinguisher(ext.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::ActionNotDue { action: "refill", days_remaining: 400, .. }
        ));
        assert_eq!(engine.get_extinguisher(ext.id).await.unwrap(), flagged);
    }

    #[tokio::test]
    async fn pressure_test_gated_and_normalizes_status() {
        let (engine, clock) = engine_at();
        let ext = seeded(&engine, 300, 200).await;
        assert!(matches!(
            engine.pressure_test_extinguisher(ext.id).await,
            Err(EngineError::ActionNotDue { .. })
        ));

        let flagged = engine
            .update_extinguisher(
                ext.id,
                ExtinguisherPatch {
                    stored_status: Some(ExtinguisherStatus::PressureTestDue),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(flagged.stored_status, ExtinguisherStatus::PressureTestDue);
        assert!(matches!(
            engine.pressure_test_extinguisher(ext.id).await,
            Err(EngineError::ActionNotDue { action: "pressure test", .. })
        ));

        clock.advance(Duration::days(180));
        let tested = engine.pressure_test_extinguisher(ext.id).await.unwrap();
        assert_eq!(tested.stored_status, ExtinguisherStatus::Active);
        assert_eq!(tested.last_pressure_test, engine.now());
        assert_eq!(
            tested.next_pressure_test_due,
            engine.now() + Duration::days(365 * 3)
        );
    }

    #[tokio::test]
    async fn pressure_test_keeps_refill_due_when_refill_still_pending() {
        let (engine, _clock) = engine_at();
        let ext = seeded(&engine, 5, 5).await;
        let ext = engine
            .update_extinguisher(
                ext.id,
                ExtinguisherPatch {
                    stored_status: Some(ExtinguisherStatus::PressureTestDue),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let tested = engine.pressure_test_extinguisher(ext.id).await.unwrap();
        assert_eq!(tested.stored_status, ExtinguisherStatus::RefillDue);
    }

    #[tokio::test]
    async fn dispatch_cycle_is_repeatable() {
        let (engine, clock) = engine_at();
        let ext = seeded(&engine, 300, 600).await;

        assert!(matches!(
            engine
                .advance_dispatch(ext.id, DispatchStatus::UnderProcess)
                .await,
            Err(EngineError::InvalidTransition { .. })
        ));

        let out = engine.dispatch_extinguisher(ext.id).await.unwrap();
        assert_eq!(out.dispatch_status, DispatchStatus::Dispatched);
        assert_eq!(out.dispatch_date, Some(engine.now()));
        assert!(matches!(
            engine.dispatch_extinguisher(ext.id).await,
            Err(EngineError::InvalidTransition { .. })
        ));

        let working = engine
            .advance_dispatch(ext.id, DispatchStatus::UnderProcess)
            .await
            .unwrap();
        assert_eq!(working.dispatch_status, DispatchStatus::UnderProcess);
        assert!(matches!(
            engine
                .advance_dispatch(ext.id, DispatchStatus::UnderProcess)
                .await,
            Err(EngineError::InvalidTransition { .. })
        ));
        assert!(matches!(
            engine
                .advance_dispatch(ext.id, DispatchStatus::Dispatched)
                .await,
            Err(EngineError::InvalidTransition { .. })
        ));

        clock.advance(Duration::days(3));
        let back = engine.receive_extinguisher(ext.id).await.unwrap();
        assert_eq!(back.dispatch_status, DispatchStatus::None);
        assert_eq!(back.received_date, Some(engine.now()));
        assert_eq!(back.last_refill, engine.now());
        assert_eq!(back.next_refill_due, engine.now() + Duration::days(365));

        // A second cycle, skipping straight to received.
        engine.dispatch_extinguisher(ext.id).await.unwrap();
        let again = engine
            .advance_dispatch(ext.id, DispatchStatus::Received)
            .await
            .unwrap();
        assert_eq!(again.dispatch_status, DispatchStatus::None);
    }

    #[tokio::test]
    async fn receive_without_dispatch_is_rejected() {
        let (engine, _clock) = engine_at();
        let ext = seeded(&engine, 300, 600).await;
        assert!(matches!(
            engine.receive_extinguisher(ext.id).await,
            Err(EngineError::InvalidTransition { action: "receive", .. })
        ));
    }

    #[tokio::test]
    async fn dispatch_is_independent_of_primary_status() {
        let (engine, _clock) = engine_at();
        let ext = seeded(&engine, 300, 10).await;
        engine.dispatch_extinguisher(ext.id).await.unwrap();
        let (triggered, _) = engine.trigger_extinguisher(ext.id).await.unwrap();
        assert_eq!(triggered.dispatch_status, DispatchStatus::Dispatched);

        let view = engine.extinguisher_view(triggered);
        assert!(view.due.pressure_test_due);
        assert!(view.due.refill_due);
        assert_eq!(view.effective_status, EffectiveExtinguisherStatus::Triggered);
        assert_eq!(engine.list_dispatched().await.len(), 1);
    }

    #[tokio::test]
    async fn patch_recomputes_due_dates_and_guards_status() {
        let (engine, _clock) = engine_at();
        let ext = seeded(&engine, 300, 600).await;
        let when = engine.now() - Duration::days(10);
        let updated = engine
            .update_extinguisher(
                ext.id,
                ExtinguisherPatch {
                    last_refill: Some(when),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.next_refill_due, when + Duration::days(365));
        assert_eq!(updated.next_pressure_test_due, ext.next_pressure_test_due);

        assert!(matches!(
            engine
                .update_extinguisher(
                    ext.id,
                    ExtinguisherPatch {
                        stored_status: Some(ExtinguisherStatus::Triggered),
                        ..Default::default()
                    },
                )
                .await,
            Err(EngineError::Validation(_))
        ));

        engine.trigger_extinguisher(ext.id).await.unwrap();
        assert!(matches!(
            engine
                .update_extinguisher(
                    ext.id,
                    ExtinguisherPatch {
                        stored_status: Some(ExtinguisherStatus::Active),
                        ..Default::default()
                    },
                )
                .await,
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn out_of_range_service_dates_are_rejected() {
        let (engine, _clock) = engine_at();
        let err = engine
            .create_extinguisher(NewExtinguisher {
                name: "EXT-9".into(),
                location: "Plant Room".into(),
                last_refill: DateTime::<Utc>::MAX_UTC,
                last_pressure_test: engine.now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(engine.list_extinguishers().await.is_empty());

        let ext = seeded(&engine, 300, 600).await;
        let err = engine
            .update_extinguisher(
                ext.id,
                ExtinguisherPatch {
                    last_pressure_test: Some(DateTime::<Utc>::MAX_UTC - Duration::days(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(engine.get_extinguisher(ext.id).await.unwrap(), ext);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn trigger_reads_the_clock_after_taking_the_row() {
        let (engine, clock) = engine_at();
        let engine = std::sync::Arc::new(engine);
        let ext = seeded(&engine, 300, 600).await;

        let row = engine.extinguishers.checkout(ext.id).await.unwrap();
        let waiter = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.trigger_extinguisher(ext.id).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        clock.advance(Duration::minutes(5));
        drop(row);

        let (triggered, alert) = waiter.await.unwrap().unwrap();
        assert_eq!(triggered.last_triggered, Some(engine.now()));
        assert_eq!(alert.timestamp, engine.now());
    }
}
