use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::info;
use uuid::Uuid;

use super::alerts::{Alert, SourceKind};
use super::error::{require_text, EngineError, EngineResult};
use super::Engine;
use crate::repository::Mutation;

pub(crate) const KIND: &str = "smoke detector";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetectorStatus {
    Active,
    Triggered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmokeDetector {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub battery_level: i32,
    pub stored_status: DetectorStatus,
    pub last_triggered: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDetector {
    pub name: String,
    pub location: String,
    pub battery_level: Option<i32>,
}

/// Field-level edits. Status is not editable here; it only moves through
/// `trigger` and `reset`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectorPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub battery_level: Option<i32>,
}

fn check_battery(level: i32) -> EngineResult<()> {
    if (0..=100).contains(&level) {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "battery_level must be between 0 and 100, got {level}"
        )))
    }
}

impl SmokeDetector {
    fn trigger(&self, now: DateTime<Utc>) -> EngineResult<Self> {
        match self.stored_status {
            DetectorStatus::Active => Ok(Self {
                stored_status: DetectorStatus::Triggered,
                last_triggered: Some(now),
                updated_at: now,
                ..self.clone()
            }),
            DetectorStatus::Triggered => {
                Err(EngineError::invalid(KIND, self.id, self.stored_status, "trigger"))
            }
        }
    }

    fn reset(&self, now: DateTime<Utc>) -> EngineResult<Self> {
        match self.stored_status {
            DetectorStatus::Triggered => Ok(Self {
                stored_status: DetectorStatus::Active,
                updated_at: now,
                ..self.clone()
            }),
            DetectorStatus::Active => {
                Err(EngineError::invalid(KIND, self.id, self.stored_status, "reset"))
            }
        }
    }

    fn patched(&self, patch: DetectorPatch, now: DateTime<Utc>) -> EngineResult<Self> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            require_text("name", &name)?;
            next.name = name;
        }
        if let Some(location) = patch.location {
            require_text("location", &location)?;
            next.location = location;
        }
        if let Some(level) = patch.battery_level {
            check_battery(level)?;
            next.battery_level = level;
        }
        next.updated_at = now;
        Ok(next)
    }
}

impl Engine {
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_detector(&self, input: NewDetector) -> EngineResult<SmokeDetector> {
        require_text("name", &input.name)?;
        require_text("location", &input.location)?;
        let battery_level = input.battery_level.unwrap_or(100);
        check_battery(battery_level)?;

        let now = self.now();
        let detector = SmokeDetector {
            id: Uuid::new_v4(),
            name: input.name,
            location: input.location,
            battery_level,
            stored_status: DetectorStatus::Active,
            last_triggered: None,
            created_at: now,
            updated_at: now,
        };
        self.persist(&[Mutation::UpsertDetector(detector.clone())])
            .await?;
        self.detectors.insert(detector.id, detector.clone());
        self.committed(KIND, "create");
        info!(detector_id = %detector.id, "Created smoke detector");
        Ok(detector)
    }

    pub async fn get_detector(&self, id: Uuid) -> EngineResult<SmokeDetector> {
        self.detectors
            .get(id)
            .await
            .ok_or_else(|| EngineError::not_found(KIND, id))
    }

    pub async fn list_detectors(&self) -> Vec<SmokeDetector> {
        let mut detectors = self.detectors.snapshot().await;
        detectors.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        detectors
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_detector(
        &self,
        id: Uuid,
        patch: DetectorPatch,
    ) -> EngineResult<SmokeDetector> {
        let row = self.detectors.checkout(id).await?;
        let next = row
            .current
            .patched(patch, self.now())
            .map_err(|e| self.rejected(KIND, "update", e))?;
        self.persist(&[Mutation::UpsertDetector(next.clone())]).await?;
        row.commit(next.clone());
        self.committed(KIND, "update");
        Ok(next)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_detector(&self, id: Uuid) -> EngineResult<()> {
        let row = self.detectors.checkout(id).await?;
        self.persist(&[Mutation::DeleteDetector(id)]).await?;
        self.detectors.remove(id, row);
        self.committed(KIND, "delete");
        info!(detector_id = %id, "Deleted smoke detector");
        Ok(())
    }

    /// Mark the detector as having detected smoke and raise an alert.
    ///
    /// Re-triggering an already triggered detector is rejected so a stuck
    /// sensor cannot flood the ledger.
    #[tracing::instrument(skip(self))]
    pub async fn trigger_detector(&self, id: Uuid) -> EngineResult<(SmokeDetector, Alert)> {
        let row = self.detectors.checkout(id).await?;
        let now = self.now();
        let next = row
            .current
            .trigger(now)
            .map_err(|e| self.rejected(KIND, "trigger", e))?;
        let alert = Alert::new(
            SourceKind::Detector,
            id,
            &next.location,
            format!("Smoke detected at {}", next.location),
            now,
        );

        self.persist(&[
            Mutation::UpsertDetector(next.clone()),
            Mutation::UpsertAlert(alert.clone()),
        ])
        .await?;
        row.commit(next.clone());
        self.alerts.append(alert.clone()).await;
        crate::metrics::increment_alerts_raised(SourceKind::Detector);
        self.committed(KIND, "trigger");
        info!(detector_id = %id, alert_id = %alert.id, location = %next.location, "Smoke detector triggered");
        Ok((next, alert))
    }

    #[tracing::instrument(skip(self))]
    pub async fn reset_detector(&self, id: Uuid) -> EngineResult<SmokeDetector> {
        let row = self.detectors.checkout(id).await?;
        let next = row
            .current
            .reset(self.now())
            .map_err(|e| self.rejected(KIND, "reset", e))?;
        self.persist(&[Mutation::UpsertDetector(next.clone())]).await?;
        row.commit(next.clone());
        self.committed(KIND, "reset");
        info!(detector_id = %id, "Smoke detector reset");
        Ok(next)
    }
}
