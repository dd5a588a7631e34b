use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use super::detector::SmokeDetector;
use super::error::{EngineError, EngineResult};
use super::extinguisher::FireExtinguisher;
use super::Engine;
use crate::repository::Mutation;

pub(crate) const KIND: &str = "alert";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    Detector,
    Extinguisher,
}

/// A raised alert. `source_id` is a weak reference: the asset may have
/// been deleted since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub source_kind: SourceKind,
    pub source_id: Uuid,
    pub location: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
}

impl Alert {
    pub(crate) fn new(
        source_kind: SourceKind,
        source_id: Uuid,
        location: &str,
        message: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_kind,
            source_id,
            location: location.to_string(),
            message,
            timestamp: now,
            acknowledged: false,
            acknowledged_at: None,
            acknowledged_by: None,
        }
    }
}

/// The asset an alert points at, if it still exists.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertSource {
    Detector(SmokeDetector),
    Extinguisher(FireExtinguisher),
}

/// Append-only alert log, kept in ascending timestamp order.
///
/// The log lock is only ever held for in-memory work. Acknowledgments of the
/// same alert queue on a per-alert mutex while they wait on storage.
#[derive(Default)]
pub(crate) struct AlertLedger {
    entries: RwLock<Vec<Alert>>,
    acknowledging: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl AlertLedger {
    pub async fn append(&self, alert: Alert) {
        let mut entries = self.entries.write().await;
        // Concurrent raises can commit slightly out of order.
        let at = entries.partition_point(|a| a.timestamp <= alert.timestamp);
        entries.insert(at, alert);
    }

    pub async fn get(&self, id: Uuid) -> Option<Alert> {
        self.entries.read().await.iter().find(|a| a.id == id).cloned()
    }

    /// Newest first.
    pub async fn recent(&self, limit: usize, unacknowledged_only: bool) -> Vec<Alert> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|a| !unacknowledged_only || !a.acknowledged)
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn counts(&self) -> (usize, usize) {
        let entries = self.entries.read().await;
        let unacknowledged = entries.iter().filter(|a| !a.acknowledged).count();
        (entries.len(), unacknowledged)
    }

    fn acknowledge_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(self.acknowledging.entry(id).or_default().value())
    }

    /// Swap in the acknowledged copy. An acknowledgment already in place is
    /// kept and returned instead.
    async fn settle(&self, acknowledged: Alert) -> Alert {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|a| a.id == acknowledged.id) {
            Some(slot) if slot.acknowledged => slot.clone(),
            Some(slot) => {
                *slot = acknowledged.clone();
                acknowledged
            }
            None => acknowledged,
        }
    }
}

impl Engine {
    /// Append an alert to the ledger directly.
    #[tracing::instrument(skip(self, message))]
    pub async fn raise_alert(
        &self,
        source_kind: SourceKind,
        source_id: Uuid,
        location: &str,
        message: String,
    ) -> EngineResult<Alert> {
        let alert = Alert::new(source_kind, source_id, location, message, self.now());
        self.persist(&[Mutation::UpsertAlert(alert.clone())]).await?;
        self.alerts.append(alert.clone()).await;
        crate::metrics::increment_alerts_raised(source_kind);
        self.committed(KIND, "raise");
        info!(alert_id = %alert.id, %source_kind, %source_id, "Alert raised");
        Ok(alert)
    }

    /// Mark an alert as acknowledged.
    ///
    /// Acknowledging twice succeeds and leaves the first acknowledgment in
    /// place. Reads and raises carry on while the write is in flight.
    #[tracing::instrument(skip(self))]
    pub async fn acknowledge_alert(&self, id: Uuid, actor: &str) -> EngineResult<Alert> {
        let seen = self.get_alert(id).await?;
        if seen.acknowledged {
            return Ok(seen);
        }
        // Only ids known to the ledger get a lock entry.
        let lock = self.alerts.acknowledge_lock(id);
        let _turn = lock.lock().await;
        let current = self.get_alert(id).await?;
        if current.acknowledged {
            return Ok(current);
        }

        let now = self.now();
        let acknowledged = Alert {
            acknowledged: true,
            acknowledged_at: Some(now),
            acknowledged_by: Some(actor.to_string()),
            ..current
        };
        self.persist(&[Mutation::UpsertAlert(acknowledged.clone())])
            .await?;
        let acknowledged = self.alerts.settle(acknowledged).await;

        let waited = (now - acknowledged.timestamp).num_milliseconds().max(0);
        crate::metrics::record_acknowledgment_time(waited as f64 / 1000.0);
        crate::metrics::increment_alerts_acknowledged();
        self.committed(KIND, "acknowledge");
        info!(alert_id = %id, actor, "Alert acknowledged");
        Ok(acknowledged)
    }

    pub async fn get_alert(&self, id: Uuid) -> EngineResult<Alert> {
        self.alerts
            .get(id)
            .await
            .ok_or_else(|| EngineError::not_found(KIND, id))
    }

    pub async fn list_recent_alerts(&self, n: usize) -> Vec<Alert> {
        self.alerts.recent(n, false).await
    }

    pub async fn list_alerts(&self, limit: usize, unacknowledged_only: bool) -> Vec<Alert> {
        self.alerts.recent(limit, unacknowledged_only).await
    }

    /// Resolve the asset behind an alert. `Ok(None)` when it was deleted.
    pub async fn alert_source(&self, alert_id: Uuid) -> EngineResult<Option<AlertSource>> {
        let alert = self.get_alert(alert_id).await?;
        let source = match alert.source_kind {
            SourceKind::Detector => self
                .detectors
                .get(alert.source_id)
                .await
                .map(AlertSource::Detector),
            SourceKind::Extinguisher => self
                .extinguishers
                .get(alert.source_id)
                .await
                .map(AlertSource::Extinguisher),
        };
        Ok(source)
    }
}
