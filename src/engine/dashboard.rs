use chrono::{DateTime, Utc};
use serde::Serialize;

use super::alerts::Alert;
use super::detector::DetectorStatus;
use super::extinguisher::DispatchStatus;
use super::maintenance::MaintenanceStatus;
use super::status::EffectiveExtinguisherStatus;
use super::Engine;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectorCounts {
    pub total: usize,
    pub active: usize,
    pub triggered: usize,
}

/// Exclusive buckets by effective status, plus the units out for service
/// (which also sit in one of the buckets).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtinguisherCounts {
    pub total: usize,
    pub active: usize,
    pub triggered: usize,
    pub refill_due: usize,
    pub pressure_test_due: usize,
    pub dispatched: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertCounts {
    pub total: usize,
    pub unacknowledged: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub revision: u64,
    pub detectors: DetectorCounts,
    pub extinguishers: ExtinguisherCounts,
    pub maintenance: MaintenanceCounts,
    pub alerts: AlertCounts,
    pub recent_alerts: Vec<Alert>,
}

impl Engine {
    /// Summarize every store as of now.
    ///
    /// Each store is scanned once, row by row; the four scans are not
    /// taken at one common instant.
    pub async fn dashboard(&self) -> DashboardSnapshot {
        let now = self.now();
        let revision = self.revision();

        let mut detectors = DetectorCounts::default();
        for d in self.detectors.snapshot().await {
            detectors.total += 1;
            match d.stored_status {
                DetectorStatus::Active => detectors.active += 1,
                DetectorStatus::Triggered => detectors.triggered += 1,
            }
        }

        let mut extinguishers = ExtinguisherCounts::default();
        for e in self.extinguishers.snapshot().await {
            extinguishers.total += 1;
            match self.deriver.extinguisher_status(&e, now) {
                EffectiveExtinguisherStatus::Active => extinguishers.active += 1,
                EffectiveExtinguisherStatus::Triggered => extinguishers.triggered += 1,
                EffectiveExtinguisherStatus::RefillDue => extinguishers.refill_due += 1,
                EffectiveExtinguisherStatus::PressureTestDue => {
                    extinguishers.pressure_test_due += 1;
                }
            }
            if e.dispatch_status != DispatchStatus::None {
                extinguishers.dispatched += 1;
            }
        }

        let mut maintenance = MaintenanceCounts::default();
        for item in self.maintenance.snapshot().await {
            maintenance.total += 1;
            match self.deriver.maintenance_status(&item, now) {
                MaintenanceStatus::Pending => maintenance.pending += 1,
                MaintenanceStatus::InProgress => maintenance.in_progress += 1,
                MaintenanceStatus::Completed => maintenance.completed += 1,
                MaintenanceStatus::Overdue => maintenance.overdue += 1,
            }
        }

        let (total, unacknowledged) = self.alerts.counts().await;
        let recent_alerts = self
            .alerts
            .recent(self.settings.dashboard_alert_limit, false)
            .await;

        crate::metrics::set_asset_totals(detectors.total, extinguishers.total, maintenance.total);

        DashboardSnapshot {
            generated_at: now,
            revision,
            detectors,
            extinguishers,
            maintenance,
            alerts: AlertCounts {
                total,
                unacknowledged,
            },
            recent_alerts,
        }
    }
}
