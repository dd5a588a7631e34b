//! Asset status and workflow engine.
//!
//! [`Engine`] owns one store per entity type plus the alert ledger. Every
//! mutating operation follows the same shape: lock the row, compute the next
//! value, write it through the injected [`Repository`], and only then commit
//! it in memory. A rejected or failed operation therefore changes nothing.

pub mod alerts;
pub mod clock;
pub mod dashboard;
pub mod detector;
pub mod error;
pub mod extinguisher;
pub mod maintenance;
pub mod settings;
pub mod status;
mod store;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::repository::{Mutation, NoopRepository, Repository};
use alerts::AlertLedger;
use clock::{Clock, SystemClock};
use detector::SmokeDetector;
use error::{EngineError, EngineResult};
use extinguisher::FireExtinguisher;
use maintenance::MaintenanceItem;
use settings::EngineSettings;
use status::StatusDeriver;
use store::Store;

pub struct Engine {
    clock: Arc<dyn Clock>,
    repository: Arc<dyn Repository>,
    pub(crate) settings: EngineSettings,
    pub(crate) deriver: StatusDeriver,
    pub(crate) detectors: Store<SmokeDetector>,
    pub(crate) extinguishers: Store<FireExtinguisher>,
    pub(crate) maintenance: Store<MaintenanceItem>,
    pub(crate) alerts: AlertLedger,
    revision: AtomicU64,
}

impl Engine {
    /// An engine on the system clock with a volatile repository.
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            repository: Arc::new(NoopRepository),
            deriver: StatusDeriver::new(settings.due_lead_days),
            settings,
            detectors: Store::new(detector::KIND),
            extinguishers: Store::new(extinguisher::KIND),
            maintenance: Store::new(maintenance::KIND),
            alerts: AlertLedger::default(),
            revision: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repository = repository;
        self
    }

    /// Load everything the repository holds into the in-memory stores.
    pub async fn hydrate(&self) -> EngineResult<()> {
        let data = self.repository.load().await?;
        let (detectors, extinguishers, items, mut alerts) = (
            data.detectors.len(),
            data.extinguishers.len(),
            data.maintenance_items.len(),
            data.alerts,
        );
        for d in data.detectors {
            self.detectors.insert(d.id, d);
        }
        for e in data.extinguishers {
            self.extinguishers.insert(e.id, e);
        }
        for item in data.maintenance_items {
            self.maintenance.insert(item.id, item);
        }
        alerts.sort_by_key(|a| a.timestamp);
        let alert_count = alerts.len();
        for alert in alerts {
            self.alerts.append(alert).await;
        }
        info!(
            detectors,
            extinguishers,
            maintenance_items = items,
            alerts = alert_count,
            "Hydrated engine from repository"
        );
        Ok(())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn deriver(&self) -> &StatusDeriver {
        &self.deriver
    }

    /// Bumped once per committed mutation. Clients can compare it between
    /// polls to skip refetching unchanged data.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// True when no asset of any kind is stored.
    pub fn has_no_assets(&self) -> bool {
        self.detectors.is_empty() && self.extinguishers.is_empty() && self.maintenance.is_empty()
    }

    pub fn asset_totals(&self) -> (usize, usize, usize) {
        (
            self.detectors.len(),
            self.extinguishers.len(),
            self.maintenance.len(),
        )
    }

    async fn persist(&self, mutations: &[Mutation]) -> EngineResult<()> {
        if let Err(e) = self.repository.apply(mutations).await {
            error!("Failed to persist {} change(s): {}", mutations.len(), e);
            crate::metrics::increment_storage_errors();
            return Err(EngineError::Storage(e));
        }
        Ok(())
    }

    fn committed(&self, asset: &'static str, action: &'static str) {
        self.revision.fetch_add(1, Ordering::SeqCst);
        crate::metrics::increment_transitions(asset, action);
    }

    fn rejected(&self, asset: &'static str, action: &'static str, err: EngineError) -> EngineError {
        warn!(asset, action, reason = err.reason(), "Rejected: {}", err);
        crate::metrics::increment_rejections(asset, action, err.reason());
        err
    }
}
