//! Persistence behind the engine.
//!
//! The engine keeps the working set in memory and writes every committed
//! change through a [`Repository`]. Each engine operation hands over its whole
//! write set in one [`Repository::apply`] call, which must be all-or-nothing.

mod sea_orm_repo;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::engine::alerts::Alert;
use crate::engine::detector::SmokeDetector;
use crate::engine::extinguisher::FireExtinguisher;
use crate::engine::maintenance::{MaintenanceItem, MaintenanceNote};

pub use sea_orm_repo::SeaOrmRepository;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("unreadable {table} row {id}: {detail}")]
    Corrupt {
        table: &'static str,
        id: Uuid,
        detail: String,
    },

    #[error("storage backend unavailable: {0}")]
    Backend(String),
}

#[derive(Debug, Clone)]
pub enum Mutation {
    UpsertDetector(SmokeDetector),
    DeleteDetector(Uuid),
    UpsertExtinguisher(FireExtinguisher),
    DeleteExtinguisher(Uuid),
    /// Writes the item's own fields. Notes go through `AppendNote`.
    UpsertMaintenance(MaintenanceItem),
    AppendNote { item_id: Uuid, note: MaintenanceNote },
    DeleteMaintenance(Uuid),
    UpsertAlert(Alert),
}

/// Everything a repository holds, for hydrating the engine at startup.
#[derive(Debug, Default)]
pub struct Dataset {
    pub detectors: Vec<SmokeDetector>,
    pub extinguishers: Vec<FireExtinguisher>,
    pub maintenance_items: Vec<MaintenanceItem>,
    pub alerts: Vec<Alert>,
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn load(&self) -> Result<Dataset, StorageError>;

    async fn apply(&self, mutations: &[Mutation]) -> Result<(), StorageError>;
}

/// Discards every write. State lives only as long as the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRepository;

#[async_trait]
impl Repository for NoopRepository {
    async fn load(&self) -> Result<Dataset, StorageError> {
        Ok(Dataset::default())
    }

    async fn apply(&self, mutations: &[Mutation]) -> Result<(), StorageError> {
        tracing::trace!(count = mutations.len(), "Discarding writes");
        Ok(())
    }
}
