// ── Keyed row store with per-row locking ──
//
// Each row sits behind its own async mutex so operations on the same id are
// serialized while different ids proceed in parallel. A deleted row is left
// as `None` under its lock so that callers already queued on it observe the
// deletion instead of resurrecting the entity.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::error::{EngineError, EngineResult};

type Row<T> = Arc<Mutex<Option<T>>>;

pub(crate) struct Store<T: Clone + Send + Sync + 'static> {
    kind: &'static str,
    rows: DashMap<Uuid, Row<T>>,
}

/// Exclusive hold on one row for the duration of a read-modify-write.
///
/// `current` is the value observed when the lock was taken. Nothing is
/// written back unless [`RowGuard::commit`] or [`RowGuard::remove`] is called,
/// so dropping the guard after a failed validation or storage write leaves
/// the row untouched.
pub(crate) struct RowGuard<T> {
    pub current: T,
    guard: OwnedMutexGuard<Option<T>>,
}

impl<T> RowGuard<T> {
    pub fn commit(mut self, value: T) {
        *self.guard = Some(value);
    }

    fn clear(mut self) {
        *self.guard = None;
    }
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            rows: DashMap::new(),
        }
    }

    /// Insert a freshly created (or hydrated) row.
    pub fn insert(&self, id: Uuid, value: T) {
        self.rows.insert(id, Arc::new(Mutex::new(Some(value))));
    }

    // The map shard lock is released before any await.
    fn row(&self, id: Uuid) -> Option<Row<T>> {
        self.rows.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub async fn get(&self, id: Uuid) -> Option<T> {
        let row = self.row(id)?;
        let value = row.lock().await;
        value.clone()
    }

    /// Lock a row for a read-modify-write cycle.
    pub async fn checkout(&self, id: Uuid) -> EngineResult<RowGuard<T>> {
        let row = self
            .row(id)
            .ok_or_else(|| EngineError::not_found(self.kind, id))?;
        let guard = row.lock_owned().await;
        match guard.as_ref() {
            Some(value) => Ok(RowGuard {
                current: value.clone(),
                guard,
            }),
            None => Err(EngineError::not_found(self.kind, id)),
        }
    }

    /// Drop a checked-out row from the store.
    pub fn remove(&self, id: Uuid, guard: RowGuard<T>) {
        guard.clear();
        self.rows.remove(&id);
    }

    /// Read every row, each under its own lock.
    ///
    /// Every returned value is a single consistent version of its row; rows
    /// are not read at one common instant.
    pub async fn snapshot(&self) -> Vec<T> {
        let rows: Vec<Row<T>> = self.rows.iter().map(|r| Arc::clone(r.value())).collect();
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(value) = row.lock().await.clone() {
                values.push(value);
            }
        }
        values
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
