use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::entity::Entity;

/// Told about every change to a store's records. Runs while the store is
/// still write-locked, so observers see changes in order and must not lock
/// the same store again.
#[async_trait]
pub trait StoreObserver<E: Entity>: Send + Sync {
    async fn records_changed(&self, records: &[Arc<E>]);
}

struct StoreInner<E: Entity> {
    state: RwLock<StoreState<E>>,
    observers: Mutex<Vec<Arc<dyn StoreObserver<E>>>>,
}

impl<E: Entity> StoreInner<E> {
    async fn publish(&self, records: &[Arc<E>]) {
        let observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.records_changed(records).await;
        }
    }
}

struct StoreState<E: Entity> {
    records: Vec<Arc<E>>,
    context: E::Context,
}

impl<E: Entity> StoreState<E> {
    fn position(&self, id: E::Id) -> Option<usize> {
        self.records.iter().position(|record| record.id() == id)
    }

    fn derived(&self, mut record: E) -> Arc<E> {
        record.derive(&self.context);
        Arc::new(record)
    }

    fn install_context(&mut self, context: E::Context) {
        self.context = context;
        let Self { records, context } = self;
        for record in records.iter_mut() {
            Arc::make_mut(record).derive(context);
        }
    }
}

/// Ordered records of one entity type, owned by a page.
///
/// Records are shared as `Arc`s so readers can hold a snapshot while the
/// store keeps changing; an update swaps exactly one entry.
pub struct RecordStore<E: Entity> {
    inner: Arc<StoreInner<E>>,
}

impl<E: Entity> Default for RecordStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> RecordStore<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState {
                    records: Vec::new(),
                    context: E::Context::default(),
                }),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn observe(&self, observer: Arc<dyn StoreObserver<E>>) {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Mutator for forms and delete actions. It does not keep the store alive.
    pub fn handle(&self) -> StoreHandle<E> {
        StoreHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub async fn snapshot(&self) -> Vec<Arc<E>> {
        self.inner.state.read().await.records.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.read().await.records.is_empty()
    }

    pub async fn get(&self, id: E::Id) -> Option<Arc<E>> {
        let state = self.inner.state.read().await;
        state.position(id).map(|index| Arc::clone(&state.records[index]))
    }

    pub async fn context(&self) -> E::Context {
        self.inner.state.read().await.context.clone()
    }

    /// Swaps the whole collection. A `None` context keeps the current one.
    pub async fn replace_all(&self, records: Vec<E>, context: Option<E::Context>) {
        let mut state = self.inner.state.write().await;
        if let Some(context) = context {
            state.context = context;
        }
        let records = records
            .into_iter()
            .map(|record| state.derived(record))
            .collect();
        state.records = records;
        self.inner.publish(&state.records).await;
    }

    /// Installs a new context and re-derives every record against it.
    pub async fn set_context(&self, context: E::Context) {
        let mut state = self.inner.state.write().await;
        state.install_context(context);
    }

    /// Runs `f` over the records and context under one read lock.
    pub async fn with_records<R>(&self, f: impl FnOnce(&[Arc<E>], &E::Context) -> R) -> R {
        let state = self.inner.state.read().await;
        f(&state.records, &state.context)
    }
}

/// Weak mutator over a [`RecordStore`]. Every operation is a no-op once the
/// owning store is gone.
pub struct StoreHandle<E: Entity> {
    inner: Weak<StoreInner<E>>,
}

impl<E: Entity> Clone for StoreHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<E: Entity> StoreHandle<E> {
    pub fn is_attached(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub async fn context(&self) -> Option<E::Context> {
        let inner = self.inner.upgrade()?;
        let context = inner.state.read().await.context.clone();
        Some(context)
    }

    /// Same as [`RecordStore::set_context`]; `false` once detached.
    pub async fn set_context(&self, context: E::Context) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        inner.state.write().await.install_context(context);
        true
    }

    /// Adds a server-confirmed record at the end. An id already present is
    /// replaced in place instead of duplicated.
    pub async fn append(&self, record: E) -> Option<Arc<E>> {
        let Some(inner) = self.inner.upgrade() else {
            debug!(id = %record.id(), "store detached; dropping created record");
            return None;
        };
        let mut state = inner.state.write().await;
        let record = state.derived(record);
        match state.position(record.id()) {
            Some(index) => state.records[index] = Arc::clone(&record),
            None => state.records.push(Arc::clone(&record)),
        }
        inner.publish(&state.records).await;
        Some(record)
    }

    /// Replaces the entry with the same id. `None` when detached or absent.
    pub async fn replace(&self, record: E) -> Option<Arc<E>> {
        let Some(inner) = self.inner.upgrade() else {
            debug!(id = %record.id(), "store detached; dropping updated record");
            return None;
        };
        let mut state = inner.state.write().await;
        let Some(index) = state.position(record.id()) else {
            debug!(id = %record.id(), "updated record is no longer loaded");
            return None;
        };
        let record = state.derived(record);
        state.records[index] = Arc::clone(&record);
        inner.publish(&state.records).await;
        Some(record)
    }

    pub async fn remove(&self, id: E::Id) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let mut state = inner.state.write().await;
        let Some(index) = state.position(id) else {
            return false;
        };
        state.records.remove(index);
        inner.publish(&state.records).await;
        true
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
