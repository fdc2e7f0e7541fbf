use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    dialog::{ConfirmAction, ConfirmationDialog, DialogView},
    entity::Entity,
    error::{GatewayError, ListError},
    form::EntityForm,
    gateway::EntityGateway,
    notify::{Notification, NotificationSink},
    store::{RecordStore, StoreHandle},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub id: String,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    /// Whether the list response also carried the page context.
    pub with_context: bool,
}

/// One console page: its store, its form, and the delete workflow.
pub struct ListController<E: Entity, G> {
    store: RecordStore<E>,
    gateway: Arc<G>,
    form: EntityForm<E, G>,
    dialog: Arc<ConfirmationDialog>,
    notifier: Arc<dyn NotificationSink>,
    loads_in_flight: AtomicUsize,
    loaded: AtomicBool,
}

impl<E, G> ListController<E, G>
where
    E: Entity,
    G: EntityGateway<E> + 'static,
{
    pub fn new(
        gateway: Arc<G>,
        dialog: Arc<ConfirmationDialog>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let store = RecordStore::new();
        let form = EntityForm::new(gateway.clone(), store.handle(), notifier.clone());
        Self {
            store,
            gateway,
            form,
            dialog,
            notifier,
            loads_in_flight: AtomicUsize::new(0),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &RecordStore<E> {
        &self.store
    }

    pub fn form(&self) -> &EntityForm<E, G> {
        &self.form
    }

    pub fn dialog(&self) -> &Arc<ConfirmationDialog> {
        &self.dialog
    }

    pub fn is_loading(&self) -> bool {
        self.loads_in_flight.load(Ordering::Acquire) > 0
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Replaces the store with a fresh fetch. A failure leaves it as it was.
    pub async fn load(&self) -> Result<LoadReport, GatewayError> {
        self.loads_in_flight.fetch_add(1, Ordering::AcqRel);
        let result = self.gateway.list().await;
        let report = match result {
            Ok(fetched) => {
                let report = LoadReport {
                    rows: fetched.records.len(),
                    with_context: fetched.context.is_some(),
                };
                self.store
                    .replace_all(fetched.records, fetched.context)
                    .await;
                info!(rows = report.rows, with_context = report.with_context, "list loaded");
                Ok(report)
            }
            Err(err) => {
                warn!(error = %err, "list load failed");
                Err(err)
            }
        };
        self.loaded.store(true, Ordering::Release);
        self.loads_in_flight.fetch_sub(1, Ordering::AcqRel);
        report
    }

    pub async fn refresh_context(&self) -> Result<(), GatewayError> {
        match self.gateway.fetch_context().await {
            Ok(context) => {
                self.store.set_context(context).await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "context refresh failed");
                Err(err)
            }
        }
    }

    pub async fn request_create(&self) {
        self.form.open_create().await;
    }

    pub async fn request_edit(&self, id: E::Id) -> Result<(), ListError> {
        let record = self.loaded_record(id).await?;
        self.form.open_update(&record).await;
        Ok(())
    }

    /// Opens the shared dialog; the DELETE only runs if it is confirmed.
    pub async fn request_delete(&self, id: E::Id) -> Result<(), ListError> {
        self.loaded_record(id).await?;
        let view = DialogView {
            title: E::LABELS.delete_title.to_string(),
            message: E::LABELS.delete_message.to_string(),
            target: id.to_string(),
        };
        let action = DeleteRecord {
            id,
            gateway: self.gateway.clone(),
            store: self.store.handle(),
            notifier: self.notifier.clone(),
        };
        self.dialog.open(view, Arc::new(action)).await;
        Ok(())
    }

    /// Grid rows, or `None` until the first load has finished. A reload keeps
    /// showing the current rows.
    pub async fn rows(&self) -> Option<Vec<GridRow>> {
        if !self.is_loaded() {
            return None;
        }
        let rows = self
            .store
            .with_records(|records, context| {
                records
                    .iter()
                    .map(|record| GridRow {
                        id: record.id().to_string(),
                        cells: record.cells(context),
                    })
                    .collect::<Vec<_>>()
            })
            .await;
        Some(rows)
    }

    pub fn columns(&self) -> &'static [&'static str] {
        E::columns()
    }

    async fn loaded_record(&self, id: E::Id) -> Result<Arc<E>, ListError> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| ListError::UnknownRecord { id: id.to_string() })
    }
}

struct DeleteRecord<E: Entity, G> {
    id: E::Id,
    gateway: Arc<G>,
    store: StoreHandle<E>,
    notifier: Arc<dyn NotificationSink>,
}

#[async_trait]
impl<E, G> ConfirmAction for DeleteRecord<E, G>
where
    E: Entity,
    G: EntityGateway<E> + 'static,
{
    async fn confirm(&self) -> Result<(), GatewayError> {
        match self.gateway.delete(self.id).await {
            Ok(()) => {
                self.store.remove(self.id).await;
                info!(id = %self.id, "record removed");
                self.notifier.notify(Notification::success(E::LABELS.removed));
                Ok(())
            }
            Err(err) => {
                warn!(id = %self.id, error = %err, "delete failed");
                self.notifier.notify(Notification::error(err.user_message()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;
