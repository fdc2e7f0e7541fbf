use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    entity::Entity,
    error::FormError,
    gateway::EntityGateway,
    notify::{Notification, NotificationSink},
    store::StoreHandle,
    validation::ValidationErrors,
};

/// Chosen when the form opens and fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode<Id> {
    Create,
    Update(Id),
}

#[derive(Debug, Clone)]
pub struct FormSession<E: Entity> {
    pub mode: FormMode<E::Id>,
    pub draft: E::Draft,
    /// Violations from the last rejected submit.
    pub errors: ValidationErrors,
}

struct OpenForm<E: Entity> {
    generation: u64,
    session: FormSession<E>,
}

/// Create/update form of one page.
pub struct EntityForm<E: Entity, G> {
    gateway: Arc<G>,
    store: StoreHandle<E>,
    notifier: Arc<dyn NotificationSink>,
    open: Mutex<Option<OpenForm<E>>>,
    generation: AtomicU64,
}

impl<E, G> EntityForm<E, G>
where
    E: Entity,
    G: EntityGateway<E>,
{
    pub fn new(gateway: Arc<G>, store: StoreHandle<E>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            gateway,
            store,
            notifier,
            open: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn open_create(&self) {
        self.open_with(FormMode::Create, E::Draft::default()).await;
    }

    pub async fn open_update(&self, record: &E) {
        self.open_with(FormMode::Update(record.id()), record.to_draft())
            .await;
    }

    async fn open_with(&self, mode: FormMode<E::Id>, draft: E::Draft) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(?mode, generation, "form opened");
        *self.open.lock().await = Some(OpenForm {
            generation,
            session: FormSession {
                mode,
                draft,
                errors: ValidationErrors::new(),
            },
        });
    }

    pub async fn is_open(&self) -> bool {
        self.open.lock().await.is_some()
    }

    pub async fn session(&self) -> Option<FormSession<E>> {
        self.open
            .lock()
            .await
            .as_ref()
            .map(|open| open.session.clone())
    }

    pub async fn edit(&self, change: impl FnOnce(&mut E::Draft)) -> Result<(), FormError> {
        let mut open = self.open.lock().await;
        let open = open.as_mut().ok_or(FormError::NotOpen)?;
        change(&mut open.session.draft);
        Ok(())
    }

    /// Checks the current draft against the page context without submitting.
    pub async fn validate(&self) -> Result<E::Fields, FormError> {
        let draft = {
            let open = self.open.lock().await;
            let open = open.as_ref().ok_or(FormError::NotOpen)?;
            open.session.draft.clone()
        };
        let context = self.store.context().await.unwrap_or_default();
        Ok(E::validate(&draft, &context)?)
    }

    /// Validates, sends, and reconciles the store with the server's record.
    ///
    /// On any failure the form stays open and the store is untouched. Success
    /// closes the form unless it was re-opened while the request was in flight.
    pub async fn submit(&self) -> Result<Arc<E>, FormError> {
        let (generation, mode, draft) = {
            let open = self.open.lock().await;
            let open = open.as_ref().ok_or(FormError::NotOpen)?;
            (open.generation, open.session.mode, open.session.draft.clone())
        };

        let context = self.store.context().await.unwrap_or_default();
        let fields = match E::validate(&draft, &context) {
            Ok(fields) => fields,
            Err(errors) => {
                debug!(?mode, %errors, "draft rejected");
                let mut open = self.open.lock().await;
                if let Some(open) = open.as_mut().filter(|open| open.generation == generation) {
                    open.session.errors = errors.clone();
                }
                return Err(errors.into());
            }
        };

        let result = match mode {
            FormMode::Create => self.gateway.create(&fields).await,
            FormMode::Update(id) => self.gateway.update(id, &fields).await,
        };
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                warn!(?mode, error = %err, "submit failed");
                self.notifier.notify(Notification::error(err.user_message()));
                return Err(err.into());
            }
        };

        let id = record.id();
        let reconciled = match mode {
            FormMode::Create => self.store.append(record.clone()).await,
            FormMode::Update(_) => self.store.replace(record.clone()).await,
        };
        let record = reconciled.unwrap_or_else(|| {
            let mut record = record;
            record.derive(&context);
            Arc::new(record)
        });

        let message = match mode {
            FormMode::Create => E::LABELS.created,
            FormMode::Update(_) => E::LABELS.updated,
        };
        info!(?mode, %id, "record saved");
        self.notifier.notify(Notification::success(message));

        let mut open = self.open.lock().await;
        if open.as_ref().is_some_and(|open| open.generation == generation) {
            *open = None;
        }
        Ok(record)
    }

    /// Discards the draft. The store is never touched.
    pub async fn cancel(&self) {
        if self.open.lock().await.take().is_some() {
            debug!("form cancelled");
        }
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
