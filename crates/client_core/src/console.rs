use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    dialog::ConfirmationDialog,
    entity::{Developer, DeveloperRoster, Level},
    error::GatewayError,
    gateway::EntityGateway,
    list::ListController,
    notify::NotificationSink,
    store::{StoreHandle, StoreObserver},
};

/// Keeps level counts in step with the developers page.
struct LevelCounts {
    levels: StoreHandle<Level>,
}

#[async_trait]
impl StoreObserver<Developer> for LevelCounts {
    async fn records_changed(&self, developers: &[Arc<Developer>]) {
        let developers: Vec<Developer> = developers
            .iter()
            .map(|developer| developer.as_ref().clone())
            .collect();
        if self
            .levels
            .set_context(DeveloperRoster::from_developers(&developers))
            .await
        {
            debug!(developers = developers.len(), "level counts re-derived");
        }
    }
}

/// Composition root: both pages over one gateway, one dialog and one sink.
pub struct AdminConsole<G> {
    levels: ListController<Level, G>,
    developers: ListController<Developer, G>,
    dialog: Arc<ConfirmationDialog>,
    notifier: Arc<dyn NotificationSink>,
}

impl<G> AdminConsole<G>
where
    G: EntityGateway<Level> + EntityGateway<Developer> + 'static,
{
    pub fn new(gateway: Arc<G>, notifier: Arc<dyn NotificationSink>) -> Self {
        let dialog = Arc::new(ConfirmationDialog::new());
        let levels = ListController::new(gateway.clone(), dialog.clone(), notifier.clone());
        let developers = ListController::new(gateway, dialog.clone(), notifier.clone());
        developers.store().observe(Arc::new(LevelCounts {
            levels: levels.store().handle(),
        }));
        Self {
            levels,
            developers,
            dialog,
            notifier,
        }
    }

    pub fn levels(&self) -> &ListController<Level, G> {
        &self.levels
    }

    pub fn developers(&self) -> &ListController<Developer, G> {
        &self.developers
    }

    pub fn dialog(&self) -> &Arc<ConfirmationDialog> {
        &self.dialog
    }

    pub fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.notifier
    }

    /// Loads levels. Counts come from nested developers when the response has
    /// them, otherwise from a separate developer fetch.
    pub async fn open_levels(&self) -> Result<(), GatewayError> {
        let report = self.levels.load().await?;
        if !report.with_context {
            self.levels.refresh_context().await?;
        }
        Ok(())
    }

    /// Loads developers and the level catalog concurrently. Either half may
    /// fail without discarding the other.
    pub async fn open_developers(&self) -> Result<(), GatewayError> {
        let (rows, catalog) = tokio::join!(self.developers.load(), self.developers.refresh_context());
        match (rows, catalog) {
            (Ok(report), Ok(())) => {
                info!(rows = report.rows, "developers page ready");
                Ok(())
            }
            (Err(err), _) | (_, Err(err)) => Err(err),
        }
    }

    /// Re-derives level counts from a fresh developer fetch.
    pub async fn refresh_level_counts(&self) -> Result<(), GatewayError> {
        self.levels.refresh_context().await
    }

    /// Re-derives level counts from the developers page without a fetch,
    /// replacing any roster a later level load brought with it.
    pub async fn sync_level_counts(&self) {
        if !self.developers.is_loaded() {
            warn!("developers not loaded; level counts left as they are");
            return;
        }
        let developers: Vec<Developer> = self
            .developers
            .store()
            .snapshot()
            .await
            .iter()
            .map(|developer| developer.as_ref().clone())
            .collect();
        self.levels
            .store()
            .set_context(DeveloperRoster::from_developers(&developers))
            .await;
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
