use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::GatewayError;

/// The destructive step a dialog gates.
#[async_trait]
pub trait ConfirmAction: Send + Sync {
    async fn confirm(&self) -> Result<(), GatewayError>;

    fn cancel(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogView {
    pub title: String,
    pub message: String,
    /// Display form of the record the action targets.
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState {
    Closed,
    Open(DialogView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Completed,
    Failed(GatewayError),
    /// Nothing was open; no action ran.
    NotOpen,
    /// The open dialog's action is already running.
    InFlight,
}

struct DialogSlot {
    generation: u64,
    view: DialogView,
    /// Taken when confirm starts so the action can run at most once.
    action: Option<Arc<dyn ConfirmAction>>,
}

/// The single confirmation dialog shared by every page.
///
/// Opening replaces whatever was open. Completion only closes the dialog it
/// was confirmed from; a dialog opened meanwhile stays up.
#[derive(Default)]
pub struct ConfirmationDialog {
    slot: Mutex<Option<DialogSlot>>,
    generation: AtomicU64,
}

impl ConfirmationDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(&self, view: DialogView, action: Arc<dyn ConfirmAction>) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.take() {
            debug!(record = %previous.view.target, "confirmation replaced");
            if let Some(action) = previous.action {
                action.cancel();
            }
        }
        *slot = Some(DialogSlot {
            generation,
            view,
            action: Some(action),
        });
    }

    pub async fn state(&self) -> DialogState {
        match self.slot.lock().await.as_ref() {
            Some(slot) => DialogState::Open(slot.view.clone()),
            None => DialogState::Closed,
        }
    }

    pub async fn is_open(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    pub async fn confirm(&self) -> ConfirmOutcome {
        let (generation, target, action) = {
            let mut slot = self.slot.lock().await;
            let Some(open) = slot.as_mut() else {
                return ConfirmOutcome::NotOpen;
            };
            let Some(action) = open.action.take() else {
                return ConfirmOutcome::InFlight;
            };
            (open.generation, open.view.target.clone(), action)
        };

        info!(record = %target, "confirmed");
        let result = action.confirm().await;

        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|open| open.generation == generation) {
            *slot = None;
        }
        match result {
            Ok(()) => ConfirmOutcome::Completed,
            Err(err) => ConfirmOutcome::Failed(err),
        }
    }

    /// Closes the dialog without running its action. `false` if nothing was open.
    pub async fn cancel(&self) -> bool {
        let Some(closed) = self.slot.lock().await.take() else {
            return false;
        };
        debug!(record = %closed.view.target, "confirmation cancelled");
        if let Some(action) = closed.action {
            action.cancel();
        }
        true
    }
}

#[cfg(test)]
#[path = "tests/dialog_tests.rs"]
mod tests;
