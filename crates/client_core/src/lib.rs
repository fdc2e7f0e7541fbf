//! Synchronization core of the levels/developers admin console.
//!
//! Each page owns a [`store::RecordStore`] through its [`list::ListController`];
//! forms and delete confirmations mutate that store through weak handles once
//! the [`gateway::EntityGateway`] has accepted the change.

pub mod console;
pub mod dialog;
pub mod entity;
pub mod error;
pub mod form;
pub mod gateway;
pub mod list;
pub mod notify;
pub mod store;
pub mod validation;

pub use console::AdminConsole;
pub use dialog::{ConfirmAction, ConfirmOutcome, ConfirmationDialog, DialogState, DialogView};
pub use entity::{
    developer_count, Developer, DeveloperDraft, DeveloperFields, DeveloperRoster, Entity,
    EntityLabels, Fetched, Level, LevelCatalog, LevelDraft, LevelFields, LevelMember, LevelOption,
};
pub use error::{FormError, GatewayError, ListError};
pub use form::{EntityForm, FormMode, FormSession};
pub use gateway::{EntityGateway, GatewayConfig, HttpGateway};
pub use list::{GridRow, ListController, LoadReport};
pub use notify::{Notification, NotificationLevel, NotificationSink, RecordingNotifier, TracingNotifier};
pub use store::{RecordStore, StoreHandle, StoreObserver};
pub use validation::{FieldError, ValidationErrors};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
