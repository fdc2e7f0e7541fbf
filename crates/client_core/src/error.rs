use shared::error::FALLBACK_ERROR_MESSAGE;
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Failure of a single REST exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("resource not found at {url}")]
    NotFound { url: String, message: Option<String> },
    #[error("server rejected request to {url} with status {status}")]
    Rejected {
        url: String,
        status: u16,
        message: Option<String>,
    },
    #[error("invalid response body from {url}: {message}")]
    Decode { url: String, message: String },
}

impl GatewayError {
    /// The `error` text the backend put in its failure envelope, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            GatewayError::NotFound { message, .. } | GatewayError::Rejected { message, .. } => {
                message.as_deref()
            }
            GatewayError::Transport { .. } | GatewayError::Decode { .. } => None,
        }
    }

    pub fn user_message(&self) -> String {
        self.server_message()
            .unwrap_or(FALLBACK_ERROR_MESSAGE)
            .to_string()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

#[derive(Debug, Clone, Error)]
pub enum FormError {
    #[error("no form is open")]
    NotOpen,
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, Error)]
pub enum ListError {
    #[error("no record with id {id} is loaded")]
    UnknownRecord { id: String },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
