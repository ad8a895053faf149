use serde::Serialize;
use thiserror::Error;

use crate::flow::FlowState;

/// Structured error payload for agents driving the CLI.
/// Every error says what went wrong and, where possible, how to fix it.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Which form field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

impl ErrorBody {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            field: None,
            docs_hint: None,
        }
    }

    pub fn with_docs_hint(mut self, hint: impl Into<String>) -> Self {
        self.docs_hint = Some(hint.into());
        self
    }
}

/// Error codes used across the workspace
pub mod codes {
    pub const CONFIRMATION_MISMATCH: &str = "confirmation_mismatch";
    pub const INVALID_TRANSITION: &str = "invalid_transition";
    pub const CLOSURE_FAILED: &str = "closure_failed";
    pub const CONNECTION_ERROR: &str = "connection_error";
    pub const CLI_ERROR: &str = "cli_error";
}

/// Name of the form field holding the re-typed contact.
pub const CONFIRMATION_FIELD: &str = "phone_or_email";

/// Field-level validation failure. Recoverable: the user corrects the field and resubmits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("enter your default contact method to confirm")]
    ConfirmationMismatch,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::ConfirmationMismatch => codes::CONFIRMATION_MISMATCH,
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::ConfirmationMismatch => CONFIRMATION_FIELD,
        }
    }

    /// Stable lookup key for the inline message.
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationError::ConfirmationMismatch => "close_account.enter_default_contact_method",
        }
    }
}

impl From<&ValidationError> for ErrorBody {
    fn from(err: &ValidationError) -> Self {
        ErrorBody {
            error: err.code().to_string(),
            message: err.to_string(),
            field: Some(err.field().to_string()),
            docs_hint: Some(
                "Type the email or phone number of the signed-in account exactly as shown \
                 (case does not matter)."
                    .to_string(),
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{operation} is not allowed while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: FlowState,
    },
}

impl From<&FlowError> for ErrorBody {
    fn from(err: &FlowError) -> Self {
        match err {
            FlowError::Validation(inner) => inner.into(),
            FlowError::InvalidTransition { .. } => {
                ErrorBody::new(codes::INVALID_TRANSITION, err.to_string())
            }
        }
    }
}
