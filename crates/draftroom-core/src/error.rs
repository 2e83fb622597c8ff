// Error taxonomy shared by every draft operation.

use thiserror::Error;

/// Message shown to callers for fault-class errors.
pub const GENERIC_FAILURE: &str = "internal server error";

#[derive(Debug, Error)]
pub enum DraftError {
    /// A draft, league, roster or player does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request is not valid for the current state.
    #[error("{0}")]
    Validation(String),

    /// The actor is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Stored data violates an engine invariant (e.g. a corrupted order).
    #[error("internal fault: {0}")]
    Fault(String),

    /// The store or a collaborator failed.
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type DraftResult<T> = Result<T, DraftError>;

impl DraftError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DraftError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DraftError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        DraftError::Forbidden(message.into())
    }

    pub fn fault(message: impl Into<String>) -> Self {
        DraftError::Fault(message.into())
    }

    /// Expected errors that carry a message meant for the caller.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            DraftError::NotFound(_) | DraftError::Validation(_) | DraftError::Forbidden(_)
        )
    }

    /// The message to hand back to a caller. Fault-class errors are
    /// reduced to a generic failure.
    pub fn public_message(&self) -> String {
        if self.is_user_facing() {
            self.to_string()
        } else {
            GENERIC_FAILURE.to_string()
        }
    }
}

impl From<rusqlite::Error> for DraftError {
    fn from(err: rusqlite::Error) -> Self {
        DraftError::Storage(anyhow::Error::new(err))
    }
}
