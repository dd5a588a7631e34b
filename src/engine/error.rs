use thiserror::Error;
use uuid::Uuid;

use crate::repository::StorageError;

/// Every way an engine operation can fail.
///
/// Only [`EngineError::Storage`] is transient. The rest are permanent for the
/// same input and must not be retried verbatim.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("cannot {action} {kind} {id} while it is {from}")]
    InvalidTransition {
        kind: &'static str,
        id: Uuid,
        from: String,
        action: &'static str,
    },

    #[error("{action} is not due for extinguisher {id} ({days_remaining} days remaining)")]
    ActionNotDue {
        id: Uuid,
        action: &'static str,
        days_remaining: i64,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }

    /// Short machine-readable tag, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "not_found",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::ActionNotDue { .. } => "action_not_due",
            EngineError::Validation(_) => "validation",
            EngineError::Storage(_) => "storage",
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: Uuid) -> Self {
        EngineError::NotFound { kind, id }
    }

    pub(crate) fn invalid(
        kind: &'static str,
        id: Uuid,
        from: impl ToString,
        action: &'static str,
    ) -> Self {
        EngineError::InvalidTransition {
            kind,
            id,
            from: from.to_string(),
            action,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

pub(crate) fn require_text(field: &str, value: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}
