//! Error taxonomy for the verification workflow core.

use thiserror::Error;

use crate::domain::{ActorId, ActorRole, IncidentId, RequestId, RequestStatus};

/// Errors surfaced by the verification core.
///
/// The service layer never swallows one of these and never adds a failure
/// mode of its own; callers see exactly this taxonomy.
#[derive(Error, Debug)]
pub enum VerificationError {
    /// A required field is missing or malformed; rejected before storage is
    /// touched.
    #[error("validation error: {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// No request with this id exists.
    #[error("verification request not found: {0}")]
    RequestNotFound(RequestId),

    /// The referenced incident does not resolve.
    #[error("incident not found: {0}")]
    IncidentNotFound(IncidentId),

    /// The action is not legal from the request's current status. Never
    /// retried automatically.
    #[error("invalid transition for request {request_id}: cannot {action} from {from}")]
    InvalidTransition {
        request_id: RequestId,
        from: RequestStatus,
        action: &'static str,
    },

    /// Compare-and-set failure: the status changed under a concurrent
    /// transition. The caller may re-read and retry once; the core does not.
    #[error("conflict on request {0}: status changed since it was read")]
    Conflict(RequestId),

    /// The assigner found no reviewer holding the eligible role. The
    /// request stays pending; a staffing condition, not a system fault.
    #[error("no eligible reviewer holds role {0}")]
    NoEligibleReviewer(ActorRole),

    /// The actor lacks the role the action requires.
    #[error("actor {actor} lacks required role for {action}")]
    Forbidden {
        actor: ActorId,
        action: &'static str,
    },

    /// Transient storage fault; safe to retry with backoff. The core never
    /// retries internally so a transition cannot be applied twice.
    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),

    /// Invariant breach inside the core (e.g. a corrupt enum value read
    /// back from storage).
    #[error("internal error: {0}")]
    Internal(String),
}

impl VerificationError {
    /// Whether the caller may reasonably retry the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VerificationError::Conflict(_) | VerificationError::Storage(_)
        )
    }

    pub(crate) fn corrupt_column(column: &str, value: &str) -> Self {
        VerificationError::Internal(format!("corrupt {column} value in storage: {value:?}"))
    }
}

/// Result type for verification core operations.
pub type Result<T> = std::result::Result<T, VerificationError>;
