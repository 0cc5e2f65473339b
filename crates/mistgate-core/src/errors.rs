use std::fmt::Display;

/// Failure taxonomy shared by every mistgate component.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied field is missing or malformed. Never retried.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Unknown content identifier.
    #[error("content not found: {content_id}")]
    NotFound { content_id: String },

    /// The service is not bound to a deployed package (bootstrap state),
    /// or configuration the operation needs is absent.
    #[error("not bound to a deployed package")]
    Unavailable,

    /// A ledger read failed. The access gate converts this into "no
    /// confirmed access"; direct queries surface it as-is.
    #[error("ledger query failed: {reason}")]
    UpstreamQueryFailed { reason: String },

    /// A sponsored submission did not reach a successful terminal state.
    #[error("sponsored execution failed: {cause}")]
    ExecutionFailed { cause: String },
}

impl Error {
    pub fn invalid_input(reason: impl Display) -> Self {
        Error::InvalidInput {
            reason: reason.to_string(),
        }
    }

    pub fn not_found(content_id: impl Into<String>) -> Self {
        Error::NotFound {
            content_id: content_id.into(),
        }
    }

    pub fn upstream(reason: impl Display) -> Self {
        Error::UpstreamQueryFailed {
            reason: reason.to_string(),
        }
    }

    pub fn execution(cause: impl Display) -> Self {
        Error::ExecutionFailed {
            cause: cause.to_string(),
        }
    }

    /// Whether the failure was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput { .. } | Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
