//! Error types for the OCM Agent operator
//!
//! "Not found" is deliberately absent: a missing object is an `Ok(None)` from
//! the store, not a failure. Everything here is bubbled to the control loop
//! unmodified so it can apply its own backoff.

use thiserror::Error;

/// Main error type for OCM Agent operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API or transport error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Object store failure that did not come from kube-rs
    #[error("store error [{context}]: {message}")]
    Store {
        /// Store operation that failed (e.g. "get", "create")
        context: String,
        /// Description of what failed
        message: String,
    },

    /// Input violates a contract the caller was expected to uphold
    #[error("validation error for {agent}: {message}")]
    Validation {
        /// Name of the OcmAgent (or object) at fault
        agent: String,
        /// Description of what's invalid
        message: String,
    },

    /// The caller cancelled the pass before or during a store call
    #[error("reconcile cancelled while handling {object}")]
    Cancelled {
        /// Object being reconciled when cancellation was observed
        object: String,
    },
}

impl Error {
    /// Create a store error for the given operation
    pub fn store(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Store {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error for the given agent
    pub fn validation(agent: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            agent: agent.into(),
            message: msg.into(),
        }
    }

    /// Create a cancellation error for the given object
    pub fn cancelled(object: impl Into<String>) -> Self {
        Self::Cancelled {
            object: object.into(),
        }
    }

    /// Whether the control loop should requeue after this error.
    ///
    /// Validation errors need the user to fix the OcmAgent; requeueing them
    /// only produces log noise.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation { .. })
    }

    /// HTTP status code of the underlying API error, if any
    pub fn api_code(&self) -> Option<u16> {
        match self {
            Self::Kube {
                source: kube::Error::Api(ae),
            } => Some(ae.code),
            _ => None,
        }
    }
}
