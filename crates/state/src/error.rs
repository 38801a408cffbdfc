//! Error type shared by every component of the core.

use thiserror::Error;
use wonder_core::OrderStatus;

use crate::store::StoreError;

/// Errors surfaced to callers of the core's operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// The referenced conversation, order, notification or entry does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// An order status change outside the allowed table.
    #[error("invalid order transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status, left unchanged.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// The store refused the write because it is full.
    #[error("storage exhausted writing {key}")]
    StorageExhausted {
        /// Key that could not be written.
        key: String,
    },

    /// Input failed validation; nothing was written.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl StateError {
    /// Shorthand for [`StateError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`StateError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

impl From<StoreError> for StateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Exhausted { key, .. } => Self::StorageExhausted { key },
            other => Self::Store(other),
        }
    }
}

/// Result alias for the core's operations.
pub type Result<T, E = StateError> = std::result::Result<T, E>;
