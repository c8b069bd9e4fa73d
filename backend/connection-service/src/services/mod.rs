mod auth_service;
mod review_queue;
mod workflow;

pub use auth_service::{hash_password, AuthService};
pub use review_queue::{parse_filter, ReviewQueue};
pub use workflow::ConnectionWorkflow;

use connection_types::InvalidTransition;

use crate::repository::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Malformed input; the message names the offending field
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The request exists but its current state does not allow the transition
    #[error("connection request {id}: {source}")]
    InvalidTransition {
        id: i64,
        #[source]
        source: InvalidTransition,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
