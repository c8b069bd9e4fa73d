//! Persistence boundary
//!
//! Services talk to `ConnectionStore` / `UserStore`; `PgStore` backs them with PostgreSQL
//! and `MemoryStore` keeps everything in process for tests and local runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use connection_types::ConnectionRequest;

use crate::models::{ConnectionSearch, NewConnection, StateUpdate, UserRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Uniqueness or referential constraint rejected the write
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("stored data is inconsistent: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn person_exists(&self, person_id: i64) -> Result<bool, StoreError>;

    async fn plan_exists(&self, plan_id: i64) -> Result<bool, StoreError>;

    async fn address_exists(&self, address_id: i64) -> Result<bool, StoreError>;

    async fn district_exists(&self, district_id: i64) -> Result<bool, StoreError>;

    /// Write a new request (and its embedded address, if any) in one transaction, assigning
    /// the connection id and the next request number.
    async fn insert(&self, new: NewConnection) -> Result<ConnectionRequest, StoreError>;

    async fn find(&self, id: i64) -> Result<Option<ConnectionRequest>, StoreError>;

    /// Atomic conditional update keyed on (id, expected state). `None` when no row matched.
    async fn transition(&self, update: StateUpdate)
        -> Result<Option<ConnectionRequest>, StoreError>;

    /// One page of matches plus the total match count.
    async fn search(
        &self,
        search: &ConnectionSearch,
    ) -> Result<(Vec<ConnectionRequest>, i64), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_active_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;
}
