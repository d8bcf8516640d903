use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Route, RouteId};
use crate::CoreResult;

/// Read access to the route catalog.
#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn search_routes(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> CoreResult<Vec<Route>>;

    /// Fails with `CoreError::RouteNotFound` for unknown ids.
    async fn get_route(&self, id: RouteId) -> CoreResult<Route>;

    async fn list_routes(&self) -> CoreResult<Vec<Route>>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Stored value could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// A stored value together with the version it was written at.
/// Versions start at 1 and grow by one on every successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub version: u64,
    pub value: String,
}

/// Minimal persistence contract the booking ledger is written against.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Versioned>, StoreError>;

    /// Unconditional write. Returns the new version.
    async fn put(&self, key: &str, value: String) -> Result<u64, StoreError>;

    /// Writes `value` only if the key is currently at `expected`
    /// (`None` meaning the key must not exist yet). Returns whether the
    /// write happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: String,
    ) -> Result<bool, StoreError>;
}
