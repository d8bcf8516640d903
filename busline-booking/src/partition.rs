use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use busline_core::{Booking, KvStore, RouteId, StoreError};

/// Every booking for one route on one date lives in a single document,
/// so claiming seats is one compare-and-swap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub route_id: RouteId,
    pub travel_date: NaiveDate,
}

impl PartitionKey {
    pub fn new(route_id: RouteId, travel_date: NaiveDate) -> Self {
        Self { route_id, travel_date }
    }

    pub fn storage_key(&self) -> String {
        format!("ledger:{}:{}", self.route_id, self.travel_date)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.route_id, self.travel_date)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Partition {
    pub bookings: Vec<Booking>,
}

impl Partition {
    pub fn find(&self, id: Uuid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }
}

/// Partition contents plus the version they were read at. `version` is
/// `None` until the first booking for the key is written.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub version: Option<u64>,
    pub partition: Partition,
}

pub async fn load(store: &dyn KvStore, key: &PartitionKey) -> Result<Snapshot, StoreError> {
    match store.get(&key.storage_key()).await? {
        Some(entry) => Ok(Snapshot {
            version: Some(entry.version),
            partition: serde_json::from_str(&entry.value)?,
        }),
        None => Ok(Snapshot::default()),
    }
}

/// Writes `partition` if nobody else wrote since `version` was read.
pub async fn swap(
    store: &dyn KvStore,
    key: &PartitionKey,
    version: Option<u64>,
    partition: &Partition,
) -> Result<bool, StoreError> {
    let value = serde_json::to_string(partition)?;
    store.compare_and_swap(&key.storage_key(), version, value).await
}

pub fn booking_index_key(id: Uuid) -> String {
    format!("booking:{}", id)
}

pub fn user_index_key(user_id: &str) -> String {
    format!("user:{}:bookings", user_id)
}
