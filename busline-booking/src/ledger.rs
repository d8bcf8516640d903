use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use uuid::Uuid;

use busline_core::{
    Booking, BookingStatus, KvStore, Passenger, RouteId, RouteRepository, SeatNumber, StoreError,
};
use busline_store::app_config::LedgerConfig;
use busline_store::{BookingEvent, BookingEventKind, EventBus};

use crate::availability::{booked_seats_in, AvailabilityCalculator};
use crate::error::{LedgerError, LedgerResult};
use crate::locks::{PartitionLocks, UserLocks};
use crate::partition::{self, booking_index_key, user_index_key, Partition, PartitionKey};
use crate::validation::validate_request;

/// Authoritative store of bookings. All status changes go through here so the
/// seat-disjointness check cannot be bypassed.
pub struct BookingLedger {
    store: Arc<dyn KvStore>,
    catalog: Arc<dyn RouteRepository>,
    locks: PartitionLocks,
    user_locks: UserLocks,
    events: EventBus,
    lock_timeout: Duration,
    max_cas_retries: u32,
}

impl BookingLedger {
    pub fn new(
        store: Arc<dyn KvStore>,
        catalog: Arc<dyn RouteRepository>,
        events: EventBus,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            locks: PartitionLocks::new(),
            user_locks: UserLocks::new(),
            events,
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            max_cas_retries: config.max_cas_retries.max(1),
        }
    }

    pub fn availability(&self) -> AvailabilityCalculator {
        AvailabilityCalculator::new(self.store.clone())
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Reserves `seats` in status `Created`. The conflict check and the insert
    /// are one compare-and-swap on the (route, date) partition.
    pub async fn create_booking(
        &self,
        user_id: &str,
        route_id: RouteId,
        travel_date: NaiveDate,
        seats: Vec<SeatNumber>,
        passengers: Vec<Passenger>,
    ) -> LedgerResult<Booking> {
        let route = self.catalog.get_route(route_id).await?;
        validate_request(&route, travel_date, &seats, &passengers)?;

        let key = PartitionKey::new(route_id, travel_date);
        let _guard = self.lock(key).await?;

        let mut snapshot = partition::load(self.store.as_ref(), &key).await?;
        check_conflicts(&key, &snapshot.partition, &seats)?;

        let booking = Booking::new(user_id.to_string(), &route, travel_date, seats, passengers);
        // Indexes go first: a dangling index entry resolves to NotFound, while
        // a committed booking without one would be unreachable.
        self.write_indexes(&booking, &key).await?;

        for attempt in 1..=self.max_cas_retries {
            let mut next = snapshot.partition.clone();
            next.bookings.push(booking.clone());

            if partition::swap(self.store.as_ref(), &key, snapshot.version, &next).await? {
                info!(
                    "Booking {} ({}) created for route {} seats {:?}",
                    booking.reference, booking.id, key, booking.seats
                );
                self.publish(BookingEventKind::Created, &booking);
                return Ok(booking);
            }

            warn!("Partition {} changed during booking {} (attempt {})", key, booking.id, attempt);
            snapshot = partition::load(self.store.as_ref(), &key).await?;
            check_conflicts(&key, &snapshot.partition, &booking.seats)?;
        }

        Err(LedgerError::Busy(key.to_string()))
    }

    /// Created -> Confirmed. Repeating the call on a confirmed booking returns
    /// it unchanged, so clients can retry after a lost response.
    pub async fn confirm_payment(&self, id: Uuid) -> LedgerResult<Booking> {
        let key = self.resolve(id).await?;
        let (booking, _) = self
            .transition(key, id, BookingEventKind::Confirmed, |booking| match booking.status {
                BookingStatus::Created => {
                    booking.status = BookingStatus::Confirmed;
                    booking.paid_at = Some(Utc::now());
                    Ok(true)
                }
                BookingStatus::Confirmed => Ok(false),
                BookingStatus::Cancelled => Err(LedgerError::InvalidState {
                    id: booking.id,
                    status: booking.status,
                    action: "confirm payment",
                }),
            })
            .await?;
        Ok(booking)
    }

    /// Created -> Cancelled, releasing the seats. Idempotent on cancelled
    /// bookings; confirmed bookings cannot be cancelled.
    pub async fn cancel_booking(&self, id: Uuid) -> LedgerResult<Booking> {
        let key = self.resolve(id).await?;
        let (booking, _) = self.cancel_in(key, id).await?;
        Ok(booking)
    }

    pub async fn get_by_id(&self, id: Uuid) -> LedgerResult<Booking> {
        let key = self.resolve(id).await?;
        let snapshot = partition::load(self.store.as_ref(), &key).await?;
        snapshot
            .partition
            .find(id)
            .cloned()
            .ok_or(LedgerError::BookingNotFound(id))
    }

    /// Newest first.
    pub async fn list_by_user(&self, user_id: &str) -> LedgerResult<Vec<Booking>> {
        let ids = match self.store.get(&user_index_key(user_id)).await? {
            Some(entry) => serde_json::from_str::<Vec<Uuid>>(&entry.value).map_err(StoreError::from)?,
            None => return Ok(Vec::new()),
        };

        let mut partitions: HashMap<PartitionKey, Partition> = HashMap::new();
        let mut bookings = Vec::with_capacity(ids.len());

        for id in ids {
            let key = match self.resolve(id).await {
                Ok(key) => key,
                Err(LedgerError::BookingNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if !partitions.contains_key(&key) {
                let snapshot = partition::load(self.store.as_ref(), &key).await?;
                partitions.insert(key, snapshot.partition);
            }
            // Index entries for bookings that lost their race have no record.
            if let Some(booking) = partitions.get(&key).and_then(|p| p.find(id)) {
                bookings.push(booking.clone());
            }
        }

        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(bookings)
    }

    /// Cancels unpaid bookings created before `cutoff`. Returns how many were
    /// cancelled.
    pub async fn expire_holds(&self, cutoff: DateTime<Utc>) -> LedgerResult<usize> {
        let mut expired = 0;

        for route in self.catalog.list_routes().await? {
            for date in &route.operating_dates {
                let key = PartitionKey::new(route.id, *date);
                let snapshot = partition::load(self.store.as_ref(), &key).await?;
                let stale: Vec<Uuid> = snapshot
                    .partition
                    .bookings
                    .iter()
                    .filter(|b| b.status == BookingStatus::Created && b.created_at < cutoff)
                    .map(|b| b.id)
                    .collect();

                for id in stale {
                    match self.cancel_in(key, id).await {
                        Ok((_, true)) => {
                            info!("Hold {} on {} expired", id, key);
                            expired += 1;
                        }
                        Ok((_, false)) => {}
                        // Paid in the meantime
                        Err(LedgerError::InvalidState { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        Ok(expired)
    }

    async fn cancel_in(&self, key: PartitionKey, id: Uuid) -> LedgerResult<(Booking, bool)> {
        self.transition(key, id, BookingEventKind::Cancelled, |booking| match booking.status {
            BookingStatus::Created => {
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(Utc::now());
                Ok(true)
            }
            BookingStatus::Cancelled => Ok(false),
            BookingStatus::Confirmed => Err(LedgerError::InvalidState {
                id: booking.id,
                status: booking.status,
                action: "cancel",
            }),
        })
        .await
    }

    /// Applies `apply` to one booking under the partition lock and swaps the
    /// partition. `apply` returns `false` when the booking is already in the
    /// target state, in which case nothing is written.
    async fn transition<F>(
        &self,
        key: PartitionKey,
        id: Uuid,
        kind: BookingEventKind,
        apply: F,
    ) -> LedgerResult<(Booking, bool)>
    where
        F: Fn(&mut Booking) -> LedgerResult<bool>,
    {
        let _guard = self.lock(key).await?;

        for attempt in 1..=self.max_cas_retries {
            let mut snapshot = partition::load(self.store.as_ref(), &key).await?;
            let booking = snapshot
                .partition
                .find_mut(id)
                .ok_or(LedgerError::BookingNotFound(id))?;

            if !apply(booking)? {
                return Ok((booking.clone(), false));
            }
            let updated = booking.clone();

            if partition::swap(self.store.as_ref(), &key, snapshot.version, &snapshot.partition).await? {
                info!("Booking {} is now {}", updated.id, updated.status);
                self.publish(kind, &updated);
                return Ok((updated, true));
            }
            warn!("Partition {} changed while updating {} (attempt {})", key, id, attempt);
        }

        Err(LedgerError::Busy(key.to_string()))
    }

    async fn resolve(&self, id: Uuid) -> LedgerResult<PartitionKey> {
        let entry = self
            .store
            .get(&booking_index_key(id))
            .await?
            .ok_or(LedgerError::BookingNotFound(id))?;
        Ok(serde_json::from_str(&entry.value).map_err(StoreError::from)?)
    }

    async fn write_indexes(&self, booking: &Booking, key: &PartitionKey) -> LedgerResult<()> {
        let location = serde_json::to_string(key).map_err(StoreError::from)?;
        self.store.put(&booking_index_key(booking.id), location).await?;

        // Appends for one user are serialized in this process. A failed
        // swap below means another process appended first.
        let index_key = user_index_key(&booking.user_id);
        let _guard = self.user_locks.acquire_unbounded(booking.user_id.clone()).await;
        loop {
            let (version, mut ids) = match self.store.get(&index_key).await? {
                Some(entry) => (
                    Some(entry.version),
                    serde_json::from_str::<Vec<Uuid>>(&entry.value).map_err(StoreError::from)?,
                ),
                None => (None, Vec::new()),
            };
            ids.push(booking.id);
            let value = serde_json::to_string(&ids).map_err(StoreError::from)?;

            if self.store.compare_and_swap(&index_key, version, value).await? {
                return Ok(());
            }
            warn!("User index {} changed concurrently, retrying", index_key);
        }
    }

    async fn lock(&self, key: PartitionKey) -> LedgerResult<OwnedMutexGuard<()>> {
        self.locks.acquire(key, self.lock_timeout).await.ok_or_else(|| {
            warn!("Timed out waiting for partition {}", key);
            LedgerError::Busy(key.to_string())
        })
    }

    fn publish(&self, kind: BookingEventKind, booking: &Booking) {
        self.events.publish(BookingEvent {
            kind,
            booking_id: booking.id,
            route_id: booking.route_id,
            travel_date: booking.travel_date,
            seats: booking.seats.clone(),
            occurred_at: Utc::now().timestamp(),
        });
    }
}

fn check_conflicts(key: &PartitionKey, partition: &Partition, seats: &[SeatNumber]) -> LedgerResult<()> {
    let booked = booked_seats_in(&partition.bookings);
    let mut conflicting: Vec<SeatNumber> = seats.iter().copied().filter(|s| booked.contains(s)).collect();
    if conflicting.is_empty() {
        return Ok(());
    }
    conflicting.sort_unstable();
    warn!("Seat conflict on {}: {:?}", key, conflicting);
    Err(LedgerError::SeatConflict { seats: conflicting })
}
