use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use busline_catalog::layout::{seat_plan, SeatPosition};
use busline_core::{Booking, KvStore, Route, RouteId, SeatNumber, StoreError};

use crate::partition::{self, PartitionKey};

/// Union of the seats held by non-cancelled bookings.
pub fn booked_seats_in(bookings: &[Booking]) -> BTreeSet<SeatNumber> {
    bookings
        .iter()
        .filter(|b| b.holds_seats())
        .flat_map(|b| b.seats.iter().copied())
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Booked,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatState {
    #[serde(flatten)]
    pub position: SeatPosition,
    pub status: SeatStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatMap {
    pub route_id: RouteId,
    pub travel_date: NaiveDate,
    pub booked_seats: Vec<SeatNumber>,
    pub remaining: u32,
    pub seats: Vec<SeatState>,
}

/// Reads the ledger partition for (route, date). A single read of the
/// partition document is a consistent snapshot: writers replace it whole.
#[derive(Clone)]
pub struct AvailabilityCalculator {
    store: Arc<dyn KvStore>,
}

impl AvailabilityCalculator {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn booked_seats(
        &self,
        route_id: RouteId,
        date: NaiveDate,
    ) -> Result<BTreeSet<SeatNumber>, StoreError> {
        let key = PartitionKey::new(route_id, date);
        let snapshot = partition::load(self.store.as_ref(), &key).await?;
        Ok(booked_seats_in(&snapshot.partition.bookings))
    }

    pub async fn seat_map(&self, route: &Route, date: NaiveDate) -> Result<SeatMap, StoreError> {
        let booked = self.booked_seats(route.id, date).await?;

        let seats = seat_plan(route)
            .into_iter()
            .map(|position| {
                let status = if booked.contains(&position.seat) {
                    SeatStatus::Booked
                } else {
                    SeatStatus::Available
                };
                SeatState { position, status }
            })
            .collect();

        Ok(SeatMap {
            route_id: route.id,
            travel_date: date,
            remaining: route.capacity.saturating_sub(booked.len() as u32),
            booked_seats: booked.into_iter().collect(),
            seats,
        })
    }
}
