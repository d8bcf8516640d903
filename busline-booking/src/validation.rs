use chrono::NaiveDate;
use std::collections::HashSet;

use busline_core::{Passenger, Route, SeatNumber};

use crate::error::ValidationError;

/// Seat-set checks: non-empty, in range, distinct, and the route runs that day.
pub fn validate_seats(route: &Route, date: NaiveDate, seats: &[SeatNumber]) -> Result<(), ValidationError> {
    if seats.is_empty() {
        return Err(ValidationError::EmptySeats);
    }
    if !route.operates_on(date) {
        return Err(ValidationError::RouteNotOperating { route_id: route.id, date });
    }

    let mut seen = HashSet::with_capacity(seats.len());
    for &seat in seats {
        if !route.contains_seat(seat) {
            return Err(ValidationError::SeatOutOfRange { seat, capacity: route.capacity });
        }
        if !seen.insert(seat) {
            return Err(ValidationError::DuplicateSeat(seat));
        }
    }

    Ok(())
}

pub fn validate_passengers(seats: &[SeatNumber], passengers: &[Passenger]) -> Result<(), ValidationError> {
    if seats.len() != passengers.len() {
        return Err(ValidationError::PassengerCountMismatch {
            seats: seats.len(),
            passengers: passengers.len(),
        });
    }
    if let Some(index) = passengers.iter().position(|p| p.name.expose().trim().is_empty()) {
        return Err(ValidationError::BlankPassengerName(index + 1));
    }
    Ok(())
}

pub fn validate_request(
    route: &Route,
    date: NaiveDate,
    seats: &[SeatNumber],
    passengers: &[Passenger],
) -> Result<(), ValidationError> {
    validate_seats(route, date, seats)?;
    validate_passengers(seats, passengers)
}
