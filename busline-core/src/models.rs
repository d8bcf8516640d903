use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

use crate::pii::Masked;

pub type RouteId = u32;
pub type SeatNumber = u32;

/// Vehicle layout. Only changes how seats are numbered on the seat map,
/// inventory is always `1..=capacity`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutClass {
    Seater,
    Sleeper,
}

/// A scheduled bus service between two cities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub departure: NaiveTime,
    pub arrival: NaiveTime,
    pub capacity: u32,
    pub price_per_seat: u32,
    pub layout: LayoutClass,
    #[serde(default = "default_air_conditioned")]
    pub air_conditioned: bool,
    pub operating_dates: BTreeSet<NaiveDate>,
}

fn default_air_conditioned() -> bool {
    true
}

impl Route {
    pub fn operates_on(&self, date: NaiveDate) -> bool {
        self.operating_dates.contains(&date)
    }

    /// Case-insensitive exact match on both endpoints.
    pub fn serves(&self, origin: &str, destination: &str) -> bool {
        self.origin.trim().eq_ignore_ascii_case(origin.trim())
            && self.destination.trim().eq_ignore_ascii_case(destination.trim())
    }

    pub fn contains_seat(&self, seat: SeatNumber) -> bool {
        (1..=self.capacity).contains(&seat)
    }

    pub fn price_for(&self, seat_count: usize) -> u64 {
        seat_count as u64 * u64::from(self.price_per_seat)
    }

    /// Label shown on tickets, e.g. `AC Sleeper`.
    pub fn bus_type(&self) -> String {
        let climate = if self.air_conditioned { "AC" } else { "Non-AC" };
        let layout = match self.layout {
            LayoutClass::Seater => "Seater",
            LayoutClass::Sleeper => "Sleeper",
        };
        format!("{} {}", climate, layout)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// One traveller, one seat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passenger {
    pub name: Masked<String>,
    pub age: u8,
    pub gender: Gender,
}

impl Passenger {
    pub fn new(name: impl Into<String>, age: u8, gender: Gender) -> Self {
        Self {
            name: Masked::new(name.into()),
            age,
            gender,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Created,
    Confirmed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Created => "CREATED",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// A claim on a set of seats for one route on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: Uuid,
    /// Short code shown to travellers, e.g. `BK3F9A0C12D4E5`.
    pub reference: String,
    pub user_id: String,
    pub route_id: RouteId,
    // Copied from the route at booking time so tickets survive catalog edits.
    #[serde(default)]
    pub route_name: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub departure: NaiveTime,
    #[serde(default)]
    pub bus_type: String,
    pub travel_date: NaiveDate,
    pub seats: Vec<SeatNumber>,
    pub passengers: Vec<Passenger>,
    pub total_price: u64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// New booking in `Created` status. Total price is derived from the route.
    pub fn new(
        user_id: String,
        route: &Route,
        travel_date: NaiveDate,
        seats: Vec<SeatNumber>,
        passengers: Vec<Passenger>,
    ) -> Self {
        let id = Uuid::new_v4();
        let total_price = route.price_for(seats.len());
        Self {
            id,
            reference: reference_code(&id),
            user_id,
            route_id: route.id,
            route_name: route.name.clone(),
            origin: route.origin.clone(),
            destination: route.destination.clone(),
            departure: route.departure,
            bus_type: route.bus_type(),
            travel_date,
            seats,
            passengers,
            total_price,
            status: BookingStatus::Created,
            created_at: Utc::now(),
            paid_at: None,
            cancelled_at: None,
        }
    }

    /// Cancelled bookings keep their seat list for audit but hold nothing.
    pub fn holds_seats(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }
}

fn reference_code(id: &Uuid) -> String {
    let simple = id.simple().to_string();
    format!("BK{}", simple[..12].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_route() -> Route {
        Route {
            id: 1,
            name: "Luxury Express".to_string(),
            origin: "Mumbai".to_string(),
            destination: "Pune".to_string(),
            departure: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            arrival: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            capacity: 40,
            price_per_seat: 500,
            layout: LayoutClass::Sleeper,
            air_conditioned: true,
            operating_dates: [NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()].into_iter().collect(),
        }
    }

    #[test]
    fn test_route_matching_ignores_case() {
        let route = sample_route();
        assert!(route.serves("mumbai", "PUNE"));
        assert!(route.serves(" Mumbai ", "pune"));
        assert!(!route.serves("Mumbai", "Pune City"));
        assert!(route.operates_on(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()));
        assert!(!route.operates_on(NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()));
    }

    #[test]
    fn test_new_booking_derives_price_and_reference() {
        let route = sample_route();
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let booking = Booking::new(
            "user-1".to_string(),
            &route,
            date,
            vec![3, 4],
            vec![
                Passenger::new("A", 30, Gender::Female),
                Passenger::new("B", 31, Gender::Male),
            ],
        );

        assert_eq!(booking.total_price, 1000);
        assert_eq!(booking.status, BookingStatus::Created);
        assert!(booking.paid_at.is_none());
        assert!(booking.holds_seats());
        assert_eq!(booking.reference.len(), 14);
        assert!(booking.reference.starts_with("BK"));
    }

    #[test]
    fn test_booking_keeps_route_snapshot() {
        let mut route = sample_route();
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let booking = Booking::new(
            "user-1".to_string(),
            &route,
            date,
            vec![7],
            vec![Passenger::new("A", 30, Gender::Female)],
        );

        route.name = "Renamed".to_string();
        assert_eq!(booking.route_name, "Luxury Express");
        assert_eq!(booking.origin, "Mumbai");
        assert_eq!(booking.destination, "Pune");
        assert_eq!(booking.departure, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(booking.bus_type, "AC Sleeper");
    }

    #[test]
    fn test_bus_type_label() {
        let mut route = sample_route();
        assert_eq!(route.bus_type(), "AC Sleeper");
        route.air_conditioned = false;
        route.layout = LayoutClass::Seater;
        assert_eq!(route.bus_type(), "Non-AC Seater");
    }

    #[test]
    fn test_route_defaults_to_air_conditioned() {
        let json = r#"{
            "id": 9, "name": "Coastal", "origin": "Goa", "destination": "Mangalore",
            "departure": "07:00:00", "arrival": "13:00:00", "capacity": 30,
            "price_per_seat": 450, "layout": "SEATER", "operating_dates": ["2026-02-01"]
        }"#;
        let route: Route = serde_json::from_str(json).unwrap();
        assert!(route.air_conditioned);
        assert_eq!(route.bus_type(), "AC Seater");
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&BookingStatus::Confirmed).unwrap();
        assert_eq!(json, "\"CONFIRMED\"");
        assert_eq!(BookingStatus::Cancelled.to_string(), "CANCELLED");
    }
}
