use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeSet;

use busline_core::{LayoutClass, Route, RouteId};

const SEED_CAPACITY: u32 = 40;

/// The default schedule used when no seed file is configured.
pub fn builtin_routes() -> Vec<Route> {
    vec![
        route(1, "Luxury Express", "Mumbai", "Pune", (6, 0), (9, 30), 500, LayoutClass::Sleeper),
        route(2, "Comfort Travels", "Mumbai", "Pune", (8, 0), (11, 30), 400, LayoutClass::Seater),
        route(3, "Super Deluxe", "Delhi", "Jaipur", (10, 0), (15, 0), 600, LayoutClass::Sleeper),
        route(4, "Swift Travels", "Pune", "Hyderabad", (19, 0), (6, 30), 800, LayoutClass::Sleeper),
        route(5, "City Express", "Pune", "Hyderabad", (20, 0), (7, 30), 700, LayoutClass::Seater),
        route(6, "Night Rider", "Pune", "Hyderabad", (21, 0), (8, 0), 750, LayoutClass::Sleeper),
    ]
}

fn seed_dates() -> BTreeSet<NaiveDate> {
    (1..=5)
        .filter_map(|day| NaiveDate::from_ymd_opt(2026, 2, day))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn route(
    id: RouteId,
    name: &str,
    origin: &str,
    destination: &str,
    departure: (u32, u32),
    arrival: (u32, u32),
    price_per_seat: u32,
    layout: LayoutClass,
) -> Route {
    Route {
        id,
        name: name.to_string(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        departure: NaiveTime::from_hms_opt(departure.0, departure.1, 0).unwrap_or_default(),
        arrival: NaiveTime::from_hms_opt(arrival.0, arrival.1, 0).unwrap_or_default(),
        capacity: SEED_CAPACITY,
        price_per_seat,
        layout,
        air_conditioned: true,
        operating_dates: seed_dates(),
    }
}
