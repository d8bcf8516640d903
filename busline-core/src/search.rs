use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, NaiveTime};

use crate::models::{LayoutClass, Route, RouteId};

#[derive(Debug, Deserialize)]
pub struct RouteSearchRequest {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
}

/// A route as offered for one travel date.
#[derive(Debug, Clone, Serialize)]
pub struct RouteOption {
    pub route_id: RouteId,
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub travel_date: NaiveDate,
    pub departure: NaiveTime,
    pub arrival: NaiveTime,
    pub layout: LayoutClass,
    pub bus_type: String,
    pub price_per_seat: u32,
    pub capacity: u32,
    pub remaining_seats: u32,
}

impl RouteOption {
    pub fn new(route: &Route, travel_date: NaiveDate, booked: usize) -> Self {
        Self {
            route_id: route.id,
            name: route.name.clone(),
            origin: route.origin.clone(),
            destination: route.destination.clone(),
            travel_date,
            departure: route.departure,
            arrival: route.arrival,
            layout: route.layout,
            bus_type: route.bus_type(),
            price_per_seat: route.price_per_seat,
            capacity: route.capacity,
            remaining_seats: route.capacity.saturating_sub(booked as u32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_deserialization() {
        let json = r#"
            {
                "origin": "Mumbai",
                "destination": "Pune",
                "date": "2026-02-01"
            }
        "#;
        let req: RouteSearchRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.origin, "Mumbai");
        assert_eq!(req.date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    }

    #[test]
    fn test_remaining_seats_never_underflows() {
        let route = Route {
            id: 7,
            name: "Night Rider".to_string(),
            origin: "Pune".to_string(),
            destination: "Hyderabad".to_string(),
            departure: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            arrival: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            capacity: 4,
            price_per_seat: 750,
            layout: LayoutClass::Sleeper,
            air_conditioned: true,
            operating_dates: Default::default(),
        };
        let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

        assert_eq!(RouteOption::new(&route, date, 1).remaining_seats, 3);
        assert_eq!(RouteOption::new(&route, date, 9).remaining_seats, 0);
    }
}
