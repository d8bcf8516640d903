use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use busline_core::{RouteId, SeatNumber};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEventKind {
    Created,
    Confirmed,
    Cancelled,
}

impl BookingEventKind {
    pub fn topic(&self) -> &'static str {
        match self {
            BookingEventKind::Created => "booking.created",
            BookingEventKind::Confirmed => "booking.confirmed",
            BookingEventKind::Cancelled => "booking.cancelled",
        }
    }
}

/// Emitted after a ledger write commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: Uuid,
    pub route_id: RouteId,
    pub travel_date: NaiveDate,
    pub seats: Vec<SeatNumber>,
    pub occurred_at: i64,
}

/// In-process fan-out of booking events to live subscribers (seat map streams).
/// Publishing never blocks and never fails the write that produced the event.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BookingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: BookingEvent) {
        let topic = event.kind.topic();
        let booking_id = event.booking_id;
        match self.tx.send(event) {
            Ok(receivers) => info!("Published {} for {} to {} subscribers", topic, booking_id, receivers),
            Err(_) => debug!("No subscribers for {} ({})", topic, booking_id),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
