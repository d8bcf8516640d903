pub mod models;
pub mod search;
pub mod repository;
pub mod pii;

pub use models::{Booking, BookingStatus, Gender, LayoutClass, Passenger, Route, RouteId, SeatNumber};
pub use repository::{KvStore, RouteRepository, StoreError, Versioned};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Route not found: {0}")]
    RouteNotFound(RouteId),
}

pub type CoreResult<T> = Result<T, CoreError>;
