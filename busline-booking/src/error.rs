use chrono::NaiveDate;
use uuid::Uuid;

use busline_core::{BookingStatus, CoreError, RouteId, SeatNumber, StoreError};

/// Malformed booking input. Always detected before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("At least one seat must be requested")]
    EmptySeats,

    #[error("Seat {seat} is outside 1..={capacity}")]
    SeatOutOfRange { seat: SeatNumber, capacity: u32 },

    #[error("Seat {0} requested more than once")]
    DuplicateSeat(SeatNumber),

    #[error("Expected one passenger per seat: {seats} seats, {passengers} passengers")]
    PassengerCountMismatch { seats: usize, passengers: usize },

    #[error("Passenger #{0} has no name")]
    BlankPassengerName(usize),

    #[error("Route {route_id} does not operate on {date}")]
    RouteNotOperating { route_id: RouteId, date: NaiveDate },
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Seats already booked: {seats:?}")]
    SeatConflict { seats: Vec<SeatNumber> },

    #[error("Route not found: {0}")]
    RouteNotFound(RouteId),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Booking {id} is {status}, cannot {action}")]
    InvalidState {
        id: Uuid,
        status: BookingStatus,
        action: &'static str,
    },

    #[error("Ledger partition {0} is busy, retry later")]
    Busy(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RouteNotFound(id) => LedgerError::RouteNotFound(id),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
}

impl From<ValidationError> for WorkflowError {
    fn from(err: ValidationError) -> Self {
        WorkflowError::Ledger(LedgerError::Validation(err))
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        WorkflowError::Ledger(LedgerError::Storage(err))
    }
}

impl From<CoreError> for WorkflowError {
    fn from(err: CoreError) -> Self {
        WorkflowError::Ledger(err.into())
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
