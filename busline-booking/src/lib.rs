pub mod error;
pub mod validation;
pub mod partition;
pub mod locks;
pub mod availability;
pub mod ledger;
pub mod workflow;
pub mod sweeper;

pub use error::{LedgerError, LedgerResult, ValidationError, WorkflowError, WorkflowResult};
pub use availability::{AvailabilityCalculator, SeatMap, SeatState, SeatStatus};
pub use ledger::BookingLedger;
pub use workflow::{BookingSession, BookingWorkflow, Selection, WorkflowState};
pub use sweeper::spawn_hold_sweeper;
