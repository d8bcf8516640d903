use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::mem;
use std::sync::Arc;
use tracing::{debug, info};

use busline_core::search::{RouteOption, RouteSearchRequest};
use busline_core::{Booking, Passenger, RouteId, RouteRepository, SeatNumber};

use crate::availability::SeatMap;
use crate::error::{LedgerError, ValidationError, WorkflowError, WorkflowResult};
use crate::ledger::BookingLedger;
use crate::validation::{validate_passengers, validate_seats};

/// Seats a traveller has picked, plus the seats known to be taken when they
/// were picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub route_id: RouteId,
    pub travel_date: NaiveDate,
    pub seats: Vec<SeatNumber>,
    pub unavailable: BTreeSet<SeatNumber>,
}

impl Selection {
    fn drop_taken(&mut self, taken: &[SeatNumber]) {
        self.seats.retain(|s| !taken.contains(s));
        self.unavailable.extend(taken.iter().copied());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Searching,
    SeatsSelected(Selection),
    PassengersEntered {
        selection: Selection,
        passengers: Vec<Passenger>,
    },
    AwaitingPayment(Booking),
    Confirmed(Booking),
    Abandoned,
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Searching => "searching",
            WorkflowState::SeatsSelected(_) => "seats selected",
            WorkflowState::PassengersEntered { .. } => "passengers entered",
            WorkflowState::AwaitingPayment(_) => "awaiting payment",
            WorkflowState::Confirmed(_) => "confirmed",
            WorkflowState::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Confirmed(_) | WorkflowState::Abandoned)
    }
}

/// One traveller's walk through search, selection, reservation and payment.
/// Nothing is held server-side until `reserve`.
#[derive(Debug, Clone)]
pub struct BookingSession {
    state: WorkflowState,
}

impl BookingSession {
    pub fn new() -> Self {
        Self {
            state: WorkflowState::Searching,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }
}

impl Default for BookingSession {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(state: &WorkflowState, action: &'static str) -> WorkflowError {
    WorkflowError::InvalidTransition {
        from: state.name(),
        action,
    }
}

pub struct BookingWorkflow {
    catalog: Arc<dyn RouteRepository>,
    ledger: Arc<BookingLedger>,
}

impl BookingWorkflow {
    pub fn new(catalog: Arc<dyn RouteRepository>, ledger: Arc<BookingLedger>) -> Self {
        Self { catalog, ledger }
    }

    pub fn ledger(&self) -> &Arc<BookingLedger> {
        &self.ledger
    }

    /// Routes serving the pair on `date`, each with its remaining seat count.
    pub async fn search(&self, request: &RouteSearchRequest) -> WorkflowResult<Vec<RouteOption>> {
        let routes = self
            .catalog
            .search_routes(&request.origin, &request.destination, request.date)
            .await?;

        let availability = self.ledger.availability();
        let mut options = Vec::with_capacity(routes.len());
        for route in &routes {
            let booked = availability.booked_seats(route.id, request.date).await?;
            options.push(RouteOption::new(route, request.date, booked.len()));
        }

        debug!(
            "Search {} -> {} on {}: {} routes",
            request.origin,
            request.destination,
            request.date,
            options.len()
        );
        Ok(options)
    }

    pub async fn availability(&self, route_id: RouteId, date: NaiveDate) -> WorkflowResult<SeatMap> {
        let route = self.catalog.get_route(route_id).await?;
        if !route.operates_on(date) {
            return Err(ValidationError::RouteNotOperating { route_id, date }.into());
        }
        Ok(self.ledger.availability().seat_map(&route, date).await?)
    }

    /// Picks seats without reserving them. Seats that are already taken are
    /// dropped from the selection and recorded as unavailable; the call then
    /// fails with `SeatConflict` so the client can re-pick.
    pub async fn select_seats(
        &self,
        session: &mut BookingSession,
        route_id: RouteId,
        travel_date: NaiveDate,
        seats: Vec<SeatNumber>,
    ) -> WorkflowResult<()> {
        match session.state {
            WorkflowState::Searching
            | WorkflowState::SeatsSelected(_)
            | WorkflowState::PassengersEntered { .. } => {}
            ref other => return Err(invalid(other, "select seats")),
        }

        let route = self.catalog.get_route(route_id).await?;
        validate_seats(&route, travel_date, &seats)?;

        let booked = self.ledger.availability().booked_seats(route_id, travel_date).await?;
        let taken: Vec<SeatNumber> = seats.iter().copied().filter(|s| booked.contains(s)).collect();

        let mut selection = Selection {
            route_id,
            travel_date,
            seats,
            unavailable: booked,
        };

        if taken.is_empty() {
            session.state = WorkflowState::SeatsSelected(selection);
            return Ok(());
        }

        let mut conflicting = taken;
        conflicting.sort_unstable();
        selection.drop_taken(&conflicting);
        session.state = WorkflowState::SeatsSelected(selection);
        Err(LedgerError::SeatConflict { seats: conflicting }.into())
    }

    pub fn enter_passengers(&self, session: &mut BookingSession, passengers: Vec<Passenger>) -> WorkflowResult<()> {
        let selection = match &session.state {
            WorkflowState::SeatsSelected(selection) => selection,
            other => return Err(invalid(other, "enter passengers")),
        };
        if selection.seats.is_empty() {
            return Err(ValidationError::EmptySeats.into());
        }
        validate_passengers(&selection.seats, &passengers)?;

        let selection = selection.clone();
        session.state = WorkflowState::PassengersEntered { selection, passengers };
        Ok(())
    }

    /// Creates the booking. On `SeatConflict` the session goes back to seat
    /// selection with the lost seats marked unavailable.
    pub async fn reserve(&self, session: &mut BookingSession, user_id: &str) -> WorkflowResult<Booking> {
        let (selection, passengers) = match &session.state {
            WorkflowState::PassengersEntered { selection, passengers } => (selection.clone(), passengers.clone()),
            other => return Err(invalid(other, "reserve")),
        };

        let result = self
            .ledger
            .create_booking(
                user_id,
                selection.route_id,
                selection.travel_date,
                selection.seats.clone(),
                passengers,
            )
            .await;

        match result {
            Ok(booking) => {
                info!("Session for {} reserved {}", user_id, booking.reference);
                session.state = WorkflowState::AwaitingPayment(booking.clone());
                Ok(booking)
            }
            Err(LedgerError::SeatConflict { seats }) => {
                let mut selection = selection;
                selection.drop_taken(&seats);
                session.state = WorkflowState::SeatsSelected(selection);
                Err(LedgerError::SeatConflict { seats }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn confirm(&self, session: &mut BookingSession) -> WorkflowResult<Booking> {
        let id = match &session.state {
            WorkflowState::AwaitingPayment(booking) => booking.id,
            WorkflowState::Confirmed(booking) => return Ok(booking.clone()),
            other => return Err(invalid(other, "confirm")),
        };

        let booking = self.ledger.confirm_payment(id).await?;
        session.state = WorkflowState::Confirmed(booking.clone());
        Ok(booking)
    }

    /// Drops the session. A reservation already made stays in the ledger
    /// until it is cancelled or its hold expires.
    pub fn abandon(&self, session: &mut BookingSession) -> WorkflowResult<()> {
        if session.state.is_terminal() {
            return Err(invalid(&session.state, "abandon"));
        }
        let previous = mem::replace(&mut session.state, WorkflowState::Abandoned);
        debug!("Session abandoned while {}", previous.name());
        Ok(())
    }

    /// Select, enter passengers and reserve in one step, for stateless callers.
    pub async fn book(
        &self,
        user_id: &str,
        route_id: RouteId,
        travel_date: NaiveDate,
        seats: Vec<SeatNumber>,
        passengers: Vec<Passenger>,
    ) -> WorkflowResult<Booking> {
        let mut session = BookingSession::new();
        self.select_seats(&mut session, route_id, travel_date, seats).await?;
        self.enter_passengers(&mut session, passengers)?;
        self.reserve(&mut session, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use busline_catalog::CatalogStore;
    use busline_core::{BookingStatus, Gender};
    use busline_store::app_config::LedgerConfig;
    use busline_store::{EventBus, MemoryStore};

    fn feb(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn workflow() -> BookingWorkflow {
        let catalog: Arc<dyn RouteRepository> = Arc::new(CatalogStore::builtin());
        let ledger = BookingLedger::new(
            Arc::new(MemoryStore::new()),
            catalog.clone(),
            EventBus::default(),
            &LedgerConfig::default(),
        );
        BookingWorkflow::new(catalog, Arc::new(ledger))
    }

    fn passengers(n: usize) -> Vec<Passenger> {
        (0..n).map(|i| Passenger::new(format!("Traveller {}", i), 28, Gender::Female)).collect()
    }

    #[tokio::test]
    async fn test_happy_path() {
        let workflow = workflow();
        let mut session = BookingSession::new();

        workflow.select_seats(&mut session, 1, feb(1), vec![5, 6]).await.unwrap();
        assert_eq!(session.state().name(), "seats selected");

        workflow.enter_passengers(&mut session, passengers(2)).unwrap();
        let booking = workflow.reserve(&mut session, "alice").await.unwrap();
        assert_eq!(booking.status, BookingStatus::Created);
        assert_eq!(booking.total_price, 1000);
        assert!(matches!(session.state(), WorkflowState::AwaitingPayment(b) if b.id == booking.id));

        let confirmed = workflow.confirm(&mut session).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert!(session.state().is_terminal());

        // Confirming a confirmed session is a no-op
        assert_eq!(workflow.confirm(&mut session).await.unwrap(), confirmed);
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let workflow = workflow();
        let mut session = BookingSession::new();

        let err = workflow.enter_passengers(&mut session, passengers(1)).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { from: "searching", action: "enter passengers" }));

        let err = workflow.reserve(&mut session, "alice").await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { action: "reserve", .. }));

        let err = workflow.confirm(&mut session).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { action: "confirm", .. }));

        workflow.abandon(&mut session).unwrap();
        assert_eq!(session.state(), &WorkflowState::Abandoned);

        let err = workflow.abandon(&mut session).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { from: "abandoned", .. }));
        let err = workflow.select_seats(&mut session, 1, feb(1), vec![1]).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { from: "abandoned", .. }));
    }

    #[tokio::test]
    async fn test_passengers_must_match_seats() {
        let workflow = workflow();
        let mut session = BookingSession::new();
        workflow.select_seats(&mut session, 2, feb(2), vec![1, 2, 3]).await.unwrap();

        let err = workflow.enter_passengers(&mut session, passengers(2)).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Ledger(LedgerError::Validation(ValidationError::PassengerCountMismatch { seats: 3, passengers: 2 }))
        ));
        assert_eq!(session.state().name(), "seats selected");
    }

    #[tokio::test]
    async fn test_select_taken_seats_marks_them() {
        let workflow = workflow();
        workflow.book("bob", 3, feb(1), vec![2], passengers(1)).await.unwrap();

        let mut session = BookingSession::new();
        let err = workflow.select_seats(&mut session, 3, feb(1), vec![1, 2]).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Ledger(LedgerError::SeatConflict { ref seats }) if seats == &vec![2]));

        match session.state() {
            WorkflowState::SeatsSelected(selection) => {
                assert_eq!(selection.seats, vec![1]);
                assert!(selection.unavailable.contains(&2));
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lost_race_returns_to_selection() {
        let workflow = workflow();
        let mut session = BookingSession::new();
        workflow.select_seats(&mut session, 4, feb(3), vec![7, 8]).await.unwrap();
        workflow.enter_passengers(&mut session, passengers(2)).unwrap();

        // Someone else books seat 8 between selection and reservation
        workflow.book("bob", 4, feb(3), vec![8], passengers(1)).await.unwrap();

        let err = workflow.reserve(&mut session, "alice").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Ledger(LedgerError::SeatConflict { ref seats }) if seats == &vec![8]));

        match session.state() {
            WorkflowState::SeatsSelected(selection) => {
                assert_eq!(selection.seats, vec![7]);
                assert!(selection.unavailable.contains(&8));
            }
            other => panic!("unexpected state {:?}", other),
        }

        // Re-pick and finish
        workflow.select_seats(&mut session, 4, feb(3), vec![7, 9]).await.unwrap();
        workflow.enter_passengers(&mut session, passengers(2)).unwrap();
        assert_eq!(workflow.reserve(&mut session, "alice").await.unwrap().seats, vec![7, 9]);
    }

    #[tokio::test]
    async fn test_abandon_after_reserve_keeps_hold() {
        let workflow = workflow();
        let mut session = BookingSession::new();
        workflow.select_seats(&mut session, 2, feb(1), vec![3]).await.unwrap();
        workflow.enter_passengers(&mut session, passengers(1)).unwrap();
        let booking = workflow.reserve(&mut session, "alice").await.unwrap();

        workflow.abandon(&mut session).unwrap();
        let stored = workflow.ledger().get_by_id(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Created);
    }

    #[tokio::test]
    async fn test_search_reports_remaining_seats() {
        let workflow = workflow();
        workflow.book("bob", 5, feb(3), vec![1, 2, 3], passengers(3)).await.unwrap();

        let request = RouteSearchRequest {
            origin: "pune".to_string(),
            destination: "HYDERABAD".to_string(),
            date: feb(3),
        };
        let options = workflow.search(&request).await.unwrap();
        let remaining: Vec<(RouteId, u32)> = options.iter().map(|o| (o.route_id, o.remaining_seats)).collect();
        assert_eq!(remaining, vec![(4, 40), (5, 37), (6, 40)]);
    }

    #[tokio::test]
    async fn test_availability_requires_operating_date() {
        let workflow = workflow();
        let err = workflow.availability(1, feb(20)).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Ledger(LedgerError::Validation(ValidationError::RouteNotOperating { .. }))
        ));

        let map = workflow.availability(1, feb(1)).await.unwrap();
        assert_eq!(map.remaining, 40);
    }
}
