use std::sync::Arc;

use busline_booking::{BookingLedger, BookingWorkflow};
use busline_core::RouteRepository;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn RouteRepository>,
    pub ledger: Arc<BookingLedger>,
    pub workflow: Arc<BookingWorkflow>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(catalog: Arc<dyn RouteRepository>, ledger: Arc<BookingLedger>, auth: AuthConfig) -> Self {
        let workflow = Arc::new(BookingWorkflow::new(catalog.clone(), ledger.clone()));
        Self {
            catalog,
            ledger,
            workflow,
            auth,
        }
    }
}
