use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use busline_booking::{LedgerError, WorkflowError};
use busline_core::{CoreError, SeatNumber};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Seats already booked: {0:?}")]
    SeatConflict(Vec<SeatNumber>),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Busy(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, json!({ "error": message })),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, json!({ "error": message })),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            AppError::SeatConflict(seats) => (
                StatusCode::CONFLICT,
                json!({ "error": message, "conflicting_seats": seats }),
            ),
            AppError::Conflict(_) => (StatusCode::CONFLICT, json!({ "error": message })),
            AppError::Busy(_) => (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": message })),
            AppError::Internal(_) => {
                tracing::error!("Internal Server Error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(e) => AppError::Validation(e.to_string()),
            LedgerError::SeatConflict { seats } => AppError::SeatConflict(seats),
            e @ (LedgerError::RouteNotFound(_) | LedgerError::BookingNotFound(_)) => AppError::NotFound(e.to_string()),
            e @ LedgerError::InvalidState { .. } => AppError::Conflict(e.to_string()),
            e @ LedgerError::Busy(_) => AppError::Busy(e.to_string()),
            LedgerError::Storage(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Ledger(e) => e.into(),
            e @ WorkflowError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            e @ CoreError::RouteNotFound(_) => AppError::NotFound(e.to_string()),
        }
    }
}
