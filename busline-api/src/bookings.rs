use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use busline_core::{Booking, Passenger, RouteId, SeatNumber};

use crate::error::AppError;
use crate::middleware::UserClaims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub route_id: RouteId,
    pub date: NaiveDate,
    pub seats: Vec<SeatNumber>,
    pub passengers: Vec<Passenger>,
}

/// Every route here expects `UserClaims` in the request extensions.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state
        .workflow
        .book(&claims.sub, req.route_id, req.date, req.seats, req.passengers)
        .await?;

    info!("Booking {} created by {}", booking.reference, claims.sub);
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.ledger.list_by_user(&claims.sub).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(owned_booking(&state, &claims, id).await?))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    owned_booking(&state, &claims, id).await?;
    Ok(Json(state.ledger.confirm_payment(id).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    owned_booking(&state, &claims, id).await?;
    Ok(Json(state.ledger.cancel_booking(id).await?))
}

async fn owned_booking(state: &AppState, claims: &UserClaims, id: Uuid) -> Result<Booking, AppError> {
    let booking = state.ledger.get_by_id(id).await?;
    if booking.user_id != claims.sub {
        return Err(AppError::Authorization("Booking does not belong to you".to_string()));
    }
    Ok(booking)
}
