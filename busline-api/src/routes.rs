use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use futures_util::{future, stream, Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{info, warn};

use busline_booking::SeatMap;
use busline_core::search::{RouteOption, RouteSearchRequest};
use busline_core::{Route, RouteId};

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/routes/search", post(search_routes))
        .route("/v1/routes/{id}", get(get_route))
        .route("/v1/routes/{id}/seats", get(get_seats))
        .route("/v1/routes/{id}/seats/stream", get(stream_seats))
}

#[derive(Debug, Deserialize)]
pub struct SeatQuery {
    pub date: NaiveDate,
}

async fn search_routes(
    State(state): State<AppState>,
    Json(req): Json<RouteSearchRequest>,
) -> Result<Json<Vec<RouteOption>>, AppError> {
    if req.origin.trim().is_empty() || req.destination.trim().is_empty() {
        return Err(AppError::Validation("origin and destination are required".to_string()));
    }
    let options = state.workflow.search(&req).await?;
    Ok(Json(options))
}

async fn get_route(State(state): State<AppState>, Path(id): Path<RouteId>) -> Result<Json<Route>, AppError> {
    Ok(Json(state.catalog.get_route(id).await?))
}

async fn get_seats(
    State(state): State<AppState>,
    Path(id): Path<RouteId>,
    Query(query): Query<SeatQuery>,
) -> Result<Json<SeatMap>, AppError> {
    Ok(Json(state.workflow.availability(id, query.date).await?))
}

/// Current seat map as a `seats` event, then one event per booking change on
/// this route and date.
async fn stream_seats(
    State(state): State<AppState>,
    Path(id): Path<RouteId>,
    Query(query): Query<SeatQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    // Subscribe before reading the snapshot so no change falls in between.
    let rx = state.ledger.events().subscribe();
    let snapshot = state.workflow.availability(id, query.date).await?;
    let date = query.date;

    info!("Seat stream opened for route {} on {}", id, date);

    let updates = BroadcastStream::new(rx).filter_map(move |msg| {
        future::ready(match msg {
            Ok(event) if event.route_id == id && event.travel_date == date => {
                Some(Event::default().event(event.kind.topic()).json_data(&event))
            }
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Seat stream for route {} lagged, {} events dropped", id, skipped);
                None
            }
        })
    });

    let initial = Event::default().event("seats").json_data(&snapshot);
    let stream = stream::once(future::ready(initial)).chain(updates);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
