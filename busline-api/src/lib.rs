use axum::{extract::State, http::Method, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod bookings;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use state::{AppState, AuthConfig};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let protected = bookings::routes().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::customer_auth_middleware,
    ));

    Router::new()
        .route("/health", get(health))
        .nest("/v1/auth", auth::routes())
        .merge(routes::routes())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let routes = state.catalog.list_routes().await.map(|r| r.len()).unwrap_or(0);
    Json(json!({ "status": "ok", "routes": routes }))
}
