use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::auth::{UserClaims, ROLE_GUEST};
use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/guest", post(login_guest))
}

async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    let claims = UserClaims::new(format!("guest-{}", Uuid::new_v4()), ROLE_GUEST, state.auth.expiration);
    let token = claims.encode(&state.auth)?;

    Ok(Json(AuthResponse {
        token,
        user_id: claims.sub,
    }))
}
