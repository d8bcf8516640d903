use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

pub const ROLE_GUEST: &str = "GUEST";
pub const ROLE_CUSTOMER: &str = "CUSTOMER";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserClaims {
    /// User id; bookings are owned by this value.
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl UserClaims {
    pub fn new(sub: String, role: &str, ttl_seconds: u64) -> Self {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        Self {
            sub,
            role: role.to_owned(),
            exp: chrono::Utc::now().timestamp().saturating_add(ttl).max(0) as usize,
        }
    }

    pub fn encode(&self, auth: &AuthConfig) -> Result<String, AppError> {
        encode(&Header::default(), self, &EncodingKey::from_secret(auth.secret.as_bytes()))
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }
}

/// Requires a valid HS256 bearer token and puts its claims into the request
/// extensions.
pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| AppError::Authentication("Missing bearer token".to_string()))?;

    let token_data = decode::<UserClaims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        AppError::Authentication("Invalid or expired token".to_string())
    })?;

    let role = token_data.claims.role.as_str();
    if role != ROLE_CUSTOMER && role != ROLE_GUEST {
        return Err(AppError::Authorization(format!("Role {} cannot book", role)));
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
