pub mod auth;

pub use auth::{customer_auth_middleware, UserClaims};
