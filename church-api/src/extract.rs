//! Request extractors resolving the caller's identity.
//!
//! `Admin` is the only way a handler obtains an administrator; the admin
//! check runs before the handler body does.

use auth::{authenticate, authorize_admin, Identity};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use error::AuthError;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

/// Caller identity, `None` when absent or unverifiable
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Caller(authenticate(bearer_token(parts), state.jwt())))
    }
}

/// Any authenticated caller
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Caller(identity) = Caller::from_request_parts(parts, state).await?;
        identity
            .map(Authenticated)
            .ok_or_else(|| AuthError::Unauthorized.into())
    }
}

/// Caller whose token carries the admin flag
#[derive(Debug, Clone)]
pub struct Admin(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Caller(identity) = Caller::from_request_parts(parts, state).await?;
        let admin = authorize_admin(identity.as_ref())?;
        Ok(Admin(admin.clone()))
    }
}
