//! `/api/auth` handlers.

use ::auth::authorize_admin;
use account_service::ProfileChanges;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use error::AuthError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::extract::{Authenticated, Caller};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// `POST /api/auth/register`
///
/// Open while no account exists; afterwards only an admin may register
/// further administrators unless open registration is configured.
pub async fn register(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;

    if !state.settings.allow_open_registration && state.accounts.has_accounts().await? {
        authorize_admin(caller.as_ref())?;
    }

    state.accounts.register(&body.username, &body.password).await?;
    Ok(Json(json!({ "msg": "Admin registered successfully" })))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let outcome = state.accounts.login(&body.username, &body.password).await?;
    Ok(Json(json!({ "access_token": outcome.access_token })))
}

/// `GET /api/auth/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> ApiResult<Json<Value>> {
    let account = state.accounts.profile(&identity).await?;
    Ok(Json(json!(account.profile(state.accounts.email_domain()))))
}

/// `PUT /api/auth/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let account = state
        .accounts
        .update_profile(
            &identity,
            ProfileChanges {
                username: body.username,
                email: body.email,
            },
        )
        .await?;

    Ok(Json(json!({
        "msg": "Profile updated successfully",
        "user": account.profile(state.accounts.email_domain()),
    })))
}

/// `GET /api/auth/verify`
pub async fn verify(Caller(caller): Caller) -> ApiResult<Json<Value>> {
    let identity = caller.ok_or(AuthError::Unauthorized)?;
    Ok(Json(json!({ "valid": true, "user": identity })))
}
