//! `/api/users` handlers. Every handler takes [`Admin`].

use account_service::{AccountChanges, AccountStatus, CreateAccount};
use auth::Role;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::extract::Admin;
use crate::state::AppState;

/// Body of `POST /api/users`
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
    pub status: Option<String>,
}

/// Body of `PUT /api/users/:id`
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub password: Option<String>,
}

fn is_admin_role(role: &str) -> bool {
    role == Role::Admin.as_str()
}

fn is_active_status(status: &str) -> bool {
    status == "active"
}

/// `GET /api/users`
pub async fn list(State(state): State<AppState>, _admin: Admin) -> ApiResult<Json<Value>> {
    let domain = state.accounts.email_domain();
    let users: Vec<_> = state
        .accounts
        .list_accounts()
        .await?
        .iter()
        .map(|account| account.view(domain))
        .collect();
    Ok(Json(json!({ "users": users })))
}

/// `POST /api/users`
pub async fn create(
    State(state): State<AppState>,
    Admin(admin): Admin,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = payload?;
    let username = body.name.or(body.username).unwrap_or_default();

    let account = state
        .accounts
        .create_account(CreateAccount {
            username,
            password: body.password,
            is_admin: body.role.as_deref().is_some_and(is_admin_role),
            active: body.status.as_deref().is_some_and(is_active_status),
        })
        .await?;

    tracing::info!(admin_id = admin.user_id, user_id = account.id, "User created via admin interface");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user": account.view(state.accounts.email_domain()),
        })),
    ))
}

/// `PUT /api/users/:id`
pub async fn update(
    State(state): State<AppState>,
    _admin: Admin,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    let changes = AccountChanges {
        username: body.name,
        is_admin: body.role.as_deref().map(is_admin_role),
        active: body.status.as_deref().map(is_active_status),
        password: body.password,
    };

    let account = state.accounts.update_account(id, changes).await?;
    Ok(Json(json!({
        "message": "User updated successfully",
        "user": account.view(state.accounts.email_domain()),
    })))
}

/// `DELETE /api/users/:id`
pub async fn delete(
    State(state): State<AppState>,
    _admin: Admin,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = path?;
    state.accounts.delete_account(id).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/// `PUT /api/users/:id/status`
pub async fn toggle_status(
    State(state): State<AppState>,
    _admin: Admin,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = path?;
    let account = state.accounts.toggle_status(id).await?;
    Ok(Json(json!({
        "message": "User status updated successfully",
        "user": account.view(state.accounts.email_domain()),
    })))
}
