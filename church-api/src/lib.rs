//! HTTP API for the church website admin.
//!
//! Exposes authentication and account management over axum. The binary in
//! `main.rs` wires configuration, storage and logging around [`build_router`].

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use crate::config::ApiConfig;
pub use crate::error::{ApiError, ApiResult};
pub use crate::extract::{Admin, Authenticated, Caller};
pub use crate::router::build_router;
pub use crate::state::AppState;
