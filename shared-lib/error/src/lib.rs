//! Common error types for the church API workspace.
//!
//! This crate provides unified error handling across the auth library,
//! the account service and the HTTP surface.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code this error should be rendered with.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Auth(err) => err.status_code(),
            AppError::Database(DatabaseError::NotFound) => 404,
            AppError::Database(DatabaseError::DuplicateEntry(_)) => 409,
            AppError::Database(_) => 500,
            AppError::Validation(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::Internal(_) => 500,
        }
    }
}

/// Authentication and authorization errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Malformed identity")]
    MalformedIdentity,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token creation failed")]
    TokenCreationFailed,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Account disabled")]
    AccountDisabled,
}

impl AuthError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Forbidden => 403,
            AuthError::TokenCreationFailed => 500,
            _ => 401,
        }
    }
}

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        let (code, message) = match err {
            AuthError::InvalidCredentials => ("AUTH_INVALID_CREDENTIALS", "Invalid credentials"),
            AuthError::MalformedIdentity => ("AUTH_MALFORMED_IDENTITY", "Invalid token format"),
            AuthError::InvalidToken => ("AUTH_INVALID_TOKEN", "Invalid token"),
            AuthError::TokenExpired => ("AUTH_TOKEN_EXPIRED", "Token has expired"),
            AuthError::TokenCreationFailed => ("AUTH_TOKEN_CREATION_FAILED", "Failed to create token"),
            AuthError::Unauthorized => ("AUTH_UNAUTHORIZED", "Unauthorized"),
            AuthError::Forbidden => ("AUTH_FORBIDDEN", "Admins only"),
            AuthError::AccountDisabled => ("AUTH_ACCOUNT_DISABLED", "Account is disabled"),
        };
        Self::new(code, message)
    }
}

impl From<&DatabaseError> for ErrorResponse {
    fn from(err: &DatabaseError) -> Self {
        let (code, message) = match err {
            DatabaseError::ConnectionFailed(_) => ("DB_CONNECTION_FAILED", "Database connection failed"),
            DatabaseError::QueryFailed(_) => ("DB_QUERY_FAILED", "Database query failed"),
            DatabaseError::NotFound => ("DB_NOT_FOUND", "Record not found"),
            DatabaseError::DuplicateEntry(_) => ("DB_DUPLICATE_ENTRY", "Duplicate entry"),
            DatabaseError::TransactionFailed(_) => ("DB_TRANSACTION_FAILED", "Transaction failed"),
        };
        Self::new(code, message)
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Auth(e) => e.into(),
            AppError::Database(e) => e.into(),
            AppError::Validation(msg) => Self::new("VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => Self::new("NOT_FOUND", msg.clone()),
            AppError::Conflict(msg) => Self::new("CONFLICT", msg.clone()),
            // Internal details stay in the logs.
            AppError::Internal(_) => Self::new("INTERNAL_ERROR", "Internal server error"),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_status_codes() {
        assert_eq!(AppError::from(AuthError::Forbidden).status_code(), 403);
        assert_eq!(AppError::from(AuthError::Unauthorized).status_code(), 401);
        assert_eq!(AppError::from(AuthError::MalformedIdentity).status_code(), 401);
        assert_eq!(AppError::from(AuthError::TokenCreationFailed).status_code(), 500);
    }

    #[test]
    fn test_database_status_codes() {
        assert_eq!(AppError::from(DatabaseError::NotFound).status_code(), 404);
        assert_eq!(
            AppError::from(DatabaseError::DuplicateEntry("username".into())).status_code(),
            409
        );
        assert_eq!(
            AppError::from(DatabaseError::QueryFailed("boom".into())).status_code(),
            500
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection string leaked".to_string());
        let body = ErrorResponse::from(&err);
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(!body.message.contains("leaked"));
        assert!(body.details.is_none());
    }

    #[test]
    fn test_forbidden_body() {
        let body = ErrorResponse::from(&AppError::Auth(AuthError::Forbidden));
        assert_eq!(body.code, "AUTH_FORBIDDEN");
        assert_eq!(body.message, "Admins only");
    }
}
