//! Signed token issuance and verification.

use error::AuthError;
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use sha2::Sha256;
use std::collections::BTreeMap;

use crate::claims::Claims;
use crate::identity::{decode_identity, Identity};

type HmacSha256 = Hmac<Sha256>;

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token issuer
    pub issuer: String,
    /// Token validity duration in seconds, `None` for tokens without expiry
    pub expires_in_secs: Option<i64>,
    /// Accept tokens whose subject is a flat `id:username:flag` identity
    pub accept_legacy_subject: bool,
}

impl JwtConfig {
    /// Create a new JWT configuration.
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>, expires_in_secs: Option<i64>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            expires_in_secs,
            accept_legacy_subject: true,
        }
    }

    /// Enable or disable the flat-subject compatibility path.
    pub fn with_legacy_subject(mut self, accept: bool) -> Self {
        self.accept_legacy_subject = accept;
        self
    }

    fn key(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|e| {
            tracing::error!("Failed to create HMAC key: {}", e);
            AuthError::TokenCreationFailed
        })
    }
}

/// Encode claims into a JWT token.
pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    let key = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
        tracing::error!("Failed to create HMAC key: {}", e);
        AuthError::TokenCreationFailed
    })?;

    claims.sign_with_key(&key).map_err(|e| {
        tracing::error!("Failed to encode JWT: {}", e);
        AuthError::TokenCreationFailed
    })
}

/// Issue a signed token for an identity.
///
/// The admin flag is frozen into the token; later changes to the account do
/// not affect it.
pub fn issue_token(identity: &Identity, config: &JwtConfig) -> Result<String, AuthError> {
    // Same constraints as the flat encoding, so legacy and structured tokens
    // describe the same set of identities.
    identity.subject()?;

    let claims = Claims::for_identity(identity, config.issuer.clone(), config.expires_in_secs);
    encode_token(&claims, &config.secret)
}

/// Decode and validate a JWT token into the caller identity.
pub fn decode_token(token: &str, config: &JwtConfig) -> Result<Identity, AuthError> {
    let key = config.key().map_err(|_| AuthError::InvalidToken)?;

    let token_claims: BTreeMap<String, serde_json::Value> =
        token.verify_with_key(&key).map_err(|e| {
            tracing::warn!("Failed to decode JWT: {}", e);
            AuthError::InvalidToken
        })?;

    if token_claims.contains_key("role") {
        decode_structured(token_claims, config)
    } else if config.accept_legacy_subject {
        decode_legacy(&token_claims)
    } else {
        tracing::warn!("Rejected token without role claim");
        Err(AuthError::InvalidToken)
    }
}

fn decode_structured(
    token_claims: BTreeMap<String, serde_json::Value>,
    config: &JwtConfig,
) -> Result<Identity, AuthError> {
    let claims: Claims = serde_json::from_value(serde_json::Value::Object(
        token_claims.into_iter().collect(),
    ))
    .map_err(|e| {
        tracing::warn!("Malformed JWT claims: {}", e);
        AuthError::InvalidToken
    })?;

    // Validate issuer
    if claims.iss != config.issuer {
        tracing::warn!("Invalid issuer: expected {}, got {}", config.issuer, claims.iss);
        return Err(AuthError::InvalidToken);
    }

    if claims.is_expired() {
        return Err(AuthError::TokenExpired);
    }

    claims.identity().ok_or(AuthError::MalformedIdentity)
}

fn decode_legacy(token_claims: &BTreeMap<String, serde_json::Value>) -> Result<Identity, AuthError> {
    if let Some(exp) = token_claims.get("exp") {
        let exp = exp.as_i64().ok_or(AuthError::InvalidToken)?;
        if chrono::Utc::now().timestamp() > exp {
            return Err(AuthError::TokenExpired);
        }
    }

    // Legacy refresh tokens never authorized requests.
    if let Some(kind) = token_claims.get("type").and_then(|v| v.as_str()) {
        if kind != "access" {
            tracing::warn!("Rejected legacy token of type {}", kind);
            return Err(AuthError::InvalidToken);
        }
    }

    token_claims
        .get("sub")
        .and_then(|v| v.as_str())
        .and_then(decode_identity)
        .ok_or_else(|| {
            tracing::warn!("Failed to parse legacy identity subject");
            AuthError::MalformedIdentity
        })
}

/// Resolve an optional bearer token into an identity.
///
/// Every failure collapses to `None`, which callers treat as unauthenticated.
pub fn authenticate(bearer: Option<&str>, config: &JwtConfig) -> Option<Identity> {
    let token = bearer.map(str::trim).filter(|t| !t.is_empty())?;
    match decode_token(token, config) {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::warn!("Token rejected: {}", e);
            None
        }
    }
}
