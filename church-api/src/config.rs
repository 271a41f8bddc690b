//! API configuration.

use auth::JwtConfig;
use db::DbConfig;
use error::DatabaseError;
use serde::{Deserialize, Serialize};

/// Signing secret used when `JWT_SECRET_KEY` is not set.
pub const DEVELOPMENT_JWT_SECRET: &str = "jwt-secret-string";

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:5175",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:5174",
    "http://127.0.0.1:5175",
    "http://127.0.0.1:3000",
];

/// API configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen address
    pub http_addr: String,

    /// HMAC secret for access tokens
    pub jwt_secret: String,

    /// Issuer written into and required from access tokens
    pub jwt_issuer: String,

    /// Token lifetime in seconds, `None` for non-expiring tokens
    pub jwt_expires_secs: Option<i64>,

    /// Accept tokens carrying a flat legacy identity subject
    pub jwt_accept_legacy: bool,

    /// MySQL URL; the in-memory store is used when absent
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    pub db_max_connections: u32,

    /// Domain for derived account emails
    pub email_domain: String,

    /// Allow registration without an admin token once accounts exist
    pub allow_open_registration: bool,

    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,

    /// Service version
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:5000".to_string(),
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            jwt_issuer: "church-api".to_string(),
            jwt_expires_secs: None,
            jwt_accept_legacy: true,
            database_url: None,
            db_max_connections: 10,
            email_domain: account_service::DEFAULT_EMAIL_DOMAIN.to_string(),
            allow_open_registration: false,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

impl ApiConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            config.http_addr = addr;
        }

        if let Some(secret) = var("JWT_SECRET_KEY").filter(|s| !s.is_empty()) {
            config.jwt_secret = secret;
        }

        if let Some(issuer) = var("JWT_ISSUER") {
            config.jwt_issuer = issuer;
        }

        if let Some(expires) = var("JWT_EXPIRES_SECS") {
            if let Ok(n) = expires.parse::<i64>() {
                config.jwt_expires_secs = if n > 0 { Some(n) } else { None };
            }
        }

        if let Some(legacy) = var("JWT_ACCEPT_LEGACY") {
            config.jwt_accept_legacy = parse_flag(&legacy);
        }

        if let Some(url) = var("DATABASE_URL").filter(|s| !s.is_empty()) {
            config.database_url = Some(url);
        }

        if let Some(max) = var("DB_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                config.db_max_connections = n;
            }
        }

        if let Some(domain) = var("EMAIL_DOMAIN") {
            config.email_domain = domain;
        }

        if let Some(open) = var("ALLOW_OPEN_REGISTRATION") {
            config.allow_open_registration = parse_flag(&open);
        }

        if let Some(origins) = var("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        config
    }

    /// Whether the development signing secret is in use
    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEVELOPMENT_JWT_SECRET
    }

    /// Token settings
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(
            self.jwt_secret.clone(),
            self.jwt_issuer.clone(),
            self.jwt_expires_secs,
        )
        .with_legacy_subject(self.jwt_accept_legacy)
    }

    /// Database settings, when a database URL is configured
    pub fn db_config(&self) -> Option<Result<DbConfig, DatabaseError>> {
        self.database_url.as_deref().map(|url| {
            DbConfig::from_url(url).map(|c| c.with_max_connections(self.db_max_connections))
        })
    }
}

// Hand-written so secrets never reach the logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("http_addr", &self.http_addr)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_expires_secs", &self.jwt_expires_secs)
            .field("jwt_accept_legacy", &self.jwt_accept_legacy)
            .field("database", &self.database_url.as_ref().map(|_| "configured"))
            .field("email_domain", &self.email_domain)
            .field("allow_open_registration", &self.allow_open_registration)
            .field("cors_origins", &self.cors_origins)
            .field("version", &self.version)
            .finish()
    }
}
