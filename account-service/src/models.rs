//! Account models
//!
//! Domain models for the admin accounts of the church website.

use auth::{Identity, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest username the `user` table accepts.
pub const MAX_USERNAME_LEN: usize = 80;

/// Stored account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub is_admin: bool,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    /// Identity to freeze into a token at login
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.username.clone(), self.is_admin)
    }

    pub fn role(&self) -> Role {
        Role::from_admin_flag(self.is_admin)
    }

    /// Stored email, or the derived `{username}@{domain}` address
    pub fn email_or_default(&self, domain: &str) -> String {
        self.email
            .clone()
            .unwrap_or_else(|| format!("{}@{}", self.username, domain))
    }

    /// Row shape of the admin user listing
    pub fn view(&self, domain: &str) -> AccountView {
        AccountView {
            id: self.id,
            name: self.username.clone(),
            email: self.email_or_default(domain),
            role: self.role(),
            status: AccountStatus::from_active(self.active),
            last_login: self.last_login.map(|t| t.format("%Y-%m-%d").to_string()),
        }
    }

    /// Shape returned to the account owner
    pub fn profile(&self, domain: &str) -> ProfileView {
        ProfileView {
            id: self.id,
            username: self.username.clone(),
            email: self.email_or_default(domain),
            is_admin: self.is_admin,
            active: self.active,
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// Account to be inserted
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub is_admin: bool,
    pub active: bool,
}

/// Account status as shown in the admin interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn from_active(active: bool) -> Self {
        if active {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        *self == Self::Active
    }
}

/// Admin listing row
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(rename = "lastLogin")]
    pub last_login: Option<String>,
}

/// Own-profile view
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Account creation request from the admin interface
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub username: String,
    pub password: String,
    pub is_admin: bool,
    pub active: bool,
}

/// Partial account update from the admin interface
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub is_admin: Option<bool>,
    pub active: Option<bool>,
    pub password: Option<String>,
}

/// Partial update of the caller's own profile
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
}
