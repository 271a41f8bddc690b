//! JWT claims and role definitions.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator allowed to mutate content and accounts
    Admin,
    /// Any other role string also lands here, so unknown roles never grant admin
    #[serde(other)]
    Editor,
}

impl Default for Role {
    fn default() -> Self {
        Self::Editor
    }
}

impl Role {
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin {
            Self::Admin
        } else {
            Self::Editor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
        }
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Username at issuance time
    pub username: String,
    /// User's role at issuance time
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp), absent for non-expiring tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create claims for an identity.
    pub fn for_identity(
        identity: &Identity,
        issuer: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: identity.user_id.to_string(),
            username: identity.username.clone(),
            role: Role::from_admin_flag(identity.is_admin),
            iat: now,
            exp: expires_in_secs.map(|secs| now + secs),
            iss: issuer.into(),
        }
    }

    /// Check if the claims have expired. Claims without `exp` never expire.
    pub fn is_expired(&self) -> bool {
        match self.exp {
            Some(exp) => chrono::Utc::now().timestamp() > exp,
            None => false,
        }
    }

    /// Check if the user has admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Identity carried by these claims, if the subject is a valid user id.
    pub fn identity(&self) -> Option<Identity> {
        let user_id = self.sub.parse::<i64>().ok().filter(|id| *id > 0)?;
        Some(Identity::new(user_id, self.username.clone(), self.is_admin()))
    }
}
