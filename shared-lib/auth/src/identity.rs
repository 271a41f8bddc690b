//! Flat identity subject codec.
//!
//! An identity is packed as `"{user_id}:{username}:{is_admin}"`. Legacy tokens
//! carry this string as their subject; the codec decodes them.

use std::fmt;

use error::AuthError;
use serde::{Deserialize, Serialize};

/// Field delimiter of the flat identity string.
pub const IDENTITY_DELIMITER: char = ':';

/// Caller identity reconstructed from a verified token.
///
/// Lives for a single request and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account id
    #[serde(rename = "id")]
    pub user_id: i64,
    /// Username at issuance time, descriptive only
    pub username: String,
    /// Admin flag at issuance time, the only authorization signal
    pub is_admin: bool,
}

impl Identity {
    pub fn new(user_id: i64, username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_admin,
        }
    }

    /// Encode this identity as a flat subject string.
    pub fn subject(&self) -> Result<String, AuthError> {
        encode_identity(self.user_id, &self.username, self.is_admin)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{d}{}{d}{}",
            self.user_id,
            self.username,
            render_flag(self.is_admin),
            d = IDENTITY_DELIMITER
        )
    }
}

/// Check a username can round-trip through the flat encoding.
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.is_empty() || username.contains(IDENTITY_DELIMITER) {
        return Err(AuthError::MalformedIdentity);
    }
    Ok(())
}

/// Encode an identity tuple as `"{user_id}:{username}:{True|False}"`.
pub fn encode_identity(user_id: i64, username: &str, is_admin: bool) -> Result<String, AuthError> {
    if user_id <= 0 {
        return Err(AuthError::MalformedIdentity);
    }
    validate_username(username)?;
    Ok(Identity::new(user_id, username, is_admin).to_string())
}

/// Decode a flat identity string.
///
/// Returns `None` for empty input, a field count other than three, or a
/// non-numeric user id. The admin field is true only when it reads `true`
/// case-insensitively; every other value, including empty, is false.
///
/// The id must be a bare decimal integer with an optional sign. Subjects with
/// whitespace around the id (`" 42"`) or digit separators (`"4_2"`) are
/// rejected, even though Python's `int()` accepts them, so such a subject
/// fails closed and the caller is treated as unauthenticated.
pub fn decode_identity(raw: &str) -> Option<Identity> {
    let mut parts = raw.split(IDENTITY_DELIMITER);
    let (id, username, flag) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(id), Some(username), Some(flag), None) => (id, username, flag),
        _ => return None,
    };

    let user_id = id.parse::<i64>().ok()?;

    Some(Identity {
        user_id,
        username: username.to_string(),
        is_admin: flag.eq_ignore_ascii_case("true"),
    })
}

fn render_flag(is_admin: bool) -> &'static str {
    if is_admin {
        "True"
    } else {
        "False"
    }
}
