//! Admin authorization gate.
//!
//! Every state-mutating operation asks the gate before touching storage.
//! Denials are logged here and nowhere else.

use error::AuthError;

use crate::identity::{decode_identity, Identity};

/// True only when an identity is present and carries the admin flag.
pub fn is_admin(identity: Option<&Identity>) -> bool {
    authorize_admin(identity).is_ok()
}

/// Gate over a raw identity subject.
///
/// Equivalent to decoding `raw` and checking the admin flag; any decode
/// failure or missing subject yields `false`.
pub fn raw_is_admin(raw: Option<&str>) -> bool {
    let identity = raw.and_then(decode_identity);
    is_admin(identity.as_ref())
}

/// Admin check that tells the caller why it was denied.
///
/// A missing identity is `Unauthorized`, a non-admin identity is `Forbidden`.
pub fn authorize_admin(identity: Option<&Identity>) -> Result<&Identity, AuthError> {
    match identity {
        Some(identity) if identity.is_admin => Ok(identity),
        Some(identity) => {
            tracing::warn!(
                target: "auth::gate",
                user_id = identity.user_id,
                username = %identity.username,
                "Admin access denied: caller is not an administrator"
            );
            Err(AuthError::Forbidden)
        }
        None => {
            tracing::warn!(target: "auth::gate", "Admin access denied: no authenticated caller");
            Err(AuthError::Unauthorized)
        }
    }
}
