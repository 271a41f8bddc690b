//! Authentication and authorization library for the church API.
//!
//! Identities are frozen into signed tokens at login and decoded again on
//! every request without consulting the account store. The admin gate is the
//! single place mutating operations are authorized.

mod claims;
mod gate;
mod identity;
mod token;

pub use claims::{Claims, Role};
pub use gate::{authorize_admin, is_admin, raw_is_admin};
pub use identity::{decode_identity, encode_identity, validate_username, Identity, IDENTITY_DELIMITER};
pub use token::{authenticate, decode_token, encode_token, issue_token, JwtConfig};
