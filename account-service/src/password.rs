//! Password hashing and verification.
//!
//! New hashes are Argon2id PHC strings. Rows written by the Werkzeug-based
//! backend hold `pbkdf2:<digest>:<iterations>$salt$hex` or
//! `scrypt:<n>:<r>:<p>$salt$hex`; those still verify and are replaced with
//! Argon2id on the next successful login.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use error::AppError;
use sha2::{Sha256, Sha512};

/// Hash a password into a PHC string safe for storage.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored hash.
///
/// Accepts Argon2 PHC strings and Werkzeug `pbkdf2:`/`scrypt:` hashes. Any
/// other stored value never matches.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    if let Ok(parsed_hash) = PasswordHash::new(password_hash) {
        return match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::Internal(format!(
                "Password verification failed: {}",
                e
            ))),
        };
    }

    match WerkzeugHash::parse(password_hash) {
        Some(hash) => Ok(hash.verify(password)),
        None => {
            tracing::warn!("Stored password hash has an unsupported format");
            Ok(false)
        }
    }
}

/// Whether a stored hash should be replaced with a fresh Argon2id hash.
pub fn needs_rehash(password_hash: &str) -> bool {
    !password_hash.starts_with("$argon2id$")
}

/// Hash on the blocking pool so request workers are not stalled.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
}

/// Blocking-pool variant of [`verify_password`].
pub async fn verify_password_blocking(password: String, password_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kdf {
    Pbkdf2Sha256 { iterations: u32 },
    Pbkdf2Sha512 { iterations: u32 },
    Scrypt { log_n: u8, r: u32, p: u32 },
}

/// Werkzeug `method$salt$hexdigest` hash.
#[derive(Debug)]
struct WerkzeugHash<'a> {
    kdf: Kdf,
    salt: &'a str,
    expected: Vec<u8>,
}

impl<'a> WerkzeugHash<'a> {
    fn parse(stored: &'a str) -> Option<Self> {
        let mut parts = stored.splitn(3, '$');
        let (method, salt, digest) = (parts.next()?, parts.next()?, parts.next()?);
        if salt.is_empty() {
            return None;
        }
        let expected = hex::decode(digest).ok().filter(|d| !d.is_empty())?;

        let fields: Vec<&str> = method.split(':').collect();
        let kdf = match fields.as_slice() {
            ["pbkdf2", digest, iterations] => {
                let iterations = iterations.parse::<u32>().ok().filter(|i| *i > 0)?;
                match *digest {
                    "sha256" => Kdf::Pbkdf2Sha256 { iterations },
                    "sha512" => Kdf::Pbkdf2Sha512 { iterations },
                    _ => return None,
                }
            }
            ["scrypt", n, r, p] => {
                let n = n.parse::<u64>().ok().filter(|n| *n > 1 && n.is_power_of_two())?;
                Kdf::Scrypt {
                    log_n: n.trailing_zeros() as u8,
                    r: r.parse().ok()?,
                    p: p.parse().ok()?,
                }
            }
            _ => return None,
        };

        Some(Self {
            kdf,
            salt,
            expected,
        })
    }

    fn verify(&self, password: &str) -> bool {
        let password = password.as_bytes();
        let salt = self.salt.as_bytes();

        let derived = match self.kdf {
            Kdf::Pbkdf2Sha256 { iterations } => {
                pbkdf2::pbkdf2_hmac_array::<Sha256, 32>(password, salt, iterations).to_vec()
            }
            Kdf::Pbkdf2Sha512 { iterations } => {
                pbkdf2::pbkdf2_hmac_array::<Sha512, 64>(password, salt, iterations).to_vec()
            }
            Kdf::Scrypt { log_n, r, p } => {
                let params = match scrypt::Params::new(log_n, r, p, 64) {
                    Ok(params) => params,
                    Err(e) => {
                        tracing::warn!("Unusable scrypt parameters in stored hash: {}", e);
                        return false;
                    }
                };
                let mut output = [0u8; 64];
                if scrypt::scrypt(password, salt, &params, &mut output).is_err() {
                    return false;
                }
                output.to_vec()
            }
        };

        constant_time_eq(&derived, &self.expected)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // Produced by werkzeug.security.generate_password_hash.
    const WERKZEUG_PBKDF2: &str = "pbkdf2:sha256:260000$abcdEFGH$52d5f3a79b031a39fbb72b6f32623994f733bceda7b0c8f4503ff84251d98070";
    const WERKZEUG_PBKDF2_SHA512: &str = "pbkdf2:sha512:1000$s4ltS4lt$33118cf95e028fcc291e383e5c0695ed93b531551ba4d7f04263cff0b48a2bbb799cfa2c0897800b688132f82f6a84d744e235e4530212591cc38965d2008f49";
    const WERKZEUG_SCRYPT: &str = "scrypt:1024:8:1$q9Zr2mKx$02e44f94a5a926945709e3832d337699cab83d306fd96de7914b31279ff845d9ff23e7eb967db90594cfa7e88a9d3d5ca1f965463afdac74ffebfb432b2f0562";

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
        assert!(!needs_rehash(&hash));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_werkzeug_pbkdf2() {
        assert!(verify_password("hunter2", WERKZEUG_PBKDF2).unwrap());
        assert!(!verify_password("hunter3", WERKZEUG_PBKDF2).unwrap());
        assert!(needs_rehash(WERKZEUG_PBKDF2));
    }

    #[test]
    fn test_werkzeug_pbkdf2_sha512() {
        assert!(verify_password("grace", WERKZEUG_PBKDF2_SHA512).unwrap());
        assert!(!verify_password("Grace", WERKZEUG_PBKDF2_SHA512).unwrap());
    }

    #[test]
    fn test_werkzeug_scrypt() {
        assert!(verify_password("shepherd", WERKZEUG_SCRYPT).unwrap());
        assert!(!verify_password("sheperd", WERKZEUG_SCRYPT).unwrap());
        assert!(needs_rehash(WERKZEUG_SCRYPT));
    }

    #[test]
    fn test_unsupported_hashes_never_match() {
        assert!(!verify_password("anything", "").unwrap());
        assert!(!verify_password("anything", "plaintext").unwrap());
        assert!(!verify_password("hunter2", "pbkdf2:sha1:1000$salt$abcd").unwrap());
        assert!(!verify_password("hunter2", "pbkdf2:sha256$abcdEFGH$52d5").unwrap());
        assert!(!verify_password("hunter2", "pbkdf2:sha256:0$abcdEFGH$52d5").unwrap());
        assert!(!verify_password("hunter2", "scrypt:1000:8:1$salt$abcd").unwrap());
        assert!(!verify_password("hunter2", "pbkdf2:sha256:1000$salt$not-hex").unwrap());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let hash = hash_password_blocking("secret".to_string()).await.unwrap();
        assert!(verify_password_blocking("secret".to_string(), hash).await.unwrap());
    }
}
