use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

/// Salts are 32 random bytes, stored hex-encoded next to the digest.
pub const SALT_BYTES: usize = 32;
pub const SALT_HEX_LEN: usize = SALT_BYTES * 2;

/// Generates a fresh per-user salt from the OS entropy source.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    let mut rng = OsRng;
    rng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-512 over `salt || password`, hex-encoded. The stored-record contract:
/// existing user rows carry exactly this digest shape.
pub fn hash_password(password: &str, salt: &str) -> Result<String, AuthError> {
    if salt.len() != SALT_HEX_LEN {
        return Err(AuthError::InvalidSalt);
    }

    let mut hasher = Sha512::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Recomputes the digest and compares in constant time. A malformed expected
/// digest still pays for the hash before failing.
pub fn verify_password(password: &str, salt: &str, expected_hex: &str) -> Result<bool, AuthError> {
    let computed = hash_password(password, salt)?;

    let mut expected = [0u8; 64];
    if hex::decode_to_slice(expected_hex, &mut expected).is_err() {
        return Ok(false);
    }

    let mut computed_raw = [0u8; 64];
    // computed is always valid hex of the right length
    hex::decode_to_slice(&computed, &mut computed_raw)
        .map_err(|_| AuthError::InvalidSalt)?;

    Ok(computed_raw.ct_eq(&expected).into())
}

/// A fixed salt/digest pair the login path verifies against when the
/// identifier is unknown, so response timing does not reveal user existence.
#[derive(Debug, Clone)]
pub struct DummyCredentials {
    pub salt: String,
    pub digest: String,
}

impl DummyCredentials {
    pub fn generate() -> Self {
        let salt = generate_salt();
        let random_password = uuid::Uuid::new_v4().to_string();
        let digest = hash_password(&random_password, &salt)
            .unwrap_or_else(|_| unreachable!("generated salt has a fixed width"));
        Self { salt, digest }
    }
}
