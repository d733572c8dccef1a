//! Salted PBKDF2-HMAC-SHA256 password hashing.
//!
//! Stored format: `base64(salt[16] ‖ derived_key[32])`, standard alphabet with
//! padding. The value is self-describing only by length; the algorithm and
//! iteration count are fixed constants below and must never change without a
//! migration, or every stored hash stops verifying.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Hash `password` with a fresh random salt.
///
/// Two calls with the same password return different strings.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(password, &salt);

    let mut combined = Vec::with_capacity(SALT_LEN + KEY_LEN);
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&key);
    STANDARD.encode(combined)
}

/// Check `password` against a value produced by [`hash_password`].
///
/// Fails closed: anything that does not decode to exactly salt + key is a
/// mismatch. The digest comparison is constant-time.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(combined) = STANDARD.decode(stored_hash.trim()) else {
        return false;
    };
    if combined.len() != SALT_LEN + KEY_LEN {
        return false;
    }
    let (salt, stored_key) = combined.split_at(SALT_LEN);
    let candidate = derive_key(password, salt);
    candidate.as_slice().ct_eq(stored_key).into()
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}
