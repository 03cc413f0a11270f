//! Opaque refresh token helpers.
//!
//! A refresh token is possession-based: a random value with no embedded
//! claims. Only its hash is ever stored; never compare raw tokens against
//! the database.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Create a new opaque refresh token.
///
/// The raw value is only returned to the client; the session registry stores
/// a hash.
///
/// # Errors
///
/// Returns an error if the system RNG fails.
pub fn generate() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate refresh token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a refresh token so raw values never touch the database.
/// The hash is used for lookups when the token is presented.
#[must_use]
pub fn hash(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_32_random_bytes() {
        let decoded_len = generate()
            .ok()
            .and_then(|token| Base64UrlUnpadded::decode_vec(&token).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn generate_does_not_repeat() {
        let first = generate().ok();
        let second = generate().ok();
        assert!(first.is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn hash_stable_per_token() {
        let first = hash("token");
        let second = hash("token");
        let different = hash("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 32);
    }
}
