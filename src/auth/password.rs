//! Argon2id password hashing.

use anyhow::{Result, anyhow};
use argon2::password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier as _, Version};
use tracing::warn;

pub struct PasswordHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl PasswordHasher {
    /// Cost parameters follow the stored configuration; verification reads
    /// whatever parameters the PHC string carries, so old hashes keep working
    /// after a cost bump.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|err| anyhow!("invalid argon2 parameters: {err}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        // Hashed once at startup so unknown-account verifications burn the
        // same work as real ones.
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"novasanctum-timing-pad", &salt)
            .map_err(|err| anyhow!("failed to prepare timing pad: {err}"))?
            .to_string();

        Ok(Self { argon2, dummy_hash })
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| anyhow!("failed to hash password: {err}"))?;
        Ok(hash.to_string())
    }

    #[must_use]
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            warn!("stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Verify against the startup pad and discard the result.
    pub fn equalize_timing(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}
