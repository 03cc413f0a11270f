//! Engine configuration with production defaults.

use secrecy::SecretString;

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_LOCKOUT_THRESHOLD: u32 = 5;
const DEFAULT_LOCKOUT_COOLDOWN_SECONDS: i64 = 15 * 60;
const DEFAULT_HASH_MEMORY_KIB: u32 = 19_456;
const DEFAULT_HASH_ITERATIONS: u32 = 2;
const DEFAULT_ISSUER: &str = "novasanctum";
const DEFAULT_ADMIN_ROLE: &str = "admin";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    signing_key: SecretString,
    issuer: String,
    access_token_ttl_seconds: i64,
    session_ttl_seconds: i64,
    lockout_threshold: u32,
    lockout_cooldown_seconds: i64,
    hash_memory_kib: u32,
    hash_iterations: u32,
    admin_role: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(signing_key: SecretString) -> Self {
        Self {
            signing_key,
            issuer: DEFAULT_ISSUER.to_string(),
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_cooldown_seconds: DEFAULT_LOCKOUT_COOLDOWN_SECONDS,
            hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            admin_role: DEFAULT_ADMIN_ROLE.to_string(),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, threshold: u32) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lockout_cooldown_seconds(mut self, seconds: i64) -> Self {
        self.lockout_cooldown_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_hash_memory_kib(mut self, kib: u32) -> Self {
        self.hash_memory_kib = kib;
        self
    }

    #[must_use]
    pub fn with_hash_iterations(mut self, iterations: u32) -> Self {
        self.hash_iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_admin_role(mut self, role: String) -> Self {
        self.admin_role = role;
        self
    }

    #[must_use]
    pub fn signing_key(&self) -> &SecretString {
        &self.signing_key
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn lockout_threshold(&self) -> u32 {
        self.lockout_threshold
    }

    #[must_use]
    pub fn lockout_cooldown_seconds(&self) -> i64 {
        self.lockout_cooldown_seconds
    }

    #[must_use]
    pub fn hash_memory_kib(&self) -> u32 {
        self.hash_memory_kib
    }

    #[must_use]
    pub fn hash_iterations(&self) -> u32 {
        self.hash_iterations
    }

    #[must_use]
    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }
}
