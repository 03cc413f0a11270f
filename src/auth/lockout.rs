//! Failed-login lockout policy.
//!
//! Locks are lazy: nothing flips `is_locked` back when the cooldown passes,
//! the check simply stops treating the account as locked. The failure counter
//! survives an expired lock and only a successful login clears it, so one more
//! wrong password after the cooldown locks the account again.

use crate::store::User;
use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Copy, Debug)]
pub struct LockoutPolicy {
    threshold: u32,
    cooldown_seconds: i64,
}

impl LockoutPolicy {
    #[must_use]
    pub const fn new(threshold: u32, cooldown_seconds: i64) -> Self {
        Self {
            threshold,
            cooldown_seconds,
        }
    }

    /// A lock without an expiry holds until an operator clears it.
    #[must_use]
    pub fn is_locked(&self, user: &User, now: DateTime<Utc>) -> bool {
        user.is_locked && user.locked_until.is_none_or(|until| until > now)
    }

    #[must_use]
    pub fn should_lock(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.threshold
    }

    #[must_use]
    pub fn lock_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.cooldown_seconds)
    }

    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
