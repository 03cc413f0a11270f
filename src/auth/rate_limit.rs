//! Rate limiting primitives for auth endpoints.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// Window bookkeeping is pruned once the map grows past this.
const MAX_TRACKED_KEYS: usize = 10_000;

#[derive(Clone, Copy, Debug)]
pub enum RateLimitAction {
    Login,
    Refresh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_seconds: u64 },
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

struct WindowSlot {
    started_at: Instant,
    count: u32,
}

/// Fixed-window counter keyed by client IP and action. Requests without a
/// resolvable IP are allowed through; there is nothing to key on.
pub struct FixedWindowRateLimiter {
    max_attempts: u32,
    window: Duration,
    windows: Mutex<HashMap<String, WindowSlot>>,
}

impl FixedWindowRateLimiter {
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        let Some(ip) = ip else {
            return RateLimitDecision::Allowed;
        };

        let key = format!("{action:?}:{ip}");
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();

        if windows.len() > MAX_TRACKED_KEYS {
            windows.retain(|_, slot| now.duration_since(slot.started_at) < self.window);
        }

        let slot = windows.entry(key).or_insert(WindowSlot {
            started_at: now,
            count: 0,
        });
        if now.duration_since(slot.started_at) >= self.window {
            slot.started_at = now;
            slot.count = 0;
        }
        slot.count += 1;

        if slot.count > self.max_attempts {
            let remaining = self.window.saturating_sub(now.duration_since(slot.started_at));
            RateLimitDecision::Limited {
                retry_after_seconds: remaining.as_secs().max(1),
            }
        } else {
            RateLimitDecision::Allowed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("203.0.113.1"), RateLimitAction::Refresh),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn fixed_window_limits_after_max_attempts() {
        let limiter = FixedWindowRateLimiter::new(3, Duration::from_secs(60));
        let ip = Some("203.0.113.1");

        for _ in 0..3 {
            assert_eq!(
                limiter.check_ip(ip, RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
        match limiter.check_ip(ip, RateLimitAction::Login) {
            RateLimitDecision::Limited {
                retry_after_seconds,
            } => assert!(retry_after_seconds >= 1 && retry_after_seconds <= 60),
            RateLimitDecision::Allowed => panic!("fourth attempt should be limited"),
        }
    }

    #[test]
    fn windows_are_scoped_per_ip_and_action() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(60));

        assert_eq!(
            limiter.check_ip(Some("203.0.113.1"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        // Exhausted for this IP and action only.
        assert!(matches!(
            limiter.check_ip(Some("203.0.113.1"), RateLimitAction::Login),
            RateLimitDecision::Limited { .. }
        ));
        assert_eq!(
            limiter.check_ip(Some("203.0.113.2"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("203.0.113.1"), RateLimitAction::Refresh),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn window_resets_after_elapsing() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_millis(1));
        let ip = Some("203.0.113.9");

        assert_eq!(
            limiter.check_ip(ip, RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(
            limiter.check_ip(ip, RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn missing_ip_is_not_limited() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(60));
        for _ in 0..5 {
            assert_eq!(
                limiter.check_ip(None, RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
    }
}
