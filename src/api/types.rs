//! Shared types for the API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core_state::CoreState;

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Cleanup of idle keys kicks in past this many tracked clients.
const RATE_KEYS_SOFT_LIMIT: usize = 1000;

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        let per_minute = core.config().rate_limit_per_minute;
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(per_minute))),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter
// ═══════════════════════════════════════════════════════════

/// Sliding one-minute window per client key.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
}

impl RateLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
        }
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    /// `Ok(())` if the request fits, else `Err(retry_after_secs)`.
    /// A limit of 0 disables limiting.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&mut self, key: &str, now: Instant) -> Result<(), u64> {
        if self.per_minute == 0 {
            return Ok(());
        }
        if self.windows.len() > RATE_KEYS_SOFT_LIMIT {
            self.cleanup(now);
        }

        let entries = self.windows.entry(key.to_string()).or_default();
        entries.retain(|ts| now.duration_since(*ts) < RATE_WINDOW);

        if entries.len() as u32 >= self.per_minute {
            let oldest = entries.first().copied().unwrap_or(now);
            let wait = RATE_WINDOW.saturating_sub(now.duration_since(oldest));
            return Err(wait.as_secs().max(1));
        }

        entries.push(now);
        Ok(())
    }

    fn cleanup(&mut self, now: Instant) {
        self.windows.retain(|_, entries| {
            entries
                .last()
                .is_some_and(|ts| now.duration_since(*ts) < RATE_WINDOW)
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_RATE_LIMIT_PER_MINUTE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let mut limiter = RateLimiter::new(3);
        for _ in 0..3 {
            assert!(limiter.check("a").is_ok());
        }
        let retry = limiter.check("a").unwrap_err();
        assert!((1..=60).contains(&retry));
    }

    #[test]
    fn keys_are_independent() {
        let mut limiter = RateLimiter::new(1);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("b").is_ok());
        assert!(limiter.check("a").is_err());
    }

    #[test]
    fn window_slides() {
        let mut limiter = RateLimiter::new(1);
        let start = Instant::now();
        assert!(limiter.check_at("a", start).is_ok());
        assert!(limiter.check_at("a", start + Duration::from_secs(30)).is_err());
        assert!(limiter.check_at("a", start + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn zero_disables_limit() {
        let mut limiter = RateLimiter::new(0);
        for _ in 0..500 {
            assert!(limiter.check("a").is_ok());
        }
    }

    #[test]
    fn idle_keys_are_cleaned_up() {
        let mut limiter = RateLimiter::new(5);
        let start = Instant::now();
        for n in 0..=RATE_KEYS_SOFT_LIMIT {
            limiter.check_at(&format!("client-{n}"), start).unwrap();
        }
        limiter
            .check_at("late", start + Duration::from_secs(120))
            .unwrap();
        assert_eq!(limiter.windows.len(), 1);
    }
}
