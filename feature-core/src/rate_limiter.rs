//! Process-wide sliding-window rate limiter for `mark_passing`.
//!
//! §4.1 step 1 and §9 ("Global state"): the rate-limit timestamps are a
//! named singleton, not per-feature state — three successful commits per
//! rolling five-minute window, across the whole process.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

use crate::error::{FeatureError, Result};

const WINDOW: Duration = Duration::from_secs(5 * 60);
const MAX_PER_WINDOW: usize = 3;

/// Sliding-window limiter. Not `Clone`; share one instance behind an
/// `Arc<Mutex<_>>` or `parking_lot::Mutex` per process.
#[derive(Debug, Default)]
pub struct RateLimiter {
    timestamps: VecDeque<SystemTime>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            timestamps: VecDeque::new(),
        }
    }

    fn evict_expired(&mut self, now: SystemTime) {
        while let Some(&oldest) = self.timestamps.front() {
            match now.duration_since(oldest) {
                Ok(age) if age >= WINDOW => {
                    self.timestamps.pop_front();
                }
                _ => break,
            }
        }
    }

    /// Check whether a call would be allowed right now, without
    /// recording anything. Call `record_success` separately, and only
    /// after the transition actually commits (§4.1 step 8).
    pub fn check(&mut self) -> Result<()> {
        self.check_at(SystemTime::now())
    }

    fn check_at(&mut self, now: SystemTime) -> Result<()> {
        self.evict_expired(now);
        if self.timestamps.len() >= MAX_PER_WINDOW {
            let oldest = *self.timestamps.front().expect("len >= MAX_PER_WINDOW > 0");
            let expires_at = oldest + WINDOW;
            let wait_seconds = expires_at
                .duration_since(now)
                .unwrap_or(Duration::ZERO)
                .as_secs() as i64;
            return Err(FeatureError::RateLimited { wait_seconds });
        }
        Ok(())
    }

    /// Record a successful `mark_passing` commit. Must only be called
    /// after the state mutation and audit row have both committed.
    pub fn record_success(&mut self) {
        self.record_success_at(SystemTime::now());
    }

    fn record_success_at(&mut self, now: SystemTime) {
        self.timestamps.push_back(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_three_within_window() {
        let mut limiter = RateLimiter::new();
        let now = SystemTime::now();
        for _ in 0..3 {
            assert!(limiter.check_at(now).is_ok());
            limiter.record_success_at(now);
        }
        let err = limiter.check_at(now).unwrap_err();
        assert!(matches!(err, FeatureError::RateLimited { .. }));
    }

    #[test]
    fn expired_entries_free_up_capacity() {
        let mut limiter = RateLimiter::new();
        let t0 = SystemTime::now();
        for _ in 0..3 {
            limiter.record_success_at(t0);
        }
        let later = t0 + WINDOW + Duration::from_secs(1);
        assert!(limiter.check_at(later).is_ok());
    }

    #[test]
    fn wait_seconds_reflects_oldest_entry_expiry() {
        let mut limiter = RateLimiter::new();
        let t0 = SystemTime::now();
        for _ in 0..3 {
            limiter.record_success_at(t0);
        }
        let probe = t0 + Duration::from_secs(60);
        match limiter.check_at(probe).unwrap_err() {
            FeatureError::RateLimited { wait_seconds } => {
                assert_eq!(wait_seconds, (WINDOW.as_secs() - 60) as i64);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
