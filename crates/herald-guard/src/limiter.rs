//! Sliding-window rate limiting keyed by (actor, command).

use crate::abuse::{AbuseTracker, RATE_LIMIT_EXCEEDED};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: usize },
    Limited { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

type WindowKey = (String, String);

/// Fixed-size sliding window per (actor, command).
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    windows: DashMap<WindowKey, VecDeque<Instant>>,
    abuse: Arc<AbuseTracker>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration, abuse: Arc<AbuseTracker>) -> Self {
        Self {
            limit: limit.max(1),
            window,
            windows: DashMap::new(),
            abuse,
        }
    }

    pub fn check(&self, actor_id: &str, command: &str) -> RateDecision {
        self.check_at(actor_id, command, Instant::now())
    }

    /// Prune, then either charge the window or reject. A rejection is logged
    /// as a suspicious `rate_limit_exceeded` event.
    pub fn check_at(&self, actor_id: &str, command: &str, now: Instant) -> RateDecision {
        let decision = {
            let mut stamps = self
                .windows
                .entry((actor_id.to_string(), command.to_string()))
                .or_default();
            prune(&mut stamps, now, self.window);

            match stamps.front() {
                Some(oldest) if stamps.len() >= self.limit => {
                    let wait = (*oldest + self.window).saturating_duration_since(now);
                    let secs = wait.as_millis().div_ceil(1000).max(1);
                    RateDecision::Limited {
                        retry_after_secs: u64::try_from(secs).unwrap_or(u64::MAX),
                    }
                }
                _ => {
                    // Keep the sequence non-decreasing even for out-of-order readings.
                    let at = stamps.back().map_or(now, |last| now.max(*last));
                    stamps.push_back(at);
                    RateDecision::Allowed {
                        remaining: self.limit - stamps.len(),
                    }
                }
            }
        };

        if let RateDecision::Limited { retry_after_secs } = decision {
            debug!("rate limited {actor_id} on '{command}' for {retry_after_secs}s");
            self.abuse.log_suspicious_at(
                actor_id,
                RATE_LIMIT_EXCEEDED,
                &format!("command={command} limit={} window={}s", self.limit, self.window.as_secs()),
                now,
            );
        }

        decision
    }

    /// Number of tracked (actor, command) keys.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drop keys whose most recent entry has left the window. Returns keys removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, stamps| {
            prune(stamps, now, self.window);
            !stamps.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = stamps.front() {
        if now.saturating_duration_since(*front) > window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn limiter() -> (RateLimiter, Arc<AbuseTracker>) {
        let abuse = Arc::new(AbuseTracker::new(3, Duration::from_secs(3600)));
        (RateLimiter::new(10, MINUTE, abuse.clone()), abuse)
    }

    #[test]
    fn test_eleventh_call_is_limited_then_recovers() {
        let (limiter, _) = limiter();
        let t0 = Instant::now();

        for i in 0..10 {
            let at = t0 + Duration::from_secs(i);
            assert!(limiter.check_at("100000000001", "help", at).is_allowed(), "call {i}");
        }

        match limiter.check_at("100000000001", "help", t0 + Duration::from_secs(10)) {
            RateDecision::Limited { retry_after_secs } => {
                // Oldest stamp (t0) leaves the window at t0 + 60s.
                assert_eq!(retry_after_secs, 50);
            }
            other => panic!("expected limit, got {other:?}"),
        }

        let later = t0 + MINUTE + Duration::from_secs(1);
        assert!(limiter.check_at("100000000001", "help", later).is_allowed());
    }

    #[test]
    fn test_remaining_counts_down() {
        let (limiter, _) = limiter();
        let t0 = Instant::now();
        assert_eq!(
            limiter.check_at("100000000001", "help", t0),
            RateDecision::Allowed { remaining: 9 }
        );
        assert_eq!(
            limiter.check_at("100000000001", "help", t0),
            RateDecision::Allowed { remaining: 8 }
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _) = limiter();
        let t0 = Instant::now();
        for _ in 0..10 {
            limiter.check_at("100000000001", "help", t0);
        }
        assert!(!limiter.check_at("100000000001", "help", t0).is_allowed());
        assert!(limiter.check_at("100000000001", "info", t0).is_allowed());
        assert!(limiter.check_at("100000000002", "help", t0).is_allowed());
    }

    #[test]
    fn test_rejections_escalate_to_block() {
        let (limiter, abuse) = limiter();
        let t0 = Instant::now();
        for _ in 0..10 {
            limiter.check_at("100000000001", "help", t0);
        }
        for _ in 0..2 {
            assert!(!limiter.check_at("100000000001", "help", t0).is_allowed());
        }
        assert!(!abuse.is_blocked("100000000001"));
        assert!(!limiter.check_at("100000000001", "help", t0).is_allowed());
        assert!(abuse.is_blocked("100000000001"));
        assert_eq!(abuse.event_count("100000000001", RATE_LIMIT_EXCEEDED), 3);
    }

    #[test]
    fn test_rejection_does_not_charge_window() {
        let (limiter, _) = limiter();
        let t0 = Instant::now();
        for _ in 0..10 {
            limiter.check_at("100000000001", "help", t0);
        }
        limiter.check_at("100000000001", "help", t0 + Duration::from_secs(30));
        // Only the original ten stamps exist, so the window clears after t0 + 60s.
        assert!(limiter
            .check_at("100000000001", "help", t0 + MINUTE + Duration::from_millis(1))
            .is_allowed());
    }

    #[test]
    fn test_sweep_removes_abandoned_keys() {
        let (limiter, _) = limiter();
        let t0 = Instant::now();
        limiter.check_at("100000000001", "help", t0);
        limiter.check_at("100000000002", "help", t0 + MINUTE);
        assert_eq!(limiter.tracked_keys(), 2);
        assert_eq!(limiter.sweep(t0 + MINUTE + Duration::from_secs(1)), 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
