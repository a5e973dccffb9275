//! Suspicious-activity tracking and the block list.
//!
//! Events are kept per (actor, kind) in a trailing window. Reaching the
//! threshold inside the window moves the actor onto the block list.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Violation kind recorded when an actor exceeds a rate limit.
pub const RATE_LIMIT_EXCEEDED: &str = "rate_limit_exceeded";
/// Violation kind recorded for dangerous command patterns.
pub const DANGEROUS_PATTERN: &str = "dangerous_pattern";

/// One logged suspicious event.
#[derive(Debug, Clone)]
pub struct SuspiciousEvent {
    pub at: Instant,
    pub detail: String,
}

/// Why and when an actor was blocked.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    pub reason: String,
    pub since: DateTime<Utc>,
}

type EventKey = (String, String);

/// Per-(actor, kind) suspicious-activity windows plus the block list.
///
/// Each map is sharded; a mutation holds only the shard of its own key.
pub struct AbuseTracker {
    threshold: usize,
    window: Duration,
    events: DashMap<EventKey, VecDeque<SuspiciousEvent>>,
    blocked: DashMap<String, BlockRecord>,
}

impl AbuseTracker {
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            window,
            events: DashMap::new(),
            blocked: DashMap::new(),
        }
    }

    /// Record a suspicious event. Returns `true` if it got the actor blocked.
    pub fn log_suspicious(&self, actor_id: &str, kind: &str, detail: &str) -> bool {
        self.log_suspicious_at(actor_id, kind, detail, Instant::now())
    }

    /// `log_suspicious` with an explicit clock reading.
    pub fn log_suspicious_at(&self, actor_id: &str, kind: &str, detail: &str, now: Instant) -> bool {
        let count = {
            let mut events = self
                .events
                .entry((actor_id.to_string(), kind.to_string()))
                .or_default();
            prune(&mut events, now, self.window);
            let at = events.back().map_or(now, |last| now.max(last.at));
            events.push_back(SuspiciousEvent {
                at,
                detail: detail.to_string(),
            });
            events.len()
        };

        warn!(
            actor = actor_id,
            kind,
            count,
            detail,
            "suspicious activity"
        );

        if count >= self.threshold {
            if self.block(actor_id, &format!("multiple suspicious activities: {kind}")) {
                warn!(
                    actor = actor_id,
                    kind,
                    count,
                    "actor blocked after repeated suspicious activity"
                );
            }
            return true;
        }
        false
    }

    /// Live events for one (actor, kind) key.
    pub fn event_count(&self, actor_id: &str, kind: &str) -> usize {
        self.events
            .get(&(actor_id.to_string(), kind.to_string()))
            .map_or(0, |events| events.len())
    }

    /// Add an actor to the block list. Returns `false` if already blocked.
    pub fn block(&self, actor_id: &str, reason: &str) -> bool {
        match self.blocked.entry(actor_id.trim().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(BlockRecord {
                    reason: reason.to_string(),
                    since: Utc::now(),
                });
                warn!("actor {actor_id} blocked: {reason}");
                true
            }
        }
    }

    /// Remove an actor from the block list. Returns `false` if not blocked.
    pub fn unblock(&self, actor_id: &str) -> bool {
        let removed = self.blocked.remove(actor_id.trim()).is_some();
        if removed {
            info!("actor {actor_id} unblocked");
        }
        removed
    }

    pub fn is_blocked(&self, actor_id: &str) -> bool {
        self.blocked.contains_key(actor_id.trim())
    }

    /// Snapshot of the block list, sorted by actor.
    pub fn blocked(&self) -> Vec<(String, BlockRecord)> {
        let mut list: Vec<(String, BlockRecord)> = self
            .blocked
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }

    /// Empty the block list. Returns how many actors were released.
    pub fn clear_blocks(&self) -> usize {
        let count = self.blocked.len();
        self.blocked.clear();
        count
    }

    /// Total live events across all keys.
    pub fn total_events(&self) -> usize {
        self.events.iter().map(|entry| entry.value().len()).sum()
    }

    /// Prune every window and drop keys left empty. Returns keys removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.events.len();
        self.events.retain(|_, events| {
            prune(events, now, self.window);
            !events.is_empty()
        });
        before.saturating_sub(self.events.len())
    }
}

fn prune(events: &mut VecDeque<SuspiciousEvent>, now: Instant, window: Duration) {
    while let Some(front) = events.front() {
        if now.saturating_duration_since(front.at) > window {
            events.pop_front();
        } else {
            break;
        }
    }
}
