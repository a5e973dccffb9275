//! Randomized send cadence.

use herald_core::config::BroadcastConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Mutex;

struct DelayState {
    rng: StdRng,
    /// Accumulated smoothing added by `sequential`, in milliseconds.
    global_ms: f64,
}

/// Snapshot of a policy's range and smoothing state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DelayStats {
    pub min_ms: u64,
    pub max_ms: u64,
    pub average_ms: u64,
    pub global_delay_ms: f64,
}

/// Draws delays (milliseconds) uniformly from `[min_ms, max_ms]`.
pub struct DelayPolicy {
    min_ms: u64,
    max_ms: u64,
    state: Mutex<DelayState>,
}

impl DelayPolicy {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self::with_rng(min_ms, max_ms, StdRng::from_entropy())
    }

    /// Deterministic policy for reproducible cadences.
    pub fn with_seed(min_ms: u64, max_ms: u64, seed: u64) -> Self {
        Self::with_rng(min_ms, max_ms, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &BroadcastConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }

    fn with_rng(min_ms: u64, max_ms: u64, rng: StdRng) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
            state: Mutex::new(DelayState { rng, global_ms: 0.0 }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DelayState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn next_delay(&self) -> u64 {
        self.state().rng.gen_range(self.min_ms..=self.max_ms)
    }

    /// Half the minimum.
    pub fn fast(&self) -> u64 {
        self.min_ms / 2
    }

    /// One and a half times the maximum.
    pub fn slow(&self) -> u64 {
        self.max_ms * 3 / 2
    }

    /// Delay for the `iteration`-th tick of a bulk send. Every 10th tick is
    /// 30% longer, every 5th 20% shorter, every 3rd shifted by up to ±50ms.
    pub fn jittered(&self, iteration: u64) -> u64 {
        let mut state = self.state();
        let base = state.rng.gen_range(self.min_ms..=self.max_ms) as f64;
        let delay = if iteration % 10 == 0 {
            base * 1.3
        } else if iteration % 5 == 0 {
            base * 0.8
        } else if iteration % 3 == 0 {
            base + state.rng.gen_range(-50.0_f64..50.0)
        } else {
            base
        };
        delay.max(0.0).round() as u64
    }

    /// Delay with accumulated smoothing. Each call adds 10% of the base to the
    /// global delay, returns base plus global, then decays global by 5% of base.
    pub fn sequential(&self, base_ms: Option<u64>) -> u64 {
        let mut state = self.state();
        let base_ms = match base_ms {
            Some(ms) => ms,
            None => state.rng.gen_range(self.min_ms..=self.max_ms),
        };
        let base = base_ms as f64;
        state.global_ms += base * 0.1;
        let total = base + state.global_ms;
        state.global_ms = (state.global_ms - base * 0.05).max(0.0);
        total.round() as u64
    }

    /// Per-message delays for `count` messages; the first is 70% of its base.
    pub fn burst(&self, count: usize, base_ms: Option<u64>) -> Vec<u64> {
        (0..count)
            .map(|i| {
                let base = base_ms.unwrap_or_else(|| self.next_delay());
                if i == 0 {
                    (base as f64 * 0.7).round() as u64
                } else {
                    base
                }
            })
            .collect()
    }

    pub fn stats(&self) -> DelayStats {
        DelayStats {
            min_ms: self.min_ms,
            max_ms: self.max_ms,
            average_ms: (self.min_ms + self.max_ms) / 2,
            global_delay_ms: self.state().global_ms,
        }
    }

    /// Drop accumulated smoothing.
    pub fn reset(&self) {
        self.state().global_ms = 0.0;
    }
}
