//! # herald-broadcast
//!
//! Repeating per-conversation broadcasts ("fun loops").
//!
//! - `delay`: randomized send cadence with named variants and smoothing
//! - `lineset`: named line sets stored as JSON arrays
//! - `scheduler`: one cancellable job per conversation, emergency stop

pub mod delay;
pub mod lineset;
pub mod scheduler;

pub use delay::{DelayPolicy, DelayStats};
pub use lineset::{JsonLineSets, LineSetStore};
pub use scheduler::{BroadcastScheduler, JobInfo, StartReport};
