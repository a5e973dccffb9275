//! # herald-guard
//!
//! Decides whether an actor may invoke a command.
//!
//! - `identity`: tamper-evident owner record and owner verification
//! - `role`: user / operator / owner resolution
//! - `permissions`: static command → roles table with a tagged owner-only default
//! - `abuse`: suspicious-activity windows and the block list
//! - `limiter`: per (actor, command) sliding-window rate limiting
//! - `gate`: the combined authorization check
//! - `admins`: persisted operator roster
//! - `safety`: dangerous-pattern inspection of raw commands

pub mod abuse;
pub mod admins;
pub mod gate;
pub mod identity;
pub mod limiter;
pub mod permissions;
pub mod role;
pub mod safety;

pub use abuse::AbuseTracker;
pub use admins::AdminRoster;
pub use gate::{Denial, Gate, SecurityStatus};
pub use identity::{OwnerVerifier, Verification, VerifyReason};
pub use limiter::{RateDecision, RateLimiter};
pub use permissions::{Permission, PermissionSource, PermissionTable};
pub use role::{Role, RoleResolver};
pub use safety::SafetyReport;
