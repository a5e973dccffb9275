//! # herald-memory
//!
//! SQLite-backed audit log and command usage statistics.

pub mod audit;
pub mod store;

pub use audit::{AuditEntry, AuditLogger, AuditStatus, Denied};
pub use store::{CommandStats, Store, UsageSummary};
