//! # herald-core
//!
//! Core types, traits, configuration, and error handling for the Herald agent.

pub mod config;
pub mod error;
pub mod message;
pub mod sanitize;
pub mod traits;

pub use config::shellexpand;
