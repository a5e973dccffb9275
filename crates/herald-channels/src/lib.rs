//! # herald-channels
//!
//! Messaging platform integrations for Herald.

pub mod telegram;

pub use telegram::TelegramChannel;
