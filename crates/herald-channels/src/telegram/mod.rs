//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates` and `sendMessage` for responses.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
mod send;
pub(crate) mod types;


use herald_core::config::TelegramConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Longest text Telegram accepts in one `sendMessage`.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Default bound on Bot API calls. Long polling sets its own longer timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: &TelegramConfig) -> Self {
        Self::with_base_url(format!("https://api.telegram.org/bot{}", config.bot_token))
    }

    /// Channel against a custom API root (e.g. a local Bot API server).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
            last_update_id: Arc::new(Mutex::new(None)),
        }
    }
}

/// Split text into chunks of at most `max_len` bytes, preferring newline
/// boundaries and never cutting through a UTF-8 character.
pub(crate) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}
