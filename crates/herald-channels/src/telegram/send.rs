//! Outbound calls to the Bot API.

use super::{split_message, TelegramChannel, MAX_MESSAGE_LEN};
use herald_core::error::HeraldError;
use tracing::{info, warn};

/// Commands advertised in the Telegram autocomplete menu.
const MENU: &[(&str, &str)] = &[
    ("help", "Show the commands you can use"),
    ("info", "Bot and account information"),
    ("ping", "Check that the bot is alive"),
    ("startfun", "Start a line set in this chat"),
    ("stopfun", "Stop the line set in this chat"),
    ("funlist", "List line sets and running loops"),
    ("stats", "Usage statistics"),
];

impl TelegramChannel {
    /// Send plain text to a chat, split into API-sized chunks.
    pub(crate) async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), HeraldError> {
        let url = format!("{}/sendMessage", self.base_url);

        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });

            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| HeraldError::Send(format!("telegram send failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let error_text = resp.text().await.unwrap_or_default();
                return Err(HeraldError::Send(format!(
                    "telegram send got {status}: {error_text}"
                )));
            }
        }

        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands: Vec<serde_json::Value> = MENU
            .iter()
            .map(|(command, description)| {
                serde_json::json!({ "command": command, "description": description })
            })
            .collect();
        let body = serde_json::json!({ "commands": commands });

        let url = format!("{}/setMyCommands", self.base_url);
        match self.client.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!("failed to register Telegram bot commands: {e}");
            }
        }
    }
}
