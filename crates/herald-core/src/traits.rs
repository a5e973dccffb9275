use crate::{
    error::HeraldError,
    message::{IncomingMessage, OutgoingMessage},
};
use async_trait::async_trait;

/// Messaging Channel trait: the chat-platform client.
///
/// Every messaging platform implements this trait to receive inbound
/// messages and send text back into a conversation.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, HeraldError>;

    /// Send text into a conversation.
    async fn send(&self, message: OutgoingMessage) -> Result<(), HeraldError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), HeraldError>;
}
