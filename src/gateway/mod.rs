//! Gateway: the main event loop connecting channels, the guard, and broadcasts.
//!
//! Includes: command safety inspection, authorization, audit logging,
//! periodic sweeping of guard windows, and graceful shutdown.

mod pipeline;

#[cfg(test)]
mod tests;

use herald_broadcast::{BroadcastScheduler, DelayPolicy, LineSetStore};
use herald_core::{
    config::Config,
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};
use herald_guard::{AdminRoster, Gate};
use herald_memory::{AuditLogger, Store};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

/// The central gateway that routes commands from channels through the guard.
pub struct Gateway {
    pub(super) channels: HashMap<String, Arc<dyn Channel>>,
    /// One broadcast scheduler per channel, keyed by channel name.
    pub(super) schedulers: HashMap<String, Arc<BroadcastScheduler>>,
    pub(super) gate: Arc<Gate>,
    pub(super) roster: Arc<AdminRoster>,
    pub(super) store: Store,
    pub(super) audit: AuditLogger,
    pub(super) bot_name: String,
    pub(super) prefix: Option<char>,
    pub(super) sweep_interval: Duration,
    pub(super) uptime: Instant,
    /// Owner-requested shutdown.
    pub(super) shutdown_signal: Arc<Notify>,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        config: &Config,
        channels: HashMap<String, Arc<dyn Channel>>,
        gate: Arc<Gate>,
        roster: Arc<AdminRoster>,
        line_sets: Arc<dyn LineSetStore>,
        store: Store,
    ) -> Self {
        let policy = Arc::new(DelayPolicy::from_config(&config.broadcast));
        let schedulers = channels
            .iter()
            .map(|(name, channel)| {
                let scheduler =
                    BroadcastScheduler::new(channel.clone(), line_sets.clone(), policy.clone());
                (name.clone(), Arc::new(scheduler))
            })
            .collect();
        let audit = store.audit();

        Self {
            channels,
            schedulers,
            gate,
            roster,
            store,
            audit,
            bot_name: config.herald.name.clone(),
            prefix: config.prefix_char(),
            sweep_interval: Duration::from_secs(config.guard.sweep_interval_secs.max(1)),
            uptime: Instant::now(),
            shutdown_signal: Arc::new(Notify::new()),
        }
    }

    /// Run the main event loop.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "{} gateway running | channels: {} | admins: {} | prefix: {}",
            self.bot_name,
            self.channels.keys().cloned().collect::<Vec<_>>().join(", "),
            self.roster.list().len(),
            self.prefix.map(String::from).unwrap_or_else(|| "/".to_string()),
        );

        let (tx, mut rx) = mpsc::channel::<IncomingMessage>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(msg) = channel_rx.recv().await {
                    if tx.send(msg).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        let sweep_gate = self.gate.clone();
        let sweep_interval = self.sweep_interval;
        let sweep_handle = tokio::spawn(async move {
            Self::maintenance_loop(sweep_gate, sweep_interval).await;
        });

        // Main event loop with graceful shutdown.
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(incoming) => {
                        let gw = self.clone();
                        tokio::spawn(async move {
                            gw.handle_message(incoming).await;
                        });
                    }
                    None => {
                        warn!("all channels closed");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = self.shutdown_signal.notified() => {
                    info!("Shutdown requested by owner");
                    break;
                }
            }
        }

        self.shutdown(&sweep_handle).await;
        Ok(())
    }

    /// Background task: drop abandoned rate-limit and abuse windows.
    async fn maintenance_loop(gate: Arc<Gate>, interval: Duration) {
        loop {
            tokio::time::sleep(interval).await;
            let removed = gate.sweep();
            if removed > 0 {
                debug!("maintenance: swept {removed} stale guard keys");
            }
        }
    }

    /// Graceful shutdown: halt every broadcast, stop channels.
    async fn shutdown(&self, sweep_handle: &tokio::task::JoinHandle<()>) {
        info!("Shutting down...");

        sweep_handle.abort();

        for (name, scheduler) in &self.schedulers {
            let stopped = scheduler.emergency_stop_all().await;
            if stopped > 0 {
                info!("stopped {stopped} broadcasts on {name}");
            }
        }

        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!("failed to stop channel {name}: {e}");
            }
        }

        info!("Shutdown complete.");
    }

    /// Send a plain text message back into the sender's conversation.
    pub(super) async fn send_text(&self, incoming: &IncomingMessage, text: &str) {
        let msg = OutgoingMessage::new(&incoming.conversation_id, text);

        if let Some(channel) = self.channels.get(&incoming.channel) {
            if let Err(e) = channel.send(msg).await {
                error!("failed to send message: {e}");
            }
        }
    }
}
