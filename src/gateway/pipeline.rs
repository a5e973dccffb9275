//! Message processing: parse → inspect → authorize → dispatch → audit.

use super::Gateway;
use crate::commands::{self, CommandContext, Invocation};
use herald_core::{message::IncomingMessage, sanitize::is_valid_command_name};
use herald_guard::{Denial, Role};
use herald_memory::{AuditEntry, AuditStatus};
use tracing::{debug, info, warn};

impl Gateway {
    /// Process a single incoming message through the guarded pipeline.
    pub(super) async fn handle_message(&self, incoming: IncomingMessage) {
        let Some(invocation) = Invocation::parse(&incoming.text, self.prefix) else {
            return;
        };
        if !is_valid_command_name(&invocation.name) {
            debug!("ignoring malformed command from {}", incoming.sender_id);
            return;
        }

        info!(
            "[{}] {} ({}) → {}",
            incoming.channel,
            incoming.sender_name.as_deref().unwrap_or("unknown"),
            incoming.sender_id,
            invocation.name,
        );

        let Some(scheduler) = self.schedulers.get(&incoming.channel) else {
            warn!("no scheduler for channel {}", incoming.channel);
            return;
        };

        // --- 1. SAFETY ---
        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
        let safety = self
            .gate
            .inspect(&incoming.sender_id, &invocation.name, &args);
        if !safety.safe {
            let reason = safety.blocks.join("; ");
            warn!(
                "unsafe command from {}: {} ({reason})",
                incoming.sender_id, invocation.name
            );
            self.audit_decision(
                &incoming,
                &invocation.name,
                None,
                AuditStatus::Denied,
                Some(format!("unsafe: {reason}")),
            )
            .await;
            self.send_text(&incoming, &format!("⛔ Command rejected: {reason}."))
                .await;
            return;
        }

        // --- 2. AUTHORIZE ---
        let admins = self.roster.list();
        let role = match self
            .gate
            .authorize(&incoming.sender_id, &invocation.name, &admins)
        {
            Ok(role) => role,
            Err(denial) => {
                self.audit_decision(
                    &incoming,
                    &invocation.name,
                    denial.role(),
                    AuditStatus::Denied,
                    Some(denial.to_string()),
                )
                .await;
                self.record(&invocation.name, &incoming.sender_id, false)
                    .await;
                self.send_text(&incoming, &denial_reply(&denial)).await;
                return;
            }
        };

        // --- 3. DISPATCH ---
        let ctx = CommandContext {
            gate: &self.gate,
            roster: &self.roster,
            scheduler,
            schedulers: &self.schedulers,
            store: &self.store,
            bot_name: &self.bot_name,
            uptime: &self.uptime,
            shutdown: &self.shutdown_signal,
            channel: &incoming.channel,
            sender_id: &incoming.sender_id,
            conversation_id: &incoming.conversation_id,
            role,
            args: &invocation.args,
        };

        let (reply, status, error) = match commands::handle(&invocation.command, &ctx).await {
            Ok(text) => (text, AuditStatus::Ok, None),
            Err(e) => {
                warn!("command {} failed for {}: {e}", invocation.name, incoming.sender_id);
                (format!("❌ {e}"), AuditStatus::Error, Some(e.to_string()))
            }
        };

        let success = status == AuditStatus::Ok;
        self.audit_decision(&incoming, &invocation.name, Some(role), status, error)
            .await;
        self.record(&invocation.name, &incoming.sender_id, success)
            .await;
        self.send_text(&incoming, &reply).await;
    }

    async fn audit_decision(
        &self,
        incoming: &IncomingMessage,
        command: &str,
        role: Option<Role>,
        status: AuditStatus,
        denial_reason: Option<String>,
    ) {
        let entry = AuditEntry {
            channel: incoming.channel.clone(),
            sender_id: incoming.sender_id.clone(),
            sender_name: incoming.sender_name.clone(),
            conversation_id: incoming.conversation_id.clone(),
            command: command.to_string(),
            role: role.map(|r| r.to_string()),
            status,
            denial_reason,
        };
        if let Err(e) = self.audit.log(&entry).await {
            warn!("audit log failed: {e}");
        }
    }

    async fn record(&self, command: &str, sender_id: &str, success: bool) {
        if let Err(e) = self.store.record_command(command, sender_id, success).await {
            warn!("command stats update failed: {e}");
        }
    }
}

/// User-facing text for a rejected invocation.
fn denial_reply(denial: &Denial) -> String {
    match denial {
        Denial::Blocked => "🚫 You are blocked from using commands.".to_string(),
        Denial::Lockdown { .. } => {
            "🔒 Lockdown active. Only the owner can use commands right now.".to_string()
        }
        Denial::Forbidden { role, command } => {
            format!("⛔ '{command}' is not available to {role}s.")
        }
        Denial::RateLimited {
            retry_after_secs, ..
        } => format!("⏳ Slow down. Try again in {retry_after_secs}s."),
    }
}
