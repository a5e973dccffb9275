//! Bot commands: parsing and dispatch to handlers.
//!
//! Authorization happens before dispatch; handlers assume the caller's
//! role already passed the gate.

mod admin;
mod broadcast;
mod info;


use herald_broadcast::BroadcastScheduler;
use herald_core::error::HeraldError;
use herald_guard::{AdminRoster, Gate, Role};
use herald_memory::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;

/// Everything a handler may touch for one invocation.
pub struct CommandContext<'a> {
    pub gate: &'a Gate,
    pub roster: &'a AdminRoster,
    /// Scheduler of the channel the command arrived on.
    pub scheduler: &'a BroadcastScheduler,
    /// Every channel's scheduler, for system-wide stops.
    pub schedulers: &'a HashMap<String, Arc<BroadcastScheduler>>,
    pub store: &'a Store,
    pub bot_name: &'a str,
    pub uptime: &'a Instant,
    /// Wakes the gateway loop into a graceful shutdown.
    pub shutdown: &'a Arc<Notify>,
    pub channel: &'a str,
    pub sender_id: &'a str,
    pub conversation_id: &'a str,
    pub role: Role,
    pub args: &'a [String],
}

/// Known bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Info,
    Ping,
    StartFun,
    StopFun,
    FunList,
    UpdateFun,
    Stats,
    EmergencyStop,
    AddAdmin,
    RemoveAdmin,
    Admins,
    Block,
    Unblock,
    Lockdown,
    Unlock,
    Security,
    ResetOwner,
    Reload,
    Shutdown,
    Unknown(String),
}

impl Command {
    fn from_name(name: &str) -> Self {
        match name {
            "help" => Self::Help,
            "info" => Self::Info,
            "ping" => Self::Ping,
            "startfun" => Self::StartFun,
            "stopfun" => Self::StopFun,
            "funlist" => Self::FunList,
            "updatefun" => Self::UpdateFun,
            "stats" => Self::Stats,
            "emergencystop" => Self::EmergencyStop,
            "addadmin" => Self::AddAdmin,
            "removeadmin" => Self::RemoveAdmin,
            "admins" => Self::Admins,
            "block" => Self::Block,
            "unblock" => Self::Unblock,
            "lockdown" => Self::Lockdown,
            "unlock" => Self::Unlock,
            "security" => Self::Security,
            "resetowner" => Self::ResetOwner,
            "reload" => Self::Reload,
            "shutdown" => Self::Shutdown,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// A command line split into name and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    /// Lowercased command name, as looked up in the permission table.
    pub name: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Parse `text` as a command. Accepts the configured prefix or `/`, and
    /// strips a `@botname` suffix. Returns `None` for ordinary chat.
    pub fn parse(text: &str, prefix: Option<char>) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let first = parts.next()?;
        let body = prefix
            .and_then(|p| first.strip_prefix(p))
            .or_else(|| first.strip_prefix('/'))?;
        // Strip @botname suffix (e.g. "/help@herald_bot" → "help").
        let name = body.split('@').next().unwrap_or(body).to_lowercase();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            command: Command::from_name(&name),
            name,
            args: parts.map(str::to_string).collect(),
        })
    }
}

/// Handle an authorized command and return the reply text.
pub async fn handle(command: &Command, ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    match command {
        Command::Help => Ok(info::handle_help(ctx)),
        Command::Info => Ok(info::handle_info(ctx).await),
        Command::Ping => Ok("🏓 Pong!".to_string()),
        Command::Stats => info::handle_stats(ctx).await,
        Command::StartFun => broadcast::handle_start(ctx).await,
        Command::StopFun => Ok(broadcast::handle_stop(ctx).await),
        Command::FunList => broadcast::handle_list(ctx).await,
        Command::UpdateFun => broadcast::handle_update(ctx),
        Command::EmergencyStop => Ok(broadcast::handle_emergency_stop(ctx).await),
        Command::AddAdmin => admin::handle_add_admin(ctx),
        Command::RemoveAdmin => admin::handle_remove_admin(ctx),
        Command::Admins => Ok(admin::handle_admins(ctx)),
        Command::Block => admin::handle_block(ctx),
        Command::Unblock => admin::handle_unblock(ctx),
        Command::Lockdown => Ok(admin::handle_lockdown(ctx)),
        Command::Unlock => Ok(admin::handle_unlock(ctx)),
        Command::Security => Ok(admin::handle_security(ctx).await),
        Command::ResetOwner => admin::handle_reset_owner(ctx),
        Command::Reload => admin::handle_reload(ctx),
        Command::Shutdown => admin::handle_shutdown(ctx),
        Command::Unknown(name) => Ok(format!(
            "❓ Unknown command '{name}'. Send help for the list."
        )),
    }
}

/// First argument, or a usage error.
fn required_arg<'a>(ctx: &'a CommandContext<'_>, usage: &str) -> Result<&'a str, HeraldError> {
    ctx.args
        .first()
        .map(String::as_str)
        .ok_or_else(|| HeraldError::InvalidInput(format!("usage: {usage}")))
}
