//! help, info, stats.

use super::CommandContext;
use herald_core::error::HeraldError;
use herald_guard::Role;

/// Commands the caller's role may run.
pub(super) fn handle_help(ctx: &CommandContext<'_>) -> String {
    let commands = ctx.gate.permissions().commands_for(ctx.role);
    let mut out = format!("📖 {} commands ({})\n", ctx.bot_name, ctx.role);
    for name in commands {
        out.push_str(&format!("\n• {name}"));
        if let Some(usage) = usage(name) {
            out.push_str(&format!(" {usage}"));
        }
    }
    out
}

fn usage(command: &str) -> Option<&'static str> {
    match command {
        "startfun" => Some("<set>"),
        "updatefun" => Some("<set> <text>"),
        "addadmin" | "removeadmin" | "block" | "unblock" => Some("<id>"),
        "lockdown" => Some("[reason]"),
        "shutdown" => Some("[seconds]"),
        _ => None,
    }
}

pub(super) async fn handle_info(ctx: &CommandContext<'_>) -> String {
    let uptime = ctx.uptime.elapsed().as_secs();
    let broadcast = if ctx.scheduler.is_active(ctx.conversation_id).await {
        "running"
    } else {
        "idle"
    };
    format!(
        "🤖 {} v{}\n\
         Uptime: {}h {}m {}s\n\
         Channel: {}\n\
         Your id: {}\n\
         Your role: {}\n\
         Broadcast here: {broadcast}",
        ctx.bot_name,
        env!("CARGO_PKG_VERSION"),
        uptime / 3600,
        (uptime % 3600) / 60,
        uptime % 60,
        ctx.channel,
        ctx.sender_id,
        ctx.role,
    )
}

pub(super) async fn handle_stats(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    let summary = ctx.store.usage_summary(5).await?;
    let mut out = format!(
        "📊 Usage\n\
         Commands: {}\n\
         Distinct users: {}\n\
         Success rate: {}",
        summary.total_commands,
        summary.distinct_users,
        summary
            .success_rate()
            .map(|r| format!("{r:.1}%"))
            .unwrap_or_else(|| "n/a".to_string()),
    );

    if !summary.top.is_empty() {
        out.push_str("\n\nTop commands:");
        for (i, (name, count)) in summary.top.iter().enumerate() {
            out.push_str(&format!("\n{}. {name} ({count})", i + 1));
        }
    }

    if ctx.role == Role::Owner {
        let mut active = 0;
        for scheduler in ctx.schedulers.values() {
            active += scheduler.active().await.len();
        }
        let status = ctx.gate.status();
        out.push_str(&format!(
            "\n\nActive broadcasts: {active}\nBlocked actors: {}",
            status.blocked
        ));
    }

    Ok(out)
}
