//! Owner-only roster, block list, lockdown and owner-record commands.

use super::{required_arg, CommandContext};
use herald_core::error::HeraldError;
use herald_core::sanitize::is_valid_actor_id;
use std::time::Duration;
use tracing::warn;

const DEFAULT_SHUTDOWN_SECS: u64 = 5;
const MAX_SHUTDOWN_SECS: u64 = 60;

fn is_owner_id(ctx: &CommandContext<'_>, actor_id: &str) -> bool {
    ctx.gate.verifier().owner_id() == actor_id
}

fn target_id<'a>(ctx: &'a CommandContext<'_>, usage: &str) -> Result<&'a str, HeraldError> {
    let id = required_arg(ctx, usage)?.trim();
    if !is_valid_actor_id(id) {
        return Err(HeraldError::InvalidInput(format!("'{id}' is not a valid id")));
    }
    Ok(id)
}

pub(super) fn handle_add_admin(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    let id = target_id(ctx, "addadmin <id>")?;
    if is_owner_id(ctx, id) {
        return Ok("The owner already has every permission.".to_string());
    }
    Ok(if ctx.roster.add(id)? {
        format!("✅ Admin added: {id}\nTotal admins: {}", ctx.roster.list().len())
    } else {
        format!("{id} is already an admin.")
    })
}

pub(super) fn handle_remove_admin(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    let id = target_id(ctx, "removeadmin <id>")?;
    if is_owner_id(ctx, id) {
        return Ok("❌ Cannot remove the owner.".to_string());
    }
    Ok(if ctx.roster.remove(id)? {
        format!("✅ Admin removed: {id}\nRemaining admins: {}", ctx.roster.list().len())
    } else {
        format!("{id} is not an admin.")
    })
}

pub(super) fn handle_admins(ctx: &CommandContext<'_>) -> String {
    let admins = ctx.roster.list();
    if admins.is_empty() {
        return "👥 No admins.".to_string();
    }
    let mut out = format!("👥 Admins ({})", admins.len());
    for (i, id) in admins.iter().enumerate() {
        out.push_str(&format!("\n{}. {id}", i + 1));
    }
    out
}

pub(super) fn handle_block(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    let id = target_id(ctx, "block <id>")?;
    if is_owner_id(ctx, id) {
        return Ok("❌ Cannot block the owner.".to_string());
    }
    let reason = format!("blocked by {}", ctx.sender_id);
    Ok(if ctx.gate.block(id, &reason) {
        format!("🚫 {id} blocked.")
    } else {
        format!("{id} is already blocked.")
    })
}

pub(super) fn handle_unblock(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    let id = target_id(ctx, "unblock <id>")?;
    Ok(if ctx.gate.unblock(id) {
        format!("✅ {id} unblocked.")
    } else {
        format!("{id} is not blocked.")
    })
}

pub(super) fn handle_lockdown(ctx: &CommandContext<'_>) -> String {
    let reason = if ctx.args.is_empty() {
        "security emergency".to_string()
    } else {
        ctx.args.join(" ")
    };
    let released = ctx.gate.lockdown(&reason);
    format!(
        "🔒 Lockdown active: {reason}\n\
         Only the owner can use commands until unlock. {released} blocks cleared."
    )
}

pub(super) fn handle_unlock(ctx: &CommandContext<'_>) -> String {
    if !ctx.gate.is_locked_down() {
        return "No lockdown is active.".to_string();
    }
    let released = ctx.gate.lift_lockdown();
    format!("🔓 Lockdown lifted. {released} blocks cleared.")
}

pub(super) async fn handle_security(ctx: &CommandContext<'_>) -> String {
    let report = ctx.gate.verifier().report();
    let status = ctx.gate.status();
    let yes_no = |b: bool| if b { "yes" } else { "NO" };

    let mut out = format!(
        "🛡 Security\n\
         Owner record: {}\n\
         - exists: {}\n\
         - readable: {}\n\
         - hash valid: {}\n\
         - owner matches: {}\n\
         - created: {}\n\n\
         Blocked actors: {}\n\
         Rate-limit keys: {}\n\
         Suspicious events (live): {}\n\
         Permission entries: {}\n\
         Lockdown: {}",
        if report.is_secure() { "secure" } else { "COMPROMISED" },
        yes_no(report.record_exists),
        yes_no(report.readable),
        yes_no(report.hash_valid),
        yes_no(report.owner_id_matches),
        report
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "-".to_string()),
        status.blocked,
        status.rate_keys,
        status.suspicious_events,
        status.permission_count,
        status.lockdown.as_deref().unwrap_or("off"),
    );

    match ctx.store.db_size().await {
        Ok(bytes) => out.push_str(&format!("\nAudit database: {} KiB", bytes / 1024)),
        Err(e) => warn!("security: failed to read db size: {e}"),
    }

    match ctx.store.audit().recent_denied(5).await {
        Ok(denied) if !denied.is_empty() => {
            out.push_str("\n\nRecent denials:");
            for d in denied {
                out.push_str(&format!(
                    "\n• {} {} '{}': {}",
                    d.timestamp, d.sender_id, d.command, d.reason
                ));
            }
        }
        Ok(_) => {}
        Err(e) => warn!("security: failed to read denials: {e}"),
    }

    out
}

pub(super) fn handle_reset_owner(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    warn!("owner record reset requested by {}", ctx.sender_id);
    let outcome = ctx.gate.verifier().emergency_reset()?;
    Ok(match outcome.backup {
        Some(path) => format!(
            "♻️ Owner record recreated. Previous record saved to {}.",
            path.display()
        ),
        None => "♻️ Owner record recreated.".to_string(),
    })
}

pub(super) fn handle_reload(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    let count = ctx.roster.reload()?;
    Ok(format!("🔄 Admin roster reloaded: {count} admins."))
}

/// Schedule a graceful shutdown after a 1-60 second delay.
pub(super) fn handle_shutdown(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    let secs = match ctx.args.first() {
        None => DEFAULT_SHUTDOWN_SECS,
        Some(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|s| (1..=MAX_SHUTDOWN_SECS).contains(s))
            .ok_or_else(|| {
                HeraldError::InvalidInput(format!(
                    "delay must be 1-{MAX_SHUTDOWN_SECS} seconds"
                ))
            })?,
    };

    warn!("shutdown requested by {} in {secs}s", ctx.sender_id);
    let signal = ctx.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        signal.notify_one();
    });

    Ok(format!(
        "🛑 Shutdown in {secs}s.\nAll broadcasts will stop and the bot will exit."
    ))
}
