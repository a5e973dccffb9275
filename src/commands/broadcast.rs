//! startfun, stopfun, funlist, updatefun, emergencystop.

use super::{required_arg, CommandContext};
use herald_core::error::HeraldError;
use herald_core::sanitize::sanitize_message;
use tracing::warn;

pub(super) async fn handle_start(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    let name = required_arg(ctx, "startfun <set>")?;
    let report = ctx.scheduler.start(ctx.conversation_id, name).await?;
    Ok(match report.replaced {
        Some(old) => format!(
            "🔁 Switched from '{}' to '{}' ({} lines).",
            old.line_set, report.line_set, report.lines
        ),
        None => format!("✅ '{}' started ({} lines).", report.line_set, report.lines),
    })
}

pub(super) async fn handle_stop(ctx: &CommandContext<'_>) -> String {
    match ctx.scheduler.stop(ctx.conversation_id).await {
        Some(job) => format!(
            "🛑 '{}' stopped after {} lines.",
            job.line_set, job.emitted
        ),
        None => "Nothing is running in this chat.".to_string(),
    }
}

pub(super) async fn handle_list(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    let names = ctx.scheduler.line_sets().names()?;
    let mut out = if names.is_empty() {
        "📂 No line sets yet. Add one with updatefun <set> <text>.".to_string()
    } else {
        format!("📂 Line sets: {}", names.join(", "))
    };

    let pace = ctx.scheduler.policy().stats();
    out.push_str(&format!(
        "\nPace: {}-{}ms (avg {}ms, smoothing {:.0}ms)",
        pace.min_ms, pace.max_ms, pace.average_ms, pace.global_delay_ms
    ));

    let active = ctx.scheduler.active().await;
    if active.is_empty() {
        out.push_str("\n\nNo broadcasts running.");
    } else {
        out.push_str("\n\nRunning:");
        for job in active {
            let here = if job.conversation_id == ctx.conversation_id {
                " (this chat)"
            } else {
                ""
            };
            out.push_str(&format!(
                "\n• {}{here}: '{}', {} sent, since {}",
                job.conversation_id,
                job.line_set,
                job.emitted,
                job.started_at.format("%Y-%m-%d %H:%M UTC")
            ));
        }
    }
    Ok(out)
}

pub(super) fn handle_update(ctx: &CommandContext<'_>) -> Result<String, HeraldError> {
    const USAGE: &str = "updatefun <set> <text>";
    let name = required_arg(ctx, USAGE)?;
    let raw = ctx.args[1..].join(" ");
    if raw.trim().is_empty() {
        return Err(HeraldError::InvalidInput(format!("usage: {USAGE}")));
    }

    let clean = sanitize_message(&raw);
    if clean.was_modified {
        warn!(
            "sanitized line from {} for '{name}': {:?}",
            ctx.sender_id, clean.warnings
        );
    }
    let len = ctx.scheduler.line_sets().append(name, &clean.text)?;
    Ok(format!("📝 Added to '{name}' ({len} lines)."))
}

pub(super) async fn handle_emergency_stop(ctx: &CommandContext<'_>) -> String {
    let mut stopped = 0;
    for scheduler in ctx.schedulers.values() {
        stopped += scheduler.emergency_stop_all().await;
        scheduler.policy().reset();
    }
    warn!("emergency stop by {}: {stopped} broadcasts", ctx.sender_id);
    format!("🚨 Emergency stop: {stopped} broadcasts halted.")
}
