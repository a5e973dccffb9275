//! Pattern inspection of raw command text before authorization.

use crate::abuse::{AbuseTracker, DANGEROUS_PATTERN};
use std::time::Instant;

/// Longest command (name plus arguments) accepted.
pub const MAX_COMMAND_CHARS: usize = 500;

const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    ("eval(", "eval usage"),
    ("require(", "require usage"),
    ("process.", "process access"),
    ("fs.", "file system access"),
    ("child_process", "child process"),
    ("exec(", "command execution"),
    ("spawn(", "process spawn"),
];

/// Result of inspecting one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyReport {
    pub safe: bool,
    pub warnings: Vec<String>,
    pub blocks: Vec<String>,
}

/// Inspect a command and its arguments.
///
/// Each dangerous pattern adds a warning and logs a `dangerous_pattern`
/// event, which may escalate the actor to blocked. Over-long commands and
/// already-blocked actors make the report unsafe.
pub fn inspect(abuse: &AbuseTracker, actor_id: &str, command: &str, args: &[&str]) -> SafetyReport {
    inspect_at(abuse, actor_id, command, args, Instant::now())
}

pub fn inspect_at(
    abuse: &AbuseTracker,
    actor_id: &str,
    command: &str,
    args: &[&str],
    now: Instant,
) -> SafetyReport {
    let full = if args.is_empty() {
        command.to_string()
    } else {
        format!("{command} {}", args.join(" "))
    };
    let lowered = full.to_lowercase();

    let mut report = SafetyReport {
        safe: true,
        ..Default::default()
    };

    for (pattern, reason) in DANGEROUS_PATTERNS {
        if lowered.contains(pattern) {
            report.warnings.push(format!("potential {reason} detected"));
            abuse.log_suspicious_at(actor_id, DANGEROUS_PATTERN, &format!("{reason}: {full}"), now);
        }
    }

    if full.chars().count() > MAX_COMMAND_CHARS {
        report.blocks.push("command too long".to_string());
        report.safe = false;
    }

    if abuse.is_blocked(actor_id) {
        report.blocks.push("actor is blocked".to_string());
        report.safe = false;
    }

    report
}
