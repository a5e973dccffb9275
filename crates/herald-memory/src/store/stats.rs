//! Command usage statistics.

use super::Store;
use herald_core::error::HeraldError;
use serde::Serialize;

/// Counters for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandStats {
    pub command: String,
    pub invocations: i64,
    pub successes: i64,
    pub failures: i64,
    pub distinct_users: i64,
    pub last_used: String,
}

/// Totals across every command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub total_commands: i64,
    pub successes: i64,
    pub failures: i64,
    pub distinct_users: i64,
    /// Most used commands, highest first.
    pub top: Vec<(String, i64)>,
}

impl UsageSummary {
    /// Success rate in percent, or `None` before any command ran.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_commands == 0 {
            None
        } else {
            Some(self.successes as f64 * 100.0 / self.total_commands as f64)
        }
    }
}

impl Store {
    /// Count one invocation of `command` by `sender_id`.
    pub async fn record_command(
        &self,
        command: &str,
        sender_id: &str,
        success: bool,
    ) -> Result<(), HeraldError> {
        let (ok, failed) = if success { (1, 0) } else { (0, 1) };

        sqlx::query(
            "INSERT INTO command_stats (command, invocations, successes, failures, last_used) \
             VALUES (?, 1, ?, ?, datetime('now')) \
             ON CONFLICT(command) DO UPDATE SET \
               invocations = invocations + 1, \
               successes = successes + excluded.successes, \
               failures = failures + excluded.failures, \
               last_used = excluded.last_used",
        )
        .bind(command)
        .bind(ok)
        .bind(failed)
        .execute(&self.pool)
        .await
        .map_err(|e| HeraldError::Storage(format!("stats update failed: {e}")))?;

        sqlx::query("INSERT OR IGNORE INTO command_users (command, sender_id) VALUES (?, ?)")
            .bind(command)
            .bind(sender_id)
            .execute(&self.pool)
            .await
            .map_err(|e| HeraldError::Storage(format!("stats user insert failed: {e}")))?;

        Ok(())
    }

    /// Counters for one command, if it has ever run.
    pub async fn command_stats(&self, command: &str) -> Result<Option<CommandStats>, HeraldError> {
        let row: Option<(String, i64, i64, i64, String, i64)> = sqlx::query_as(
            "SELECT s.command, s.invocations, s.successes, s.failures, s.last_used, \
               (SELECT COUNT(*) FROM command_users u WHERE u.command = s.command) \
             FROM command_stats s WHERE s.command = ?",
        )
        .bind(command)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| HeraldError::Storage(format!("stats read failed: {e}")))?;

        Ok(row.map(
            |(command, invocations, successes, failures, last_used, distinct_users)| CommandStats {
                command,
                invocations,
                successes,
                failures,
                distinct_users,
                last_used,
            },
        ))
    }

    /// Totals plus the `top_n` most used commands.
    pub async fn usage_summary(&self, top_n: i64) -> Result<UsageSummary, HeraldError> {
        let (total_commands, successes, failures): (i64, i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(invocations), 0), COALESCE(SUM(successes), 0), \
               COALESCE(SUM(failures), 0) FROM command_stats",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| HeraldError::Storage(format!("stats read failed: {e}")))?;

        let (distinct_users,): (i64,) =
            sqlx::query_as("SELECT COUNT(DISTINCT sender_id) FROM command_users")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| HeraldError::Storage(format!("stats read failed: {e}")))?;

        let top: Vec<(String, i64)> = sqlx::query_as(
            "SELECT command, invocations FROM command_stats \
             ORDER BY invocations DESC, command ASC LIMIT ?",
        )
        .bind(top_n)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HeraldError::Storage(format!("stats read failed: {e}")))?;

        Ok(UsageSummary {
            total_commands,
            successes,
            failures,
            distinct_users,
            top,
        })
    }
}
