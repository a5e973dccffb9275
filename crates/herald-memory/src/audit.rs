//! Audit log: one row per command decision.

use herald_core::error::HeraldError;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

/// An entry to write to the audit log.
pub struct AuditEntry {
    pub channel: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub conversation_id: String,
    pub command: String,
    /// Resolved role; absent when the actor was rejected before resolution.
    pub role: Option<String>,
    pub status: AuditStatus,
    pub denial_reason: Option<String>,
}

/// Outcome of an audited command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Ok,
    Error,
    Denied,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Denied => "denied",
        }
    }
}

/// A denied decision read back from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denied {
    pub timestamp: String,
    pub sender_id: String,
    pub command: String,
    pub reason: String,
}

/// Audit logger backed by SQLite.
#[derive(Clone)]
pub struct AuditLogger {
    pool: SqlitePool,
}

impl AuditLogger {
    /// Create a new audit logger sharing the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write an entry to the audit log.
    pub async fn log(&self, entry: &AuditEntry) -> Result<(), HeraldError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO audit_log \
             (id, channel, sender_id, sender_name, conversation_id, command, \
              role, status, denial_reason) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&entry.channel)
        .bind(&entry.sender_id)
        .bind(&entry.sender_name)
        .bind(&entry.conversation_id)
        .bind(&entry.command)
        .bind(&entry.role)
        .bind(entry.status.as_str())
        .bind(&entry.denial_reason)
        .execute(&self.pool)
        .await
        .map_err(|e| HeraldError::Storage(format!("audit log write failed: {e}")))?;

        debug!(
            "audit: {} {} [{}] {}",
            entry.channel,
            entry.sender_id,
            entry.status.as_str(),
            entry.command
        );

        Ok(())
    }

    /// Most recent denials, newest first.
    pub async fn recent_denied(&self, limit: i64) -> Result<Vec<Denied>, HeraldError> {
        let rows: Vec<(String, String, String, Option<String>)> = sqlx::query_as(
            "SELECT timestamp, sender_id, command, denial_reason FROM audit_log \
             WHERE status = 'denied' ORDER BY timestamp DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HeraldError::Storage(format!("audit log read failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(timestamp, sender_id, command, reason)| Denied {
                timestamp,
                sender_id,
                command,
                reason: reason.unwrap_or_default(),
            })
            .collect())
    }

    /// Entry counts per status: (ok, denied, error).
    pub async fn totals(&self) -> Result<(i64, i64, i64), HeraldError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM audit_log GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| HeraldError::Storage(format!("audit log read failed: {e}")))?;

        let mut totals = (0, 0, 0);
        for (status, count) in rows {
            match status.as_str() {
                "ok" => totals.0 = count,
                "denied" => totals.1 = count,
                _ => totals.2 += count,
            }
        }
        Ok(totals)
    }
}
