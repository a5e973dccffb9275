use super::Store;
use crate::audit::{AuditEntry, AuditStatus};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Create an in-memory store for testing.
async fn test_store() -> Store {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .unwrap();
    Store::run_migrations(&pool).await.unwrap();
    Store { pool }
}

fn entry(sender: &str, command: &str, status: AuditStatus, reason: Option<&str>) -> AuditEntry {
    AuditEntry {
        channel: "telegram".to_string(),
        sender_id: sender.to_string(),
        sender_name: None,
        conversation_id: "chat1".to_string(),
        command: command.to_string(),
        role: Some("user".to_string()),
        status,
        denial_reason: reason.map(str::to_string),
    }
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let store = test_store().await;
    Store::run_migrations(&store.pool).await.unwrap();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
        .fetch_one(&store.pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_audit_log_and_denials() {
    let store = test_store().await;
    let audit = store.audit();
    audit
        .log(&entry("100000000001", "help", AuditStatus::Ok, None))
        .await
        .unwrap();
    audit
        .log(&entry("100000000002", "block", AuditStatus::Denied, Some("forbidden")))
        .await
        .unwrap();
    audit
        .log(&entry("100000000003", "ping", AuditStatus::Denied, Some("blocked")))
        .await
        .unwrap();

    assert_eq!(audit.totals().await.unwrap(), (1, 2, 0));

    let denied = audit.recent_denied(1).await.unwrap();
    assert_eq!(denied.len(), 1);
    assert_eq!(denied[0].sender_id, "100000000003");
    assert_eq!(denied[0].reason, "blocked");
}

#[tokio::test]
async fn test_record_command_counts() {
    let store = test_store().await;
    store.record_command("help", "100000000001", true).await.unwrap();
    store.record_command("help", "100000000001", true).await.unwrap();
    store.record_command("help", "100000000002", false).await.unwrap();

    let stats = store.command_stats("help").await.unwrap().unwrap();
    assert_eq!(stats.invocations, 3);
    assert_eq!(stats.successes, 2);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.distinct_users, 2);

    assert!(store.command_stats("ping").await.unwrap().is_none());
}

#[tokio::test]
async fn test_usage_summary() {
    let store = test_store().await;
    let empty = store.usage_summary(5).await.unwrap();
    assert_eq!(empty.total_commands, 0);
    assert_eq!(empty.success_rate(), None);

    for _ in 0..3 {
        store.record_command("ping", "100000000001", true).await.unwrap();
    }
    store.record_command("help", "100000000002", true).await.unwrap();
    store.record_command("startfun", "100000000002", false).await.unwrap();

    let summary = store.usage_summary(2).await.unwrap();
    assert_eq!(summary.total_commands, 5);
    assert_eq!(summary.successes, 4);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.distinct_users, 2);
    assert_eq!(
        summary.top,
        vec![("ping".to_string(), 3), ("help".to_string(), 1)]
    );
    assert_eq!(summary.success_rate(), Some(80.0));
}

#[tokio::test]
async fn test_db_size_is_page_multiple() {
    let store = test_store().await;
    let (page_size,): (i64,) = sqlx::query_as("PRAGMA page_size")
        .fetch_one(&store.pool)
        .await
        .unwrap();
    let size = store.db_size().await.unwrap();
    assert!(size > 0);
    assert_eq!(size % page_size as u64, 0);
}
