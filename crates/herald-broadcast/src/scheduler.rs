//! Per-conversation broadcast jobs.
//!
//! Each running job is a spawned task that sleeps for a freshly drawn delay,
//! emits the next line of its set, and wraps around at the end. Cancelling a
//! job aborts its task and waits for it to finish, so once `stop` returns the
//! job can never emit again. A send that is in flight at that moment is
//! abandoned. Sends are bounded by a timeout so a stalled channel only delays
//! its own conversation.

use crate::delay::DelayPolicy;
use crate::lineset::LineSetStore;
use chrono::{DateTime, Utc};
use herald_core::error::HeraldError;
use herald_core::message::OutgoingMessage;
use herald_core::traits::Channel;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Upper bound on a single broadcast send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Public view of a running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub conversation_id: String,
    pub line_set: String,
    pub next_index: usize,
    pub emitted: u64,
    pub started_at: DateTime<Utc>,
}

/// Result of a successful `start`.
#[derive(Debug, Clone)]
pub struct StartReport {
    pub line_set: String,
    pub lines: usize,
    /// The job this start replaced, if one was running.
    pub replaced: Option<JobInfo>,
}

#[derive(Default)]
struct Progress {
    next_index: AtomicUsize,
    emitted: AtomicU64,
}

struct BroadcastJob {
    line_set: String,
    started_at: DateTime<Utc>,
    progress: Arc<Progress>,
    handle: JoinHandle<()>,
}

impl BroadcastJob {
    fn info(&self, conversation_id: &str) -> JobInfo {
        JobInfo {
            conversation_id: conversation_id.to_string(),
            line_set: self.line_set.clone(),
            next_index: self.progress.next_index.load(Ordering::SeqCst),
            emitted: self.progress.emitted.load(Ordering::SeqCst),
            started_at: self.started_at,
        }
    }

    /// Abort the task and wait until it has fully unwound.
    async fn cancel(mut self, conversation_id: &str) -> JobInfo {
        self.handle.abort();
        let _ = (&mut self.handle).await;
        self.info(conversation_id)
    }
}

impl Drop for BroadcastJob {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Owns every broadcast job for one channel, keyed by conversation.
///
/// The registry lock is only held for map updates; cancellation happens
/// after it is released.
pub struct BroadcastScheduler {
    channel: Arc<dyn Channel>,
    line_sets: Arc<dyn LineSetStore>,
    policy: Arc<DelayPolicy>,
    send_timeout: Duration,
    jobs: Mutex<HashMap<String, BroadcastJob>>,
}

impl BroadcastScheduler {
    pub fn new(
        channel: Arc<dyn Channel>,
        line_sets: Arc<dyn LineSetStore>,
        policy: Arc<DelayPolicy>,
    ) -> Self {
        Self {
            channel,
            line_sets,
            policy,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Override the per-send timeout.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    pub fn line_sets(&self) -> &Arc<dyn LineSetStore> {
        &self.line_sets
    }

    pub fn policy(&self) -> &Arc<DelayPolicy> {
        &self.policy
    }

    /// Start broadcasting `line_set` into a conversation, replacing any job
    /// already running there. A missing or empty set leaves the registry untouched.
    pub async fn start(
        &self,
        conversation_id: &str,
        line_set: &str,
    ) -> Result<StartReport, HeraldError> {
        let lines = self.line_sets.load(line_set)?;
        if lines.is_empty() {
            return Err(HeraldError::NotFound(format!("line set '{line_set}' is empty")));
        }
        let count = lines.len();

        let progress = Arc::new(Progress::default());
        let handle = tokio::spawn(run_job(
            self.channel.clone(),
            self.policy.clone(),
            self.send_timeout,
            conversation_id.to_string(),
            line_set.to_string(),
            lines,
            progress.clone(),
        ));
        let job = BroadcastJob {
            line_set: line_set.to_string(),
            started_at: Utc::now(),
            progress,
            handle,
        };

        let old = self
            .jobs
            .lock()
            .await
            .insert(conversation_id.to_string(), job);
        let replaced = match old {
            Some(old) => Some(old.cancel(conversation_id).await),
            None => None,
        };

        match &replaced {
            Some(old) => info!(
                "broadcast in {conversation_id} switched from '{}' to '{line_set}' ({count} lines)",
                old.line_set
            ),
            None => info!("broadcast started in {conversation_id}: '{line_set}' ({count} lines)"),
        }

        Ok(StartReport {
            line_set: line_set.to_string(),
            lines: count,
            replaced,
        })
    }

    /// Stop the job in a conversation. `None` means nothing was running.
    pub async fn stop(&self, conversation_id: &str) -> Option<JobInfo> {
        let job = self.jobs.lock().await.remove(conversation_id)?;
        let info = job.cancel(conversation_id).await;
        info!(
            "broadcast stopped in {conversation_id} after {} lines",
            info.emitted
        );
        Some(info)
    }

    /// Stop every job. Returns how many were running.
    pub async fn emergency_stop_all(&self) -> usize {
        let drained: Vec<(String, BroadcastJob)> = self.jobs.lock().await.drain().collect();
        let count = drained.len();
        for (conversation_id, job) in drained {
            job.cancel(&conversation_id).await;
        }
        if count > 0 {
            warn!("emergency stop: {count} broadcasts halted");
        }
        count
    }

    /// Running jobs, sorted by conversation.
    pub async fn active(&self) -> Vec<JobInfo> {
        let jobs = self.jobs.lock().await;
        let mut list: Vec<JobInfo> = jobs.iter().map(|(id, job)| job.info(id)).collect();
        list.sort_by(|a, b| a.conversation_id.cmp(&b.conversation_id));
        list
    }

    pub async fn is_active(&self, conversation_id: &str) -> bool {
        self.jobs.lock().await.contains_key(conversation_id)
    }
}

async fn run_job(
    channel: Arc<dyn Channel>,
    policy: Arc<DelayPolicy>,
    send_timeout: Duration,
    conversation_id: String,
    line_set: String,
    lines: Vec<String>,
    progress: Arc<Progress>,
) {
    let mut tick: u64 = 0;
    loop {
        tick += 1;
        let delay = policy.jittered(tick);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let index = progress.next_index.load(Ordering::SeqCst) % lines.len();
        let message = OutgoingMessage::new(&conversation_id, &lines[index]);
        match tokio::time::timeout(send_timeout, channel.send(message)).await {
            Ok(Ok(())) => {
                progress.emitted.fetch_add(1, Ordering::SeqCst);
                debug!("broadcast '{line_set}' line {index} -> {conversation_id}");
            }
            Ok(Err(e)) => {
                warn!("broadcast '{line_set}' send to {conversation_id} failed: {e}");
            }
            Err(_) => {
                warn!(
                    "broadcast '{line_set}' send to {conversation_id} timed out after {}s",
                    send_timeout.as_secs()
                );
            }
        }
        progress
            .next_index
            .store((index + 1) % lines.len(), Ordering::SeqCst);
    }
}
