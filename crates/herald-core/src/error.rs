use thiserror::Error;

/// Top-level error type for Herald.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Actor is on the block list (or the gate is in lockdown).
    #[error("actor is blocked")]
    Blocked,

    /// Role is insufficient for the command.
    #[error("'{command}' is not permitted for role {role}")]
    Forbidden { command: String, role: String },

    /// Too many invocations inside the sliding window.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Unknown line set, job, or other named resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Owner record failed its tamper-evident check.
    #[error("integrity failure: {0}")]
    Integrity(String),

    /// Outbound emission failed. Never fatal for a broadcast job.
    #[error("send failed: {0}")]
    Send(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persistent storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Rejected user input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HeraldError {
    /// Whether this error is an authorization rejection rather than a fault.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::Blocked | Self::Forbidden { .. } | Self::RateLimited { .. }
        )
    }
}
