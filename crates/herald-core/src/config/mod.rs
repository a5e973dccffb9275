mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::HeraldError;
use crate::sanitize::is_valid_actor_id;
use defaults::*;

/// Env var that overrides `[owner].secret`.
pub const OWNER_SECRET_ENV: &str = "HERALD_OWNER_SECRET";
/// Env var that overrides `[channel.telegram].bot_token`.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Top-level Herald configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub herald: HeraldConfig,
    #[serde(default)]
    pub owner: OwnerConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// General agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeraldConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Single-character command prefix. `/` is always accepted as well.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for HeraldConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            prefix: default_prefix(),
        }
    }
}

/// The single designated owner and the secret that seals the owner record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerConfig {
    #[serde(default)]
    pub id: String,
    /// Operator-provisioned trust secret. Never derived from host identifiers.
    #[serde(default)]
    pub secret: String,
}

/// Authorization, rate limiting, and abuse tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Invocations allowed per (actor, command) inside the rate window.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,
    /// Suspicious events inside the abuse window that trigger a block.
    #[serde(default = "default_abuse_threshold")]
    pub abuse_threshold: usize,
    #[serde(default = "default_abuse_window_secs")]
    pub abuse_window_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Seed for the admin roster when no persisted roster exists yet.
    #[serde(default)]
    pub admins: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            rate_window_secs: default_rate_window_secs(),
            abuse_threshold: default_abuse_threshold(),
            abuse_window_secs: default_abuse_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            admins: Vec::new(),
        }
    }
}

/// Broadcast cadence and line-set storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Directory of `<name>.json` line sets. Empty = `{data_dir}/linesets`.
    #[serde(default)]
    pub lines_dir: String,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            lines_dir: String::new(),
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub telegram: Option<TelegramConfig>,
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
}

/// SQLite audit/statistics store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Config {
    /// Expanded data directory.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.herald.data_dir))
    }

    /// Directory holding line-set JSON files.
    pub fn lines_dir(&self) -> PathBuf {
        if self.broadcast.lines_dir.is_empty() {
            self.data_dir().join("linesets")
        } else {
            PathBuf::from(shellexpand(&self.broadcast.lines_dir))
        }
    }

    /// Persisted admin roster.
    pub fn admins_path(&self) -> PathBuf {
        self.data_dir().join("admins.json")
    }

    /// Tamper-evident owner record.
    pub fn owner_record_path(&self) -> PathBuf {
        self.data_dir().join("owner.lock")
    }

    /// Daily-rolling log directory.
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    /// The prefix as a char, if it is exactly one character.
    pub fn prefix_char(&self) -> Option<char> {
        let mut chars = self.herald.prefix.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    /// Apply environment overrides for secrets.
    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var(OWNER_SECRET_ENV) {
            if !secret.is_empty() {
                self.owner.secret = secret;
            }
        }
        if let Ok(token) = std::env::var(TELEGRAM_TOKEN_ENV) {
            if !token.is_empty() {
                let tg = self.channel.telegram.get_or_insert_with(Default::default);
                tg.bot_token = token;
            }
        }
    }

    /// Check the configuration for values the agent cannot run with.
    /// Returns one message per problem; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match self.prefix_char() {
            Some(c) if !c.is_alphanumeric() && !c.is_whitespace() => {}
            _ => errors.push(format!(
                "prefix must be a single non-alphanumeric character, got '{}'",
                self.herald.prefix
            )),
        }

        if !is_valid_actor_id(&self.owner.id) {
            errors.push(format!("owner id '{}' is not a numeric id", self.owner.id));
        }
        if self.owner.secret.is_empty() {
            errors.push(format!(
                "owner secret is empty (set [owner].secret or {OWNER_SECRET_ENV})"
            ));
        }

        for (i, admin) in self.guard.admins.iter().enumerate() {
            if !is_valid_actor_id(admin.trim()) {
                errors.push(format!("invalid admin id at index {i}: {admin}"));
            }
        }

        if self.guard.rate_limit == 0 || self.guard.rate_window_secs == 0 {
            errors.push("rate_limit and rate_window_secs must be positive".to_string());
        }
        if self.guard.abuse_threshold == 0 || self.guard.abuse_window_secs == 0 {
            errors.push("abuse_threshold and abuse_window_secs must be positive".to_string());
        }

        if self.broadcast.min_delay_ms > self.broadcast.max_delay_ms {
            errors.push(format!(
                "min_delay_ms ({}) exceeds max_delay_ms ({})",
                self.broadcast.min_delay_ms, self.broadcast.max_delay_ms
            ));
        }

        errors
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file, then apply env overrides.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, HeraldError> {
    let path = Path::new(path);
    let mut config = if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HeraldError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| HeraldError::Config(format!("failed to parse config: {}", e)))?
    };

    config.apply_env();
    Ok(config)
}
