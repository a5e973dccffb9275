//! Serde default functions for config fields.

pub(super) fn default_name() -> String {
    "Herald".to_string()
}

pub(super) fn default_data_dir() -> String {
    "~/.herald".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_prefix() -> String {
    "!".to_string()
}

pub(super) fn default_rate_limit() -> usize {
    10
}

pub(super) fn default_rate_window_secs() -> u64 {
    60
}

pub(super) fn default_abuse_threshold() -> usize {
    3
}

pub(super) fn default_abuse_window_secs() -> u64 {
    3600
}

pub(super) fn default_sweep_interval_secs() -> u64 {
    300
}

pub(super) fn default_min_delay_ms() -> u64 {
    300
}

pub(super) fn default_max_delay_ms() -> u64 {
    600
}

pub(super) fn default_db_path() -> String {
    "~/.herald/data/herald.db".to_string()
}
