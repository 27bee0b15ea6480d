//! Security configuration: failed-login guard and flood limits.

use serde::Deserialize;
use std::time::Duration;

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Failed logins for one username before further attempts are refused (default: 3).
    #[serde(default = "default_login_attempt_threshold")]
    pub login_attempt_threshold: u32,
    /// Seconds a failed-login record is retained (default: 30).
    #[serde(default = "default_login_block_secs")]
    pub login_block_secs: u64,
    /// Seconds between two purges of stale failed-login records (default: 1).
    #[serde(default = "default_login_purge_interval")]
    pub login_purge_interval_secs: u64,
    /// Maximum failed-login records kept at once (default: 1024).
    #[serde(default = "default_max_failed_records")]
    pub max_failed_records: usize,
    /// Sustained inbound bytes per second per session (default: 4096).
    #[serde(default = "default_flood_bytes_per_sec")]
    pub flood_bytes_per_sec: u32,
    /// Inbound burst allowance in bytes (default: 16384).
    #[serde(default = "default_flood_burst_bytes")]
    pub flood_burst_bytes: u32,
    /// Reject unknown keys in named-argument commands instead of ignoring them.
    #[serde(default)]
    pub strict_named_arguments: bool,
}

impl SecurityConfig {
    pub fn login_block(&self) -> Duration {
        Duration::from_secs(self.login_block_secs)
    }

    pub fn login_purge_interval(&self) -> Duration {
        Duration::from_secs(self.login_purge_interval_secs)
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            login_attempt_threshold: default_login_attempt_threshold(),
            login_block_secs: default_login_block_secs(),
            login_purge_interval_secs: default_login_purge_interval(),
            max_failed_records: default_max_failed_records(),
            flood_bytes_per_sec: default_flood_bytes_per_sec(),
            flood_burst_bytes: default_flood_burst_bytes(),
            strict_named_arguments: false,
        }
    }
}

fn default_login_attempt_threshold() -> u32 {
    3
}

fn default_login_block_secs() -> u64 {
    30
}

fn default_login_purge_interval() -> u64 {
    1
}

fn default_max_failed_records() -> usize {
    1024
}

fn default_flood_bytes_per_sec() -> u32 {
    4096
}

fn default_flood_burst_bytes() -> u32 {
    16384
}
