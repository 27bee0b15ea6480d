//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::accounts::{AccountsConfig, BanEntry, GeoEntry};
use super::limits::LimitsConfig;
use super::listen::ListenConfig;
use super::security::SecurityConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    pub server: ServerConfig,
    /// Network listen configuration.
    pub listen: ListenConfig,
    /// Reactor tick and idle timeout settings.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Abuse guard and flood settings.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Engine and protocol limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Account store seed and registration toggle.
    #[serde(default)]
    pub accounts: AccountsConfig,
    /// Ban list seed.
    #[serde(default)]
    pub bans: Vec<BanEntry>,
    /// IP range to country code table.
    #[serde(default)]
    pub geo: Vec<GeoEntry>,
    /// Message of the Day configuration.
    #[serde(default)]
    pub motd: MotdConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, used in operator notices.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Protocol version announced in the `TASSERVER` greeting.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    /// UDP port advertised for NAT hole punching (`0` = none).
    #[serde(default)]
    pub nat_port: u16,
}

fn default_protocol_version() -> String {
    "0.38".to_string()
}

/// Reactor timing.
///
/// Timers are polled cooperatively, so their granularity is bounded by
/// `tick_ms`.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    /// Reactor tick interval in milliseconds (default: 50).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Minimum seconds between two idle scans (default: 5).
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Seconds without any received byte before a session is dropped (default: 50).
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl TimeoutsConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            check_interval_secs: default_check_interval(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_tick_ms() -> u64 {
    50
}

fn default_check_interval() -> u64 {
    5
}

fn default_idle_timeout() -> u64 {
    50
}

pub(super) fn default_true() -> bool {
    true
}

/// Message of the Day (MOTD) configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MotdConfig {
    /// Path to MOTD file (one line per MOTD line).
    pub file: Option<String>,
    /// Inline MOTD lines (used when `file` is not set or unreadable).
    #[serde(default)]
    pub lines: Vec<String>,
}

impl MotdConfig {
    /// Load MOTD lines from file, or return the default greeting.
    pub fn load_lines(&self) -> Vec<String> {
        if let Some(ref path) = self.file {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    return content.lines().map(|s| s.to_string()).collect();
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Failed to read MOTD file");
                }
            }
        }

        if !self.lines.is_empty() {
            return self.lines.clone();
        }

        vec![
            "Welcome to lobbyd!".to_string(),
            "Open a battle or join one to get started.".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_default_values() {
        let config = TimeoutsConfig::default();
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.check_interval_secs, 5);
        assert_eq!(config.idle_timeout_secs, 50);
        assert_eq!(config.tick(), Duration::from_millis(50));
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[server]
name = "lobby.test"

[listen]
address = "127.0.0.1:8200"
"#,
        )
        .unwrap();
        assert_eq!(config.server.protocol_version, "0.38");
        assert_eq!(config.server.nat_port, 0);
        assert_eq!(config.listen.send_buffer_size, 16384);
        assert_eq!(config.security.login_attempt_threshold, 3);
        assert_eq!(config.limits.max_teams, 16);
        assert!(config.accounts.registration_enabled);
        assert!(config.bans.is_empty());
    }

    #[test]
    fn motd_load_lines_returns_default_when_empty() {
        let lines = MotdConfig::default().load_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Welcome"));
    }

    #[test]
    fn motd_load_lines_returns_inline_lines() {
        let motd = MotdConfig {
            file: None,
            lines: vec!["Line 1".to_string(), "Line 2".to_string()],
        };
        assert_eq!(motd.load_lines(), vec!["Line 1", "Line 2"]);
    }

    #[test]
    fn motd_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motd.txt");
        std::fs::write(&path, "From file\nSecond").unwrap();
        let motd = MotdConfig {
            file: Some(path.display().to_string()),
            lines: vec!["Inline".to_string()],
        };
        assert_eq!(motd.load_lines(), vec!["From file", "Second"]);
    }

    #[test]
    fn motd_missing_file_falls_back_to_inline() {
        let motd = MotdConfig {
            file: Some("/nonexistent/motd.txt".to_string()),
            lines: vec!["Inline".to_string()],
        };
        assert_eq!(motd.load_lines(), vec!["Inline"]);
    }
}
