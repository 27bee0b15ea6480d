//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("timeouts.tick_ms must be greater than zero")]
    ZeroTick,
    #[error("timeouts.idle_timeout_secs ({idle}) must exceed check_interval_secs ({check})")]
    IdleShorterThanCheck { idle: u64, check: u64 },
    #[error("security.{0} must be greater than zero")]
    ZeroSecurityValue(&'static str),
    #[error("security.flood_burst_bytes ({burst}) is below limits.max_line_length ({line})")]
    BurstBelowLineLength { burst: u32, line: usize },
    #[error("listen.read_chunk_size ({chunk}) exceeds security.flood_burst_bytes ({burst})")]
    ChunkAboveBurst { chunk: usize, burst: u32 },
    #[error("limits.{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("accounts.users has a duplicate name: {0}")]
    DuplicateUser(String),
    #[error("accounts.users has an empty name")]
    EmptyUserName,
    #[error("bans entry {0} matches nothing (set username, ip, cidr or user_id)")]
    EmptyBan(usize),
    #[error("geo country code must be two letters, got '{0}'")]
    InvalidCountry(String),
    #[error("motd.file does not exist: {0}")]
    MotdFileNotFound(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let timeouts = &config.timeouts;
    if timeouts.tick_ms == 0 {
        errors.push(ValidationError::ZeroTick);
    }
    if timeouts.idle_timeout_secs <= timeouts.check_interval_secs {
        errors.push(ValidationError::IdleShorterThanCheck {
            idle: timeouts.idle_timeout_secs,
            check: timeouts.check_interval_secs,
        });
    }

    let security = &config.security;
    for (name, value) in [
        ("login_attempt_threshold", u64::from(security.login_attempt_threshold)),
        ("flood_bytes_per_sec", u64::from(security.flood_bytes_per_sec)),
        ("flood_burst_bytes", u64::from(security.flood_burst_bytes)),
        ("max_failed_records", security.max_failed_records as u64),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroSecurityValue(name));
        }
    }
    if (security.flood_burst_bytes as usize) < config.limits.max_line_length {
        errors.push(ValidationError::BurstBelowLineLength {
            burst: security.flood_burst_bytes,
            line: config.limits.max_line_length,
        });
    }
    // A full read larger than the bucket could never pass the flood guard.
    if config.listen.read_chunk_size > security.flood_burst_bytes as usize {
        errors.push(ValidationError::ChunkAboveBurst {
            chunk: config.listen.read_chunk_size,
            burst: security.flood_burst_bytes,
        });
    }

    let limits = &config.limits;
    for (name, value) in [
        ("max_teams", limits.max_teams as usize),
        ("max_ally_teams", limits.max_ally_teams as usize),
        ("max_line_length", limits.max_line_length),
        ("max_recursion", limits.max_recursion),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroLimit(name));
        }
    }

    let mut seen = HashSet::new();
    for user in &config.accounts.users {
        if user.name.is_empty() {
            errors.push(ValidationError::EmptyUserName);
        } else if !seen.insert(user.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateUser(user.name.clone()));
        }
    }

    for (index, ban) in config.bans.iter().enumerate() {
        if ban.username.is_none() && ban.ip.is_none() && ban.cidr.is_none() && ban.user_id.is_none()
        {
            errors.push(ValidationError::EmptyBan(index));
        }
    }

    for entry in &config.geo {
        if entry.country.len() != 2 || !entry.country.bytes().all(|b| b.is_ascii_alphabetic()) {
            errors.push(ValidationError::InvalidCountry(entry.country.clone()));
        }
    }

    if let Some(ref file) = config.motd.file
        && !Path::new(file).exists()
    {
        errors.push(ValidationError::MotdFileNotFound(file.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r#"
[server]
name = "lobby.test"

[listen]
address = "127.0.0.1:8200"
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_server_name_fails() {
        let toml = r#"
[server]
name = ""

[listen]
address = "127.0.0.1:8200"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingServerName)));
    }

    #[test]
    fn test_collects_every_error() {
        let toml = r#"
[server]
name = "lobby.test"

[listen]
address = "127.0.0.1:8200"

[timeouts]
tick_ms = 0
idle_timeout_secs = 5

[[accounts.users]]
name = "alice"
password = "a"

[[accounts.users]]
name = "ALICE"
password = "b"

[[bans]]
reason = "nothing to match"

[[geo]]
cidr = "10.0.0.0/8"
country = "NLD"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroTick)));
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::IdleShorterThanCheck { .. }))
        );
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateUser(n) if n == "ALICE")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyBan(0))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidCountry(_))));
    }

    #[test]
    fn test_burst_must_cover_a_line() {
        let toml = r#"
[server]
name = "lobby.test"

[listen]
address = "127.0.0.1:8200"

[security]
flood_burst_bytes = 100
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::BurstBelowLineLength { burst: 100, .. }))
        );
    }

    #[test]
    fn test_read_chunk_must_fit_in_burst() {
        let toml = r#"
[server]
name = "lobby.test"

[listen]
address = "127.0.0.1:8200"
read_chunk_size = 32768

[security]
flood_burst_bytes = 16384
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::ChunkAboveBurst {
                chunk: 32768,
                burst: 16384
            }
        )));
    }
}
