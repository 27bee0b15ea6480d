//! Seed data for the in-memory account, ban and geo collaborators.

use ipnet::IpNet;
use serde::Deserialize;
use std::net::IpAddr;

use super::types::default_true;
use crate::state::Access;

/// Account store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    /// Whether `REGISTER` creates accounts (default: true).
    #[serde(default = "default_true")]
    pub registration_enabled: bool,
    /// Argon2 cost used when hashing new passwords.
    #[serde(default)]
    pub hash_cost: HashCost,
    /// Pre-provisioned accounts.
    #[serde(default)]
    pub users: Vec<UserBlock>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            registration_enabled: true,
            hash_cost: HashCost::default(),
            users: Vec::new(),
        }
    }
}

/// Argon2 parameters for newly hashed passwords.
///
/// Stored hashes carry their own parameters, so lowering these only affects
/// accounts created afterwards.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HashCost {
    /// Memory in KiB (default: 19456).
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    /// Iterations (default: 2).
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
        }
    }
}

fn default_memory_kib() -> u32 {
    19456
}

fn default_iterations() -> u32 {
    2
}

/// A provisioned account.
#[derive(Debug, Clone, Deserialize)]
pub struct UserBlock {
    pub name: String,
    /// Argon2 PHC string, or a plaintext password hashed at startup.
    pub password: String,
    #[serde(default = "default_access")]
    pub access: Access,
    pub email: Option<String>,
}

fn default_access() -> Access {
    Access::User
}

/// A ban record. Any of `username`, `ip`, `cidr` or `user_id` may match.
#[derive(Debug, Clone, Deserialize)]
pub struct BanEntry {
    pub username: Option<String>,
    pub ip: Option<IpAddr>,
    pub cidr: Option<IpNet>,
    pub user_id: Option<u32>,
    #[serde(default)]
    pub reason: String,
    /// Expiry as unix seconds; absent means permanent.
    pub expires: Option<i64>,
}

/// One row of the IP range to country table.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoEntry {
    pub cidr: IpNet,
    pub country: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_block_defaults_to_user_access() {
        let user: UserBlock = toml::from_str(
            r#"
name = "alice"
password = "secret"
"#,
        )
        .unwrap();
        assert_eq!(user.access, Access::User);
        assert!(user.email.is_none());
    }

    #[test]
    fn ban_entry_parses_cidr() {
        let ban: BanEntry = toml::from_str(
            r#"
cidr = "10.1.0.0/16"
reason = "abuse"
"#,
        )
        .unwrap();
        assert_eq!(ban.cidr, Some("10.1.0.0/16".parse().unwrap()));
        assert!(ban.expires.is_none());
    }

    #[test]
    fn access_levels_parse_by_name() {
        let user: UserBlock = toml::from_str(
            r#"
name = "root"
password = "x"
access = "admin"
"#,
        )
        .unwrap();
        assert_eq!(user.access, Access::Admin);
    }
}
