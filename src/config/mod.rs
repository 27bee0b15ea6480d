//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, TimeoutsConfig, MotdConfig)
//! - [`listen`]: Network listener configuration (ListenConfig)
//! - [`security`]: Abuse guard and flood limits (SecurityConfig)
//! - [`limits`]: Engine and protocol limits (LimitsConfig)
//! - [`accounts`]: Seed data for the in-memory collaborators (accounts, bans, geo table)
//! - [`validation`]: Startup checks returning every problem found

mod accounts;
mod limits;
mod listen;
mod security;
mod types;
mod validation;

pub use accounts::{AccountsConfig, BanEntry, GeoEntry, HashCost, UserBlock};
pub use limits::LimitsConfig;
pub use listen::ListenConfig;
pub use security::SecurityConfig;
pub use types::{Config, ConfigError, MotdConfig, ServerConfig, TimeoutsConfig};
pub use validation::{ValidationError, validate};
