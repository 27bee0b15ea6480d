//! lobbyd - lobby server for multiplayer game coordination.
//!
//! Accounts, chat channels and battle rooms served over a line-oriented TCP
//! protocol by a single-threaded reactor.

mod config;
mod error;
mod handlers;
mod network;
mod security;
mod services;
mod state;

use crate::config::{Config, validate};
use crate::handlers::Registry;
use crate::network::{Gateway, Reactor};
use crate::services::Services;
use crate::state::Matrix;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(
        server = %config.server.name,
        protocol = %config.server.protocol_version,
        "Starting lobbyd"
    );

    let services = Services::from_config(&config)?;
    let now = Instant::now();
    let matrix = Matrix::new(&config, services, now);
    let registry = Registry::new(
        config.limits.max_recursion,
        config.security.strict_named_arguments,
    )?;
    let reactor = Reactor::new(matrix, registry, config.timeouts.tick(), now);
    let gateway = Gateway::bind(&config, reactor).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => cancel.cancel(),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
    }

    gateway.run(cancel).await?;
    info!("Shutdown complete");
    Ok(())
}
