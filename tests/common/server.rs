//! Test server management.
//!
//! Spawns lobbyd instances for integration testing.

use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Seeded accounts, all with password `secret`: `alice`, `bob` and `carol`
/// are users, `mod` is privileged and `root` is an admin.
const ACCOUNTS: &str = r#"
[accounts]
registration_enabled = true

[accounts.hash_cost]
memory_kib = 64
iterations = 1

[[accounts.users]]
name = "alice"
password = "secret"

[[accounts.users]]
name = "bob"
password = "secret"

[[accounts.users]]
name = "carol"
password = "secret"

[[accounts.users]]
name = "mod"
password = "secret"
access = "privileged"

[[accounts.users]]
name = "root"
password = "secret"
access = "admin"
"#;

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    _dir: TempDir,
}

impl TestServer {
    /// Spawn a server on `port` with the default test configuration.
    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        Self::spawn_with(port, "").await
    }

    /// Spawn a server on `port`, appending `extra` TOML to the config.
    pub async fn spawn_with(port: u16, extra: &str) -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "lobby.test"
nat_port = 8201

[listen]
address = "127.0.0.1:{port}"

[timeouts]
tick_ms = 10

[motd]
lines = ["Test Lobby"]
{ACCOUNTS}
{extra}
"#
        );
        std::fs::write(&config_path, config_content)?;

        let binary_path = PathBuf::from(env!("CARGO_BIN_EXE_lobbyd"));
        let child = Command::new(&binary_path)
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .spawn()?;

        let server = Self {
            child,
            port,
            _dir: dir,
        };
        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Connect and consume the greeting.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        let mut client = super::client::TestClient::connect(&self.address()).await?;
        let greeting = client.recv().await?;
        anyhow::ensure!(greeting.starts_with("TASSERVER "), "unexpected greeting: {greeting}");
        Ok(client)
    }

    /// Connect and log in as `user`, consuming the login burst.
    pub async fn login(&self, user: &str) -> anyhow::Result<super::client::TestClient> {
        let mut client = self.connect().await?;
        client.login(user, "secret").await?;
        Ok(client)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
