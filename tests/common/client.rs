//! Test lobby client.
//!
//! Sends raw protocol lines and asserts on the lines received.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test lobby client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }

    /// Send one line; a newline is appended.
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Write raw bytes without framing.
    #[allow(dead_code)]
    pub async fn send_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one line.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        anyhow::ensure!(n > 0, "connection closed");
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Receive lines until one satisfies `predicate`; returns all of them.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut lines = Vec::new();
        loop {
            let line = self.recv().await?;
            let done = predicate(&line);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Skip lines until one starts with `prefix` and return it.
    pub async fn expect(&mut self, prefix: &str) -> anyhow::Result<String> {
        let lines = self.recv_until(|l| l.starts_with(prefix)).await?;
        Ok(lines.into_iter().last().unwrap_or_default())
    }

    /// Drain whatever arrives within a short quiet period.
    #[allow(dead_code)]
    pub async fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.recv_timeout(Duration::from_millis(100)).await {
            lines.push(line);
        }
        lines
    }

    /// Log in and consume the burst up to `LOGININFOEND`.
    pub async fn login(&mut self, user: &str, password: &str) -> anyhow::Result<Vec<String>> {
        self.login_with_flags(user, password, "sp").await
    }

    /// Log in announcing the given compatibility flags.
    pub async fn login_with_flags(
        &mut self,
        user: &str,
        password: &str,
        flags: &str,
    ) -> anyhow::Result<Vec<String>> {
        self.send(&format!(
            "LOGIN {user} {password} 3200 * TestLobby 1.0\t0\t{flags}"
        ))
        .await?;
        let first = self.recv().await?;
        anyhow::ensure!(first == format!("ACCEPTED {user}"), "login refused: {first}");
        let mut burst = vec![first];
        burst.extend(self.recv_until(|l| l == "LOGININFOEND").await?);
        Ok(burst)
    }

    /// Whether the server has closed the connection.
    #[allow(dead_code)]
    pub async fn is_closed(&mut self) -> bool {
        loop {
            match self.recv_timeout(Duration::from_secs(2)).await {
                Ok(_) => continue,
                Err(e) => {
                    return e.to_string() == "connection closed"
                        || e.downcast_ref::<std::io::Error>().is_some();
                }
            }
        }
    }
}
