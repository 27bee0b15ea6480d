//! Per-connection session state.
//!
//! A [`Session`] owns its receive accumulator and outbound queue. Writes are
//! never awaited: [`Session::try_flush`] pushes as much as the transport
//! accepts right now and leaves the rest queued for the next tick.

use crate::security::FloodGuard;
use crate::services::Account;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use lobby_proto::{BattleStatus, ClientStatus, LineBuffer, TeamColor};
use serde::Deserialize;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use super::BattleId;

/// Arena key for a connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account access level, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Not logged in.
    #[default]
    None,
    User,
    Privileged,
    Admin,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::User => "user",
            Self::Privileged => "privileged",
            Self::Admin => "admin",
        })
    }
}

/// Non-blocking write side of a connection.
pub trait Transport: Send {
    /// Write as much of `buf` as possible without blocking.
    ///
    /// Returns `ErrorKind::WouldBlock` when nothing can be written right now.
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Stop reading and release the connection.
    fn close(&mut self);
}

/// Result of a flush attempt.
#[derive(Debug)]
pub enum Flush {
    /// The outbound queue is empty.
    Drained,
    /// Data is still queued; retry on a later tick.
    Pending,
    /// The transport failed; the session must be torn down.
    Failed(io::Error),
}

/// What happened to a line handed to [`Session::send_line`].
#[derive(Debug)]
pub enum Delivery {
    Sent,
    Queued,
    Batched,
    Dropped,
    Failed(io::Error),
}

/// A LOGIN or REGISTER waiting on its credential job.
#[derive(Debug)]
pub struct PendingAuth {
    /// Echo id of the command that queued the job.
    pub echo: Option<u32>,
    pub request: AuthRequest,
}

#[derive(Debug)]
pub enum AuthRequest {
    Login(LoginRequest),
    Register { name: String, email: Option<String> },
}

/// What a LOGIN line carried, held until the password is checked.
#[derive(Debug)]
pub struct LoginRequest {
    pub account: Account,
    pub cpu: u32,
    pub lobby: String,
    pub user_id: Option<u32>,
    pub compat: BTreeSet<String>,
}

/// A connected client.
pub struct Session {
    pub id: SessionId,
    pub addr: SocketAddr,
    pub account: Option<Account>,
    pub status: ClientStatus,
    pub cpu: u32,
    pub lobby_name: String,
    /// Client-reported installation id, if any.
    pub user_id: Option<u32>,
    pub compat: BTreeSet<String>,
    pub country: String,
    pub battle: Option<BattleId>,
    pub requested_battle: Option<BattleId>,
    pub battle_status: BattleStatus,
    pub color: TeamColor,
    pub script_password: Option<String>,
    pub channels: BTreeSet<String>,
    /// At most one credential job in flight.
    pub pending_auth: Option<PendingAuth>,
    pub last_recv: Instant,
    pub flood: FloodGuard,
    pub(crate) retry_queued: bool,
    recv: LineBuffer,
    outbound: VecDeque<Bytes>,
    echo_id: Option<u32>,
    batch: Option<Vec<String>>,
    alive: bool,
    half_dead: bool,
    transport: Box<dyn Transport>,
}

impl Session {
    pub fn new(
        id: SessionId,
        addr: SocketAddr,
        transport: Box<dyn Transport>,
        flood: FloodGuard,
        now: Instant,
    ) -> Self {
        Self {
            id,
            addr,
            account: None,
            status: ClientStatus::default(),
            cpu: 0,
            lobby_name: String::new(),
            user_id: None,
            compat: BTreeSet::new(),
            country: String::new(),
            battle: None,
            requested_battle: None,
            battle_status: BattleStatus::DEFAULT,
            color: TeamColor::default(),
            script_password: None,
            channels: BTreeSet::new(),
            pending_auth: None,
            last_recv: now,
            flood,
            retry_queued: false,
            recv: LineBuffer::new(),
            outbound: VecDeque::new(),
            echo_id: None,
            batch: None,
            alive: true,
            half_dead: false,
            transport,
        }
    }

    /// Account name once logged in.
    pub fn name(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.name.as_str())
    }

    /// Name for log lines, `-` before login.
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or("-")
    }

    pub fn access(&self) -> Access {
        self.account.as_ref().map_or(Access::None, |a| a.access)
    }

    pub fn is_authenticated(&self) -> bool {
        self.account.is_some()
    }

    /// Whether the founder of a battle wants to approve every join.
    pub fn wants_join_approval(&self) -> bool {
        self.compat.contains("b")
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_half_dead(&self) -> bool {
        self.half_dead
    }

    /// Alive and not scheduled for teardown.
    pub fn is_active(&self) -> bool {
        self.alive && !self.half_dead
    }

    /// Stop all further I/O; teardown happens later.
    pub fn mark_half_dead(&mut self) {
        self.half_dead = true;
    }

    pub fn set_echo(&mut self, id: Option<u32>) {
        self.echo_id = id;
    }

    pub fn echo(&self) -> Option<u32> {
        self.echo_id
    }

    /// Append received bytes to the accumulator.
    pub fn receive(&mut self, bytes: &[u8]) {
        self.recv.extend(bytes);
    }

    pub fn read_line(&mut self) -> Option<String> {
        self.recv.read_line()
    }

    /// Bytes buffered after the last newline.
    pub fn partial_line_len(&self) -> usize {
        self.recv.pending_partial()
    }

    pub fn has_pending_output(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Queue one line for delivery and try to push it out immediately.
    ///
    /// While an echo id is set the line is prefixed with `#<id> `. While a
    /// fast write is open the line joins the batch instead.
    pub fn send_line(&mut self, line: &str) -> Delivery {
        if !self.is_active() {
            return Delivery::Dropped;
        }
        let line = match self.echo_id {
            Some(id) => format!("#{id} {line}"),
            None => line.to_string(),
        };
        if let Some(batch) = self.batch.as_mut() {
            batch.push(line);
            return Delivery::Batched;
        }

        let mut chunk = BytesMut::with_capacity(line.len() + 1);
        chunk.extend_from_slice(line.as_bytes());
        chunk.put_u8(b'\n');
        self.outbound.push_back(chunk.freeze());
        self.deliver()
    }

    /// Open a fast write; lines are held until [`Session::end_batch`].
    pub fn begin_batch(&mut self) {
        if self.batch.is_none() {
            self.batch = Some(Vec::new());
        }
    }

    /// Close the fast write and queue its lines as one unit.
    pub fn end_batch(&mut self) -> Delivery {
        let Some(lines) = self.batch.take() else {
            return Delivery::Sent;
        };
        if lines.is_empty() || !self.is_active() {
            return Delivery::Dropped;
        }
        let mut chunk = BytesMut::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in &lines {
            chunk.extend_from_slice(line.as_bytes());
            chunk.put_u8(b'\n');
        }
        self.outbound.push_back(chunk.freeze());
        self.deliver()
    }

    fn deliver(&mut self) -> Delivery {
        match self.try_flush() {
            Flush::Drained => Delivery::Sent,
            Flush::Pending => Delivery::Queued,
            Flush::Failed(e) => Delivery::Failed(e),
        }
    }

    /// Write queued chunks until the queue is empty or the transport stalls.
    ///
    /// A partial write advances the front chunk and stops.
    pub fn try_flush(&mut self) -> Flush {
        if !self.alive {
            return Flush::Drained;
        }
        while let Some(front) = self.outbound.front_mut() {
            match self.transport.try_write(front) {
                Ok(n) if n >= front.len() => {
                    self.outbound.pop_front();
                }
                Ok(n) => {
                    front.advance(n);
                    return Flush::Pending;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Flush::Pending,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Flush::Failed(e),
            }
        }
        Flush::Drained
    }

    /// Terminal state: close the transport and drop queued output.
    pub fn close(&mut self) {
        if self.alive {
            self.alive = false;
            self.half_dead = true;
            self.outbound.clear();
            self.batch = None;
            self.transport.close();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::session;
    use super::*;

    #[test]
    fn send_line_appends_newline() {
        let (mut s, mock) = session(1, Instant::now());
        assert!(matches!(s.send_line("PONG"), Delivery::Sent));
        assert_eq!(mock.take_lines(), ["PONG"]);
    }

    #[test]
    fn echo_id_prefixes_lines() {
        let (mut s, mock) = session(1, Instant::now());
        s.set_echo(Some(12));
        s.send_line("PONG");
        s.set_echo(None);
        s.send_line("PONG");
        assert_eq!(mock.take_lines(), ["#12 PONG", "PONG"]);
    }

    #[test]
    fn batch_is_one_write() {
        let (mut s, mock) = session(1, Instant::now());
        s.begin_batch();
        assert!(matches!(s.send_line("A"), Delivery::Batched));
        assert!(matches!(s.send_line("B"), Delivery::Batched));
        assert_eq!(mock.write_calls(), 0);
        assert!(matches!(s.end_batch(), Delivery::Sent));
        assert_eq!(mock.write_calls(), 1);
        assert_eq!(mock.take_lines(), ["A", "B"]);
    }

    #[test]
    fn partial_write_keeps_remainder() {
        let (mut s, mock) = session(1, Instant::now());
        mock.set_budget(Some(4));
        assert!(matches!(s.send_line("SAID main alice hello"), Delivery::Queued));
        assert!(s.has_pending_output());
        assert_eq!(mock.written(), b"SAID");

        for _ in 0..10 {
            if let Flush::Drained = s.try_flush() {
                break;
            }
        }
        assert!(!s.has_pending_output());
        assert_eq!(mock.take_lines(), ["SAID main alice hello"]);
    }

    #[test]
    fn later_lines_wait_behind_queued_ones() {
        let (mut s, mock) = session(1, Instant::now());
        mock.set_budget(Some(0));
        s.send_line("FIRST");
        mock.set_budget(None);
        s.send_line("SECOND");
        assert_eq!(mock.take_lines(), ["FIRST", "SECOND"]);
    }

    #[test]
    fn write_error_is_reported() {
        let (mut s, mock) = session(1, Instant::now());
        mock.fail_writes();
        assert!(matches!(s.send_line("PING"), Delivery::Failed(_)));
    }

    #[test]
    fn half_dead_suppresses_output() {
        let (mut s, mock) = session(1, Instant::now());
        s.mark_half_dead();
        assert!(matches!(s.send_line("PONG"), Delivery::Dropped));
        assert!(mock.written().is_empty());
        s.close();
        assert!(mock.is_closed());
        assert!(!s.is_alive());
    }

    #[test]
    fn access_follows_account() {
        let (mut s, _) = session(1, Instant::now());
        assert_eq!(s.access(), Access::None);
        s.account = Some(Account {
            id: 1,
            name: "alice".into(),
            access: Access::Privileged,
            email: None,
        });
        assert_eq!(s.access(), Access::Privileged);
        assert_eq!(s.name(), Some("alice"));
        assert!(Access::Admin > Access::Privileged);
    }
}
