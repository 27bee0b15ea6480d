//! The reactor: the one place lobby state is mutated.
//!
//! Socket tasks feed [`NetEvent`]s in; the gateway drives [`Reactor`] with
//! them and with a periodic tick. Nothing here awaits, so a tick always runs
//! to completion before the next event is looked at.

use crate::handlers::{Registry, complete_credentials, epoch_secs};
use crate::security::{CredentialJob, CredentialOutcome, FloodGuard};
use crate::services::OperatorNotice;
use crate::state::{Access, Matrix, Session, SessionId, Transport};
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const MUTE_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Input from the socket tasks and the credential workers.
#[derive(Debug)]
pub enum NetEvent {
    Data { id: SessionId, bytes: Bytes },
    Closed { id: SessionId, reason: String },
    Credentials { id: SessionId, outcome: CredentialOutcome },
}

pub struct Reactor {
    matrix: Matrix,
    registry: Registry,
    tick: Duration,
    next_tick: Instant,
    last_mute_sweep: Instant,
}

impl Reactor {
    pub fn new(matrix: Matrix, registry: Registry, tick: Duration, now: Instant) -> Self {
        Self {
            matrix,
            registry,
            tick,
            next_tick: now + tick,
            last_mute_sweep: now,
        }
    }

    #[cfg(test)]
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    #[cfg(test)]
    pub fn matrix_mut(&mut self) -> &mut Matrix {
        &mut self.matrix
    }

    /// Reserve the id for a connection about to be accepted.
    pub fn allocate_id(&mut self) -> SessionId {
        self.matrix.sessions.next_id()
    }

    /// Register an accepted connection and greet it.
    pub fn on_accept(
        &mut self,
        id: SessionId,
        addr: SocketAddr,
        transport: Box<dyn Transport>,
        now: Instant,
    ) {
        let flood = FloodGuard::from_config(&self.matrix.config.security);
        self.matrix
            .sessions
            .insert(Session::new(id, addr, transport, flood, now));
        info!(uid = %id, %addr, "Connection accepted");
        let greeting = self.matrix.greeting();
        self.matrix.sessions.send(id, &greeting);
    }

    /// Feed received bytes to a session and dispatch every complete line.
    pub fn on_data(&mut self, id: SessionId, bytes: &[u8], now: Instant) {
        let max_line = self.matrix.config.limits.max_line_length;
        let Some(session) = self.matrix.sessions.get_mut(id) else {
            return;
        };
        if session.is_half_dead() {
            return;
        }
        session.last_recv = now;

        if session.access() < Access::Admin && !session.flood.check(bytes.len()) {
            let who = session.display_name().to_owned();
            let addr = session.addr;
            warn!(uid = %id, user = %who, %addr, "Flood limit exceeded");
            self.matrix.kill_session(id, "Flooding");
            self.matrix.notify_operators(
                OperatorNotice::new("Flood protection")
                    .line(format!("{who} ({addr}) was disconnected for flooding")),
            );
            return;
        }
        session.receive(bytes);

        loop {
            let Some(session) = self.matrix.sessions.get_mut(id) else {
                return;
            };
            if !session.is_active() {
                return;
            }
            let Some(line) = session.read_line() else {
                break;
            };
            // Failures have already been answered on the session.
            let _ = self.registry.dispatch(&mut self.matrix, id, &line, now);
        }

        if let Some(session) = self.matrix.sessions.get(id)
            && session.partial_line_len() > max_line
        {
            warn!(uid = %id, pending = session.partial_line_len(), "Line too long");
            self.matrix.kill_session(id, "Line too long");
        }
    }

    /// The reader hit end of stream or an I/O error.
    pub fn on_closed(&mut self, id: SessionId, reason: &str) {
        debug!(uid = %id, reason = %reason, "Connection closed by peer");
        self.matrix.kill_session(id, reason);
    }

    /// A credential job finished; resume the command that queued it.
    pub fn on_credentials(&mut self, id: SessionId, outcome: CredentialOutcome, now: Instant) {
        // Failures have already been answered on the session.
        let _ = complete_credentials(&self.registry, &mut self.matrix, id, outcome, now);
    }

    pub fn handle_event(&mut self, event: NetEvent, now: Instant) {
        match event {
            NetEvent::Data { id, bytes } => self.on_data(id, &bytes, now),
            NetEvent::Closed { id, reason } => self.on_closed(id, &reason),
            NetEvent::Credentials { id, outcome } => self.on_credentials(id, outcome, now),
        }
    }

    /// Credential work queued by the handlers since the last call.
    pub fn take_credential_jobs(&mut self) -> Vec<(SessionId, CredentialJob)> {
        self.matrix.take_credential_jobs()
    }

    /// Run [`Reactor::end_of_tick`] if a tick interval has passed since the
    /// last one. Called after every event batch so that a steady stream of
    /// input cannot hold housekeeping off.
    pub fn tick_if_due(&mut self, now: Instant) -> bool {
        if now < self.next_tick {
            return false;
        }
        self.end_of_tick(now);
        true
    }

    /// Housekeeping after I/O: retry writes, scan for idle sessions, tear
    /// down scheduled kills, then run the cooperative timers.
    pub fn end_of_tick(&mut self, now: Instant) {
        self.next_tick = now + self.tick;
        self.matrix.sessions.flush_pending();
        self.matrix.sessions.check_timeouts(now);
        self.matrix.process_kills();

        if now.duration_since(self.last_mute_sweep) >= MUTE_SWEEP_INTERVAL {
            self.last_mute_sweep = now;
            self.matrix.sweep_mutes(epoch_secs());
        }
        self.matrix.abuse.purge(now);
    }

    /// Kill every session.
    pub fn shutdown(&mut self, reason: &str) {
        let count = self.matrix.sessions.len();
        self.matrix.kill_all(reason);
        info!(sessions = count, reason = %reason, "Reactor stopped");
    }
}
