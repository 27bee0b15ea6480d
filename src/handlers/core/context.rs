//! Command handler context.
//!
//! Defines the `Context` struct passed to all handlers: the issuing session,
//! exclusive access to the lobby state and a way back into the registry for
//! handlers that synthesize further commands.

use super::registry::Registry;
use crate::error::{HandlerError, HandlerResult};
use crate::state::{BattleId, Matrix, Session, SessionId};
use std::time::Instant;

/// Handler context passed to each command handler.
pub struct Context<'a> {
    /// The issuing session.
    pub id: SessionId,
    /// All lobby state.
    pub matrix: &'a mut Matrix,
    pub registry: &'a Registry,
    /// Upper-cased keyword being handled.
    pub keyword: &'a str,
    /// Tick time.
    pub now: Instant,
    /// Re-entrant dispatch depth; 0 for lines read off the wire.
    pub depth: usize,
}

impl<'a> Context<'a> {
    /// Send one line to the issuing session.
    pub fn reply(&mut self, line: impl AsRef<str>) {
        self.matrix.sessions.send(self.id, line.as_ref());
    }

    pub fn session(&self) -> Result<&Session, HandlerError> {
        self.matrix
            .sessions
            .get(self.id)
            .ok_or_else(|| HandlerError::ProtocolState(format!("session {} is gone", self.id)))
    }

    pub fn session_mut(&mut self) -> Result<&mut Session, HandlerError> {
        let id = self.id;
        self.matrix
            .sessions
            .get_mut(id)
            .ok_or_else(|| HandlerError::ProtocolState(format!("session {id} is gone")))
    }

    /// Account name of the issuer, `-` before login.
    pub fn name(&self) -> String {
        self.matrix
            .sessions
            .get(self.id)
            .map_or_else(|| "-".to_string(), |s| s.display_name().to_owned())
    }

    /// The issuer's battle. Membership was checked by the dispatcher for
    /// commands that declare it.
    pub fn battle(&mut self) -> Result<BattleId, HandlerError> {
        self.matrix.battle_of(self.id)
    }

    /// Resolve a logged-in user by name.
    pub fn find_user(&self, name: &str) -> Result<SessionId, HandlerError> {
        self.matrix
            .sessions
            .find_by_name(name)
            .ok_or_else(|| HandlerError::Rejected(format!("user {name} is not online")))
    }

    /// Run `line` as if `target` had sent it.
    pub fn dispatch_as(&mut self, target: SessionId, line: &str) -> HandlerResult {
        self.registry
            .dispatch_at(self.matrix, target, line, self.now, self.depth + 1)
    }
}

/// Wall-clock unix seconds, used for mute and ban expiry.
pub fn epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Wall-clock unix milliseconds, used for topic timestamps.
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
