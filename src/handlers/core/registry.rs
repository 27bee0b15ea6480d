//! Command handler registry and dispatch.
//!
//! The `Registry` maps upper-cased keywords to handlers and runs the uniform
//! precondition pipeline (access, argument bounds, battle membership, founder
//! authority) before any handler body.

use super::context::Context;
use super::traits::{CommandSpec, Handler};
use crate::error::{HandlerError, HandlerResult, RegistrationError};
use crate::handlers::{admin, battle, channel, connection};
use crate::state::{Matrix, SessionId};
use lobby_proto::CommandLine;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, debug_span, trace, warn};

/// Keywords that used to exist, with the note sent to clients still using them.
const DEPRECATED: &[(&str, &str)] = &[
    ("OPENBATTLEEX", "use OPENBATTLE instead"),
    ("JOINBATTLEEX", "use JOINBATTLE instead"),
    ("SAYPRIVATEEX", "private messages are handled by RING and channels"),
    ("TESTLOGIN", "use LOGIN instead"),
];

struct Entry {
    spec: CommandSpec,
    handler: Box<dyn Handler>,
}

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Entry>,
    max_recursion: usize,
    strict_named: bool,
}

impl Registry {
    /// An empty registry.
    pub fn empty(max_recursion: usize, strict_named: bool) -> Self {
        Self {
            handlers: HashMap::new(),
            max_recursion,
            strict_named,
        }
    }

    /// Create a registry with every lobby command registered.
    pub fn new(max_recursion: usize, strict_named: bool) -> Result<Self, RegistrationError> {
        let mut registry = Self::empty(max_recursion, strict_named);
        connection::register(&mut registry)?;
        channel::register(&mut registry)?;
        battle::register(&mut registry)?;
        admin::register(&mut registry)?;
        debug!(commands = registry.len(), "Command registry built");
        Ok(registry)
    }

    /// Register one handler.
    ///
    /// Rejects duplicate keywords, founder-only commands that do not also
    /// require membership, and argument shapes that cannot bind unambiguously.
    pub fn register<H: Handler + 'static>(
        &mut self,
        keyword: &'static str,
        handler: H,
    ) -> Result<(), RegistrationError> {
        let spec = handler.describe();
        if spec.founder && !spec.member {
            return Err(RegistrationError::FounderWithoutMembership(keyword));
        }
        spec.shape
            .validate()
            .map_err(|source| RegistrationError::Shape { keyword, source })?;
        if self.handlers.contains_key(keyword) {
            return Err(RegistrationError::Duplicate(keyword));
        }
        self.handlers.insert(
            keyword,
            Entry {
                spec,
                handler: Box::new(handler),
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.handlers.contains_key(keyword)
    }

    /// Dispatch one line received from `id`.
    pub fn dispatch(
        &self,
        matrix: &mut Matrix,
        id: SessionId,
        line: &str,
        now: Instant,
    ) -> HandlerResult {
        self.dispatch_at(matrix, id, line, now, 0)
    }

    /// Dispatch at a given re-entrancy depth.
    pub(crate) fn dispatch_at(
        &self,
        matrix: &mut Matrix,
        id: SessionId,
        line: &str,
        now: Instant,
        depth: usize,
    ) -> HandlerResult {
        if depth > self.max_recursion {
            warn!(uid = %id, depth, "Dispatch recursion limit hit");
            return Err(HandlerError::Internal(format!(
                "dispatch nested deeper than {}",
                self.max_recursion
            )));
        }

        let cmd = match CommandLine::parse(line) {
            Ok(cmd) => cmd,
            Err(e) => {
                debug!(uid = %id, error = %e, "Dropping malformed line");
                return Ok(());
            }
        };
        let keyword = cmd.keyword();
        let Some(entry) = self.handlers.get(keyword.as_str()) else {
            match DEPRECATED.iter().find(|(kw, _)| *kw == keyword) {
                Some((_, note)) => matrix.sessions.send(
                    id,
                    &format!("SERVERMSG Command {keyword} is no longer supported: {note}"),
                ),
                None => trace!(uid = %id, command = %keyword, "Unknown command dropped"),
            }
            return Ok(());
        };

        let span = debug_span!("lobby.command", command = %keyword, uid = %id, depth);
        let _enter = span.enter();

        let previous_echo = matrix.sessions.get(id).and_then(|s| s.echo());
        matrix.sessions.set_echo(id, cmd.id);

        let result = self.run(entry, matrix, id, &keyword, &cmd, now, depth);

        if let Err(ref e) = result {
            debug!(code = e.error_code(), error = %e, "Command failed");
            if let Some(reply) = e.to_reply(&keyword) {
                matrix.sessions.send(id, &reply);
            }
        }
        matrix.sessions.set_echo(id, previous_echo);
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &self,
        entry: &Entry,
        matrix: &mut Matrix,
        id: SessionId,
        keyword: &str,
        cmd: &CommandLine<'_>,
        now: Instant,
        depth: usize,
    ) -> HandlerResult {
        check_preconditions(&entry.spec, matrix, id, cmd)?;
        let args = entry.spec.shape.bind(cmd.args, self.strict_named)?;
        let mut ctx = Context {
            id,
            matrix,
            registry: self,
            keyword,
            now,
            depth,
        };
        entry.handler.handle(&mut ctx, &args)
    }
}

/// Access, then argument bounds, then membership, then founder authority.
fn check_preconditions(
    spec: &CommandSpec,
    matrix: &mut Matrix,
    id: SessionId,
    cmd: &CommandLine<'_>,
) -> HandlerResult {
    let actual = matrix
        .sessions
        .get(id)
        .map(|s| s.access())
        .ok_or_else(|| HandlerError::ProtocolState(format!("session {id} is gone")))?;
    if actual < spec.access {
        return Err(HandlerError::InsufficientAccess {
            required: spec.access,
            actual,
        });
    }

    let tokens = cmd.token_count();
    let min = spec.shape.min_tokens();
    let max = spec.shape.max_tokens();
    if tokens < min || max.is_some_and(|max| tokens > max) {
        return Err(HandlerError::ArgumentBounds {
            min,
            max,
            actual: tokens,
        });
    }

    if spec.member {
        let bid = matrix.battle_of(id)?;
        if spec.founder
            && !matrix
                .battles
                .get(bid)
                .is_some_and(|b| b.is_founder(id))
        {
            return Err(HandlerError::NotFounder(bid));
        }
    }
    Ok(())
}
