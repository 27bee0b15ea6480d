//! Handler trait and the declarative command description.
//!
//! A handler describes itself once, at registration: which access level it
//! needs, the shape of its arguments and whether the issuer must be in a
//! battle (or found it). The registry runs those checks uniformly, so
//! `handle` only ever sees sessions that passed them.

use super::context::Context;
use crate::error::HandlerResult;
use crate::state::Access;
use lobby_proto::{ArgumentShape, ParsedArguments};

/// Everything the dispatcher checks before a handler body runs.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub access: Access,
    pub shape: ArgumentShape,
    /// Issuer must be the founder or a member of a battle.
    pub member: bool,
    /// Issuer must be the founder of its battle. Requires `member`.
    pub founder: bool,
}

impl CommandSpec {
    pub fn new(access: Access, shape: ArgumentShape) -> Self {
        Self {
            access,
            shape,
            member: false,
            founder: false,
        }
    }

    /// Usable before login.
    pub fn anyone(shape: ArgumentShape) -> Self {
        Self::new(Access::None, shape)
    }

    /// Logged-in users.
    pub fn user(shape: ArgumentShape) -> Self {
        Self::new(Access::User, shape)
    }

    pub fn in_battle(mut self) -> Self {
        self.member = true;
        self
    }

    /// Founder only. Implies membership.
    pub fn founder_only(mut self) -> Self {
        self.member = true;
        self.founder = true;
        self
    }
}

/// A command handler.
pub trait Handler: Send + Sync {
    fn describe(&self) -> CommandSpec;

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult;
}
