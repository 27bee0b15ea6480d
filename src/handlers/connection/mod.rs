//! Connection and account handlers.
//!
//! Handles PING, LOGIN, REGISTER, MYSTATUS and EXIT, and resumes LOGIN and
//! REGISTER when their credential jobs complete.

mod account;
mod login;
mod ping;

pub use account::{MyStatusHandler, RegisterHandler};
pub use login::LoginHandler;
pub use ping::{ExitHandler, PingHandler};

use crate::error::{HandlerError, HandlerResult, RegistrationError};
use crate::handlers::{Context, Registry};
use crate::security::CredentialOutcome;
use crate::state::{AuthRequest, Matrix, SessionId};
use std::time::Instant;
use tracing::debug;

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistrationError> {
    registry.register("PING", PingHandler)?;
    registry.register("EXIT", ExitHandler)?;
    registry.register("LOGIN", LoginHandler)?;
    registry.register("REGISTER", RegisterHandler)?;
    registry.register("MYSTATUS", MyStatusHandler)?;
    Ok(())
}

/// Resume the LOGIN or REGISTER that queued a credential job for `id`.
///
/// Replies carry the echo id of the original command. Outcomes for
/// sessions that have gone away are dropped.
pub fn complete_credentials(
    registry: &Registry,
    matrix: &mut Matrix,
    id: SessionId,
    outcome: CredentialOutcome,
    now: Instant,
) -> HandlerResult {
    let Some(pending) = matrix
        .sessions
        .get_mut(id)
        .filter(|s| s.is_active())
        .and_then(|s| s.pending_auth.take())
    else {
        debug!(uid = %id, "Credential outcome for a departed session dropped");
        return Ok(());
    };
    let keyword = match &pending.request {
        AuthRequest::Login(_) => "LOGIN",
        AuthRequest::Register { .. } => "REGISTER",
    };

    matrix.sessions.set_echo(id, pending.echo);
    let mut ctx = Context {
        id,
        matrix,
        registry,
        keyword,
        now,
        depth: 0,
    };
    let result = match (pending.request, outcome) {
        (AuthRequest::Login(request), CredentialOutcome::Verified(ok)) => {
            login::finish_login(&mut ctx, request, ok)
        }
        (AuthRequest::Register { name, email }, CredentialOutcome::Hashed(phc)) => {
            account::finish_register(&mut ctx, &name, email.as_deref(), phc)
        }
        _ => Err(HandlerError::Internal(format!(
            "{keyword} resumed with the wrong credential outcome"
        ))),
    };
    if let Err(ref e) = result
        && let Some(reply) = e.to_reply(keyword)
    {
        ctx.reply(reply);
    }
    ctx.matrix.sessions.set_echo(id, None);
    result
}
