//! REGISTER and MYSTATUS handlers.

use crate::error::HandlerResult;
use crate::handlers::helpers::{client_status_line, u32_arg};
use crate::handlers::{CommandSpec, Context, Handler};
use crate::security::CredentialJob;
use crate::services::AccountError;
use crate::state::{AuthRequest, PendingAuth};
use lobby_proto::{ArgumentShape, ClientStatus, Field, ParsedArguments};
use tracing::{debug, warn};

/// Handler for REGISTER command.
///
/// `REGISTER user password [email]`. Name and email are checked before the
/// password is hashed and again when the hash comes back.
pub struct RegisterHandler;

impl Handler for RegisterHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::anyone(ArgumentShape::words([
            Field::required("user"),
            Field::required("password"),
            Field::optional("email"),
        ]))
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        if ctx.session()?.is_authenticated() {
            ctx.reply("REGISTRATIONDENIED You are already logged in");
            return Ok(());
        }
        if ctx.session()?.pending_auth.is_some() {
            ctx.reply("REGISTRATIONDENIED Registration already in progress");
            return Ok(());
        }
        let user = args.text("user")?;
        let password = args.text("password")?;
        let email = args.opt_text("email");

        let checked = ctx.matrix.services.accounts.check_registration(user, email);
        if let Err(e) = checked {
            debug!(user = %user, error = %e, "Registration refused");
            ctx.reply(format!("REGISTRATIONDENIED {e}"));
            return Ok(());
        }
        let cost = ctx.matrix.services.accounts.hash_cost();

        let id = ctx.id;
        let session = ctx.session_mut()?;
        session.pending_auth = Some(PendingAuth {
            echo: session.echo(),
            request: AuthRequest::Register {
                name: user.to_string(),
                email: email.map(str::to_owned),
            },
        });
        ctx.matrix.queue_credentials(
            id,
            CredentialJob::Hash {
                password: password.to_string(),
                cost,
            },
        );
        Ok(())
    }
}

/// Resume a REGISTER once its password hash is back.
pub(super) fn finish_register(
    ctx: &mut Context<'_>,
    name: &str,
    email: Option<&str>,
    phc: Result<String, argon2::password_hash::Error>,
) -> HandlerResult {
    let stored = phc
        .map_err(AccountError::Hash)
        .and_then(|phc| ctx.matrix.services.accounts.register(name, phc, email));
    match stored {
        Ok(_) => ctx.reply("REGISTRATIONACCEPTED"),
        Err(e @ AccountError::Hash(_)) => {
            warn!(user = %name, error = %e, "Registration failed");
            ctx.reply(format!("REGISTRATIONDENIED {e}"));
        }
        Err(e) => {
            debug!(user = %name, error = %e, "Registration refused");
            ctx.reply(format!("REGISTRATIONDENIED {e}"));
        }
    }
    Ok(())
}

/// Handler for MYSTATUS command.
///
/// `MYSTATUS status`. Only the in-game and away bits are taken from the
/// client.
pub struct MyStatusHandler;

impl Handler for MyStatusHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::words([Field::required("status").long()]))
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let requested = ClientStatus(u32_arg(args, "status")?);
        let session = ctx.session_mut()?;
        let merged = session.status.merge_client_bits(requested);
        if merged == session.status {
            return Ok(());
        }
        session.status = merged;
        let line = client_status_line(session);
        ctx.matrix.sessions.broadcast_authenticated(&line, None);
        Ok(())
    }
}
