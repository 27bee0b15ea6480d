//! PING and EXIT handlers.

use crate::error::HandlerResult;
use crate::handlers::{CommandSpec, Context, Handler};
use lobby_proto::{ArgumentShape, Field, ParsedArguments};
use tracing::info;

/// Handler for PING command.
pub struct PingHandler;

impl Handler for PingHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::anyone(ArgumentShape::none())
    }

    fn handle(&self, ctx: &mut Context<'_>, _args: &ParsedArguments) -> HandlerResult {
        ctx.reply("PONG");
        Ok(())
    }
}

/// Handler for EXIT command.
///
/// `EXIT [{reason}]`
pub struct ExitHandler;

impl Handler for ExitHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::anyone(ArgumentShape::sentences([Field::optional("reason")]))
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let reason = match args.opt_text("reason") {
            Some(r) if !r.is_empty() => format!("Quit: {r}"),
            _ => "Quit".to_string(),
        };
        info!(uid = %ctx.id, user = %ctx.name(), reason = %reason, "Client exit");
        ctx.matrix.kill_session(ctx.id, &reason);
        Ok(())
    }
}
