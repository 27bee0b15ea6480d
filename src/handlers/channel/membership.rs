//! JOIN, LEAVE and CHANNELS handlers.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{CommandSpec, Context, Handler};
use lobby_proto::{ArgumentShape, Field, ParsedArguments};

/// Handler for JOIN command.
///
/// `JOIN chan [key]`
pub struct JoinHandler;

impl Handler for JoinHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::words([
            Field::required("chan"),
            Field::optional("key"),
        ]))
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let chan = args.text("chan")?;
        if let Err(refusal) = ctx.matrix.join_channel(ctx.id, chan, args.opt_text("key")) {
            ctx.reply(format!("JOINFAILED {chan} {}", refusal.reason()));
        }
        Ok(())
    }
}

/// Handler for LEAVE command.
///
/// `LEAVE chan`
pub struct LeaveHandler;

impl Handler for LeaveHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::words([Field::required("chan")]))
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let chan = args.text("chan")?;
        if !ctx.matrix.leave_channel(ctx.id, chan, None) {
            return Err(HandlerError::Rejected(format!("not in channel {chan}")));
        }
        Ok(())
    }
}

/// Handler for CHANNELS command.
///
/// Lists every channel as `CHANNEL chan users [{topic}]`, then `ENDOFCHANNELS`.
pub struct ChannelsHandler;

impl Handler for ChannelsHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::none())
    }

    fn handle(&self, ctx: &mut Context<'_>, _args: &ParsedArguments) -> HandlerResult {
        let lines: Vec<String> = ctx
            .matrix
            .channels
            .iter()
            .map(|c| match c.topic {
                Some(ref topic) => format!("CHANNEL {} {} {}", c.name, c.members.len(), topic.text),
                None => format!("CHANNEL {} {}", c.name, c.members.len()),
            })
            .collect();
        let id = ctx.id;
        let sessions = &mut ctx.matrix.sessions;
        sessions.begin_batch(id);
        for line in &lines {
            sessions.send(id, line);
        }
        sessions.send(id, "ENDOFCHANNELS");
        sessions.end_batch(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::Registry;
    use crate::state::testing::{matrix, user};
    use std::time::Instant;

    #[test]
    fn join_leave_and_list() {
        let mut m = matrix();
        let (a, mock_a) = user(&mut m, "alice");
        let (b, mock_b) = user(&mut m, "bob");
        let r = Registry::new(4, false).unwrap();
        let now = Instant::now();

        r.dispatch(&mut m, a, "JOIN main", now).unwrap();
        r.dispatch(&mut m, b, "JOIN main", now).unwrap();
        assert_eq!(mock_a.take_lines().last().unwrap(), "JOINED main bob");
        assert_eq!(mock_b.take_lines(), ["JOIN main", "CLIENTS main alice bob"]);

        r.dispatch(&mut m, a, "JOIN main", now).unwrap();
        assert_eq!(mock_a.take_lines(), ["JOINFAILED main Already in the channel"]);

        r.dispatch(&mut m, b, "CHANNELS", now).unwrap();
        assert_eq!(mock_b.take_lines(), ["CHANNEL main 2", "ENDOFCHANNELS"]);

        r.dispatch(&mut m, a, "LEAVE main", now).unwrap();
        assert_eq!(mock_b.take_lines(), ["LEFT main alice"]);
        r.dispatch(&mut m, b, "LEAVE main", now).unwrap();
        assert!(m.channels.get("main").is_none());

        assert!(r.dispatch(&mut m, b, "LEAVE main", now).is_err());
        assert_eq!(
            mock_b.take_lines(),
            ["SERVERMSG LEAVE failed: not in channel main"]
        );
    }
}
