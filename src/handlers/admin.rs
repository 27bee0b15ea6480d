//! Admin handlers: KICKUSER and BROADCAST.

use crate::error::{HandlerError, HandlerResult, RegistrationError};
use crate::handlers::{CommandSpec, Context, Handler, Registry};
use crate::services::OperatorNotice;
use crate::state::Access;
use lobby_proto::{ArgumentShape, Field, ParsedArguments};
use tracing::info;

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistrationError> {
    registry.register("KICKUSER", KickUserHandler)?;
    registry.register("BROADCAST", BroadcastHandler)?;
    Ok(())
}

/// Handler for KICKUSER command.
///
/// `KICKUSER user [{reason}]`
///
/// Disconnects a user immediately. Other admins get an operator notice.
pub struct KickUserHandler;

impl Handler for KickUserHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::new(
            Access::Admin,
            ArgumentShape::words([Field::required("user")])
                .then_sentences([Field::optional("reason")]),
        )
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let name = args.text("user")?;
        let reason = args.opt_text("reason");
        let target = ctx.find_user(name)?;
        if target == ctx.id {
            return Err(HandlerError::Rejected("cannot kick yourself".into()));
        }
        let kicker = ctx.name();

        let notice = match reason {
            Some(reason) => format!("You've been kicked from server by <{kicker}>: {reason}"),
            None => format!("You've been kicked from server by <{kicker}>"),
        };
        ctx.matrix.sessions.send(target, &format!("SERVERMSG {notice}"));
        let quit = match reason {
            Some(reason) => format!("Kicked by {kicker} ({reason})"),
            None => format!("Kicked by {kicker}"),
        };
        ctx.matrix.kill_session(target, &quit);

        info!(kicker = %kicker, target = %name, reason = reason.unwrap_or("-"), "KICKUSER executed");
        ctx.matrix.notify_operators(
            OperatorNotice::new("User kicked")
                .line(format!("{name} was kicked by {kicker}"))
                .line(format!("reason: {}", reason.unwrap_or("none given"))),
        );
        Ok(())
    }
}

/// Handler for BROADCAST command.
///
/// `BROADCAST {message}` → `SERVERMSGBOX {message}` to every logged-in session.
pub struct BroadcastHandler;

impl Handler for BroadcastHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::new(
            Access::Admin,
            ArgumentShape::sentences([Field::required("message")]),
        )
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let message = args.text("message")?;
        info!(by = %ctx.name(), "Broadcast sent");
        ctx.matrix
            .sessions
            .broadcast_authenticated(&format!("SERVERMSGBOX {message}"), None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::Registry;
    use crate::state::Access;
    use crate::state::testing::{connect, matrix, user};
    use std::time::Instant;

    #[test]
    fn kickuser_disconnects_and_notifies() {
        let mut m = matrix();
        let r = Registry::new(4, false).unwrap();
        let (root, mock_root) = connect(&mut m, Some("root"), Access::Admin);
        let (b, mock_b) = user(&mut m, "bob");
        let (c, mock_c) = user(&mut m, "carol");

        assert!(r.dispatch(&mut m, c, "KICKUSER bob", Instant::now()).is_err());
        assert!(m.sessions.contains(b));
        mock_c.take_lines();

        r.dispatch(&mut m, root, "KICKUSER bob\tspamming", Instant::now())
            .unwrap();
        assert_eq!(
            mock_b.take_lines(),
            ["SERVERMSG You've been kicked from server by <root>: spamming"]
        );
        assert!(mock_b.is_closed());
        assert!(!m.sessions.contains(b));
        assert_eq!(mock_c.take_lines(), ["REMOVEUSER bob"]);

        let lines = mock_root.take_lines();
        assert_eq!(lines[0], "REMOVEUSER bob");
        assert!(lines[1].ends_with("User kicked"));
        assert_eq!(lines[2], "SERVERMSG   bob was kicked by root");
    }

    #[test]
    fn broadcast_reaches_every_logged_in_session() {
        let mut m = matrix();
        let r = Registry::new(4, false).unwrap();
        let (root, _) = connect(&mut m, Some("root"), Access::Admin);
        let (_, mock_b) = user(&mut m, "bob");
        let (_, mock_anon) = connect(&mut m, None, Access::None);
        r.dispatch(&mut m, root, "BROADCAST restart in 5 minutes", Instant::now())
            .unwrap();
        assert_eq!(mock_b.take_lines(), ["SERVERMSGBOX restart in 5 minutes"]);
        assert!(mock_anon.take_lines().is_empty());
    }
}
