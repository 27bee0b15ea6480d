//! SAY, SAYEX, CHANNELTOPIC and SETCHANNELKEY handlers.

use super::existing;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{CommandSpec, Context, Handler, epoch_millis, epoch_secs};
use crate::state::Access;
use lobby_proto::{ArgumentShape, Field, ParsedArguments};
use tracing::info;

/// Handler for SAY and SAYEX.
///
/// `SAY chan {msg}` / `SAYEX chan {msg}`. Muted senders are told so and
/// nothing is relayed.
pub struct SayHandler {
    pub ex: bool,
}

impl Handler for SayHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(
            ArgumentShape::words([Field::required("chan")])
                .then_sentences([Field::required("msg")]),
        )
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let chan = args.text("chan")?;
        let msg = args.text("msg")?;
        let user = ctx.name();
        let ip = ctx.session()?.addr.ip();
        let id = ctx.id;

        let muted = match ctx.matrix.channels.get_mut(chan) {
            Some(channel) if channel.is_member(id) => {
                channel.mutes.is_muted(&user, Some(ip), epoch_secs())
            }
            _ => return Err(HandlerError::Rejected(format!("not in channel {chan}"))),
        };
        ctx.matrix.announce_expired_mutes(chan);
        if muted {
            ctx.reply(format!("SERVERMSG You are muted on channel {chan}"));
            return Ok(());
        }

        let verb = if self.ex { "SAIDEX" } else { "SAID" };
        ctx.matrix
            .channel_broadcast(chan, &format!("{verb} {chan} {user} {msg}"));
        Ok(())
    }
}

/// Handler for CHANNELTOPIC command.
///
/// `CHANNELTOPIC chan {topic}`
pub struct ChannelTopicHandler;

impl Handler for ChannelTopicHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::new(
            Access::Privileged,
            ArgumentShape::words([Field::required("chan")]).then_sentences([Field::required("topic")]),
        )
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let chan = args.text("chan")?;
        existing(ctx, chan)?;
        let author = ctx.name();
        ctx.matrix
            .set_topic(chan, &author, args.text("topic")?, epoch_millis());
        info!(channel = %chan, user = %author, "Topic changed");
        Ok(())
    }
}

/// Handler for SETCHANNELKEY command.
///
/// `SETCHANNELKEY chan key`; a key of `*` removes it.
pub struct SetChannelKeyHandler;

impl Handler for SetChannelKeyHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::new(
            Access::Privileged,
            ArgumentShape::words([Field::required("chan"), Field::required("key")]),
        )
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let chan = args.text("chan")?;
        let key = args.text("key")?;
        let user = ctx.name();
        let Some(channel) = ctx.matrix.channels.get_mut(chan) else {
            return Err(HandlerError::Rejected(format!("channel {chan} does not exist")));
        };
        let notice = if key == "*" {
            channel.key = None;
            format!("CHANNELMESSAGE {chan} Channel unlocked by <{user}>")
        } else {
            channel.key = Some(key.to_string());
            format!("CHANNELMESSAGE {chan} Channel locked by <{user}>")
        };
        ctx.matrix.channel_broadcast(chan, &notice);
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
    fn said_reaches_members_only() {
        let mut m = matrix();
        let (a, mock_a) = user(&mut m, "alice");
        let (b, mock_b) = user(&mut m, "bob");
        let (_c, mock_c) = user(&mut m, "carol");
        let r = Registry::new(4, false).unwrap();
        let now = Instant::now();
        r.dispatch(&mut m, a, "JOIN main", now).unwrap();
        r.dispatch(&mut m, b, "JOIN main", now).unwrap();
        mock_a.take_lines();
        mock_b.take_lines();

        r.dispatch(&mut m, a, "SAY main hello there", now).unwrap();
        r.dispatch(&mut m, b, "SAYEX main waves", now).unwrap();
        let expected = ["SAID main alice hello there", "SAIDEX main bob waves"];
        assert_eq!(mock_a.take_lines(), expected);
        assert_eq!(mock_b.take_lines(), expected);
        assert!(mock_c.take_lines().is_empty());
    }

    #[test]
    fn topic_and_key_need_privilege() {
        let mut m = matrix();
        let (a, mock_a) = user(&mut m, "alice");
        let (op, _) = connect(&mut m, Some("op"), Access::Privileged);
        let r = Registry::new(4, false).unwrap();
        let now = Instant::now();
        r.dispatch(&mut m, a, "JOIN main", now).unwrap();
        mock_a.take_lines();

        assert!(r.dispatch(&mut m, a, "CHANNELTOPIC main mine", now).is_err());
        assert_eq!(
            mock_a.take_lines(),
            ["SERVERMSG CHANNELTOPIC failed: requires privileged access, you have user"]
        );

        r.dispatch(&mut m, op, "CHANNELTOPIC main be nice", now).unwrap();
        let line = mock_a.take_lines().remove(0);
        assert!(line.starts_with("CHANNELTOPIC main op "));
        assert!(line.ends_with("\tbe nice"));

        r.dispatch(&mut m, op, "SETCHANNELKEY main sesame", now).unwrap();
        assert_eq!(m.channels.get("main").unwrap().key.as_deref(), Some("sesame"));
        r.dispatch(&mut m, op, "SETCHANNELKEY main *", now).unwrap();
        assert_eq!(m.channels.get("main").unwrap().key, None);
    }
}
