//! MUTE, UNMUTE and MUTELIST handlers.

use super::existing;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{CommandSpec, Context, Handler, epoch_secs};
use crate::state::{Access, MuteRemaining};
use lobby_proto::{ArgumentShape, Field, ParsedArguments};
use tracing::info;

/// Handler for MUTE command.
///
/// `MUTE chan user minutes [ip]`. Zero or negative minutes mute
/// permanently; the literal `ip` also mutes the target's current address.
pub struct MuteHandler;

impl Handler for MuteHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::new(
            Access::Privileged,
            ArgumentShape::words([
                Field::required("chan"),
                Field::required("user"),
                Field::required("minutes").long(),
                Field::optional("ip"),
            ]),
        )
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let chan = args.text("chan")?;
        let target = args.text("user")?;
        let minutes = args.long("minutes")?;
        existing(ctx, chan)?;

        let ip = match args.opt_text("ip") {
            None => None,
            Some(flag) if flag.eq_ignore_ascii_case("ip") => {
                let id = ctx.find_user(target)?;
                ctx.matrix.sessions.get(id).map(|s| s.addr.ip())
            }
            Some(other) => {
                return Err(HandlerError::Rejected(format!("unknown mute option {other}")));
            }
        };

        let by = ctx.name();
        let seconds = minutes.saturating_mul(60);
        if let Some(channel) = ctx.matrix.channels.get_mut(chan) {
            channel.mutes.mute(target, seconds, ip, epoch_secs());
        }
        ctx.matrix.announce_expired_mutes(chan);

        let duration = if minutes <= 0 {
            "permanently".to_string()
        } else {
            format!("for {minutes} minutes")
        };
        info!(channel = %chan, user = %target, by = %by, minutes, ip = ?ip, "Muted");
        ctx.matrix.channel_broadcast(
            chan,
            &format!("CHANNELMESSAGE {chan} <{target}> has been muted by <{by}> {duration}"),
        );
        Ok(())
    }
}

/// Handler for UNMUTE command.
///
/// `UNMUTE chan user`
pub struct UnmuteHandler;

impl Handler for UnmuteHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::new(
            Access::Privileged,
            ArgumentShape::words([Field::required("chan"), Field::required("user")]),
        )
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let chan = args.text("chan")?;
        let target = args.text("user")?;
        let by = ctx.name();
        let removed = match ctx.matrix.channels.get_mut(chan) {
            Some(channel) => channel.mutes.unmute(target, epoch_secs()),
            None => return Err(HandlerError::Rejected(format!("channel {chan} does not exist"))),
        };
        ctx.matrix.announce_expired_mutes(chan);
        if !removed {
            return Err(HandlerError::Rejected(format!("{target} is not muted on {chan}")));
        }
        info!(channel = %chan, user = %target, by = %by, "Unmuted");
        ctx.matrix.channel_broadcast(
            chan,
            &format!("CHANNELMESSAGE {chan} <{target}> has been unmuted by <{by}>"),
        );
        Ok(())
    }
}

/// Handler for MUTELIST command.
///
/// Sweeps once, then lists without sweeping again.
pub struct MuteListHandler;

impl Handler for MuteListHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::words([Field::required("chan")]))
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let chan = args.text("chan")?;
        let now = epoch_secs();
        let listing = match ctx.matrix.channels.get_mut(chan) {
            Some(channel) => {
                channel.mutes.sweep(now);
                channel.mutes.listing(now)
            }
            None => return Err(HandlerError::Rejected(format!("channel {chan} does not exist"))),
        };
        ctx.matrix.announce_expired_mutes(chan);

        let id = ctx.id;
        let sessions = &mut ctx.matrix.sessions;
        sessions.begin_batch(id);
        sessions.send(id, &format!("MUTELISTBEGIN {chan}"));
        for (user, remaining) in listing {
            let line = match remaining {
                MuteRemaining::Indefinite => format!("MUTELIST {user}, indefinite"),
                MuteRemaining::Seconds(s) => format!("MUTELIST {user}, {s} seconds remaining"),
            };
            sessions.send(id, &line);
        }
        sessions.send(id, "MUTELISTEND");
        sessions.end_batch(id);
        Ok(())
    }
}
