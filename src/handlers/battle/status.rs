//! MYBATTLESTATUS, UPDATEBATTLEINFO and the founder's FORCE* commands.

use super::member_of;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::helpers::{battle_status_arg, color_arg, u32_arg};
use crate::handlers::{CommandSpec, Context, Handler};
use lobby_proto::{ArgumentShape, BattleStatus, Field, Mode, ParsedArguments};
use tracing::debug;

/// Refuse team or ally numbers the engine cannot host.
pub(super) fn within_limits(ctx: &Context<'_>, status: BattleStatus) -> Result<(), HandlerError> {
    let limits = &ctx.matrix.config.limits;
    if status.team() >= limits.max_teams {
        return Err(HandlerError::Rejected(format!(
            "team {} exceeds the engine limit of {}",
            status.team(),
            limits.max_teams
        )));
    }
    if status.ally() >= limits.max_ally_teams {
        return Err(HandlerError::Rejected(format!(
            "ally team {} exceeds the engine limit of {}",
            status.ally(),
            limits.max_ally_teams
        )));
    }
    Ok(())
}

fn bounded(value: u32, limit: u32) -> Result<u32, HandlerError> {
    if value >= limit {
        return Err(HandlerError::Rejected(format!(
            "{value} exceeds the engine limit of {limit}"
        )));
    }
    Ok(value)
}

/// Handler for MYBATTLESTATUS command.
///
/// `MYBATTLESTATUS status color`
pub struct MyBattleStatusHandler;

impl Handler for MyBattleStatusHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::words([
            Field::required("status").long(),
            Field::required("color").color(),
        ]))
        .in_battle()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let status = battle_status_arg(args, "status")?;
        within_limits(ctx, status)?;
        let color = color_arg(args, "color")?;
        ctx.matrix.set_participant_status(ctx.id, status, color)
    }
}

/// Handler for UPDATEBATTLEINFO command.
///
/// `UPDATEBATTLEINFO spectators locked mapHash {map}`, relayed to every
/// logged-in session.
pub struct UpdateBattleInfoHandler;

impl Handler for UpdateBattleInfoHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(
            ArgumentShape::words([
                Field::required("spectators").long(),
                Field::required("locked").boolean(),
                Field::required("mapHash").int(),
            ])
            .then_sentences([Field::required("map")]),
        )
        .founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let spectators = u32_arg(args, "spectators")?;
        let locked = args.boolean("locked")?;
        let map_hash = args.int("mapHash")?;
        let map = args.text("map")?;
        let bid = ctx.battle()?;
        let battle = ctx
            .matrix
            .battles
            .get_mut(bid)
            .ok_or_else(|| HandlerError::ProtocolState(format!("battle {bid} is gone")))?;
        battle.spectators = spectators;
        battle.locked = locked;
        battle.settings.map_hash = map_hash;
        battle.settings.map = map.to_string();

        debug!(battle = %bid, spectators, locked, map = %map, "Battle info updated");
        ctx.matrix.sessions.broadcast_authenticated(
            &format!(
                "UPDATEBATTLEINFO {bid} {spectators} {} {map_hash} {map}",
                u8::from(locked)
            ),
            None,
        );
        Ok(())
    }
}

/// Which part of a participant's status a founder overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedStatus {
    Team,
    Ally,
    Color,
    Spectator,
    Handicap,
}

/// Handler for FORCETEAMNO, FORCEALLYNO, FORCETEAMCOLOR,
/// FORCESPECTATORMODE and HANDICAP.
///
/// The forced status goes through the same capacity and alignment rules
/// as one the participant sent itself.
pub struct ForceStatusHandler(pub ForcedStatus);

impl Handler for ForceStatusHandler {
    fn describe(&self) -> CommandSpec {
        let user = Field::required("user");
        let shape = match self.0 {
            ForcedStatus::Team | ForcedStatus::Ally | ForcedStatus::Handicap => {
                ArgumentShape::words([user, Field::required("value").long()])
            }
            ForcedStatus::Color => ArgumentShape::words([user, Field::required("color").color()]),
            ForcedStatus::Spectator => ArgumentShape::words([user]),
        };
        CommandSpec::user(shape).founder_only()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let bid = ctx.battle()?;
        let target = member_of(ctx, bid, args.text("user")?)?;
        let (status, color) = match ctx.matrix.sessions.get(target) {
            Some(s) => (s.battle_status, s.color),
            None => return Err(HandlerError::ProtocolState(format!("session {target} is gone"))),
        };

        let limits = &ctx.matrix.config.limits;
        let (status, color) = match self.0 {
            ForcedStatus::Team => {
                let team = bounded(u32_arg(args, "value")?, limits.max_teams)?;
                (status.with_team(team), color)
            }
            ForcedStatus::Ally => {
                let ally = bounded(u32_arg(args, "value")?, limits.max_ally_teams)?;
                (status.with_ally(ally), color)
            }
            ForcedStatus::Color => (status, color_arg(args, "color")?),
            ForcedStatus::Spectator => (status.with_mode(Mode::Spectator), color),
            ForcedStatus::Handicap => {
                let value = u32_arg(args, "value")?;
                if value > 100 {
                    return Err(HandlerError::Rejected(format!("handicap out of range: {value}")));
                }
                (status.with_handicap(value), color)
            }
        };
        ctx.matrix.set_participant_status(target, status, color)
    }
}
