//! ADDBOT, REMOVEBOT and UPDATEBOT handlers.
//!
//! Bots are controlled by the participant who added them; the founder may
//! also remove or update any bot in the battle.

use super::status::within_limits;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::helpers::{battle_status_arg, color_arg};
use crate::handlers::{CommandSpec, Context, Handler};
use crate::services::valid_username;
use crate::state::battle::{ControllerRef, align, apply_capacity};
use crate::state::{BattleId, Bot};
use lobby_proto::{ArgumentShape, Field, ParsedArguments};
use tracing::debug;

/// Refuse unless the issuer owns bot `name` or founded the battle.
fn controls(ctx: &Context<'_>, bid: BattleId, name: &str) -> Result<(), HandlerError> {
    let battle = ctx
        .matrix
        .battles
        .get(bid)
        .ok_or_else(|| HandlerError::ProtocolState(format!("battle {bid} is gone")))?;
    let bot = battle
        .bot(name)
        .ok_or_else(|| HandlerError::Rejected(format!("no such bot: {name}")))?;
    if bot.owner != ctx.id && !battle.is_founder(ctx.id) {
        return Err(HandlerError::Rejected(format!("bot {name} is not yours")));
    }
    Ok(())
}

/// Handler for ADDBOT command.
///
/// `ADDBOT name status color {ai}`
pub struct AddBotHandler;

impl Handler for AddBotHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(
            ArgumentShape::words([
                Field::required("name"),
                Field::required("status").long(),
                Field::required("color").color(),
            ])
            .then_sentences([Field::required("ai")]),
        )
        .in_battle()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let name = args.text("name")?;
        let requested = battle_status_arg(args, "status")?;
        let color = color_arg(args, "color")?;
        let ai = args.text("ai")?;
        if !valid_username(name) {
            return Err(HandlerError::Rejected(format!("invalid bot name: {name}")));
        }
        within_limits(ctx, requested)?;

        let bid = ctx.battle()?;
        let max_bots = ctx.matrix.config.limits.max_bots_per_battle;
        let (max_players, replay) = match ctx.matrix.battles.get(bid) {
            Some(battle) if battle.bot(name).is_some() => {
                return Err(HandlerError::Rejected(format!("bot name {name} is taken")));
            }
            Some(battle) if battle.bots.len() >= max_bots => {
                return Err(HandlerError::Rejected(format!(
                    "battle already has {max_bots} bots"
                )));
            }
            Some(battle) => (battle.settings.max_players, battle.is_replay()),
            None => return Err(HandlerError::ProtocolState(format!("battle {bid} is gone"))),
        };

        let others = ctx
            .matrix
            .controllers(bid, &ControllerRef::Bot(name.to_string()));
        let status = apply_capacity(requested, &others, max_players, replay);
        let (status, color) = align(status, color, &others);

        let owner = ctx.name();
        if let Some(battle) = ctx.matrix.battles.get_mut(bid) {
            battle.add_bot(Bot {
                name: name.to_string(),
                owner: ctx.id,
                status,
                color,
                ai: ai.to_string(),
            });
        }
        debug!(battle = %bid, bot = %name, owner = %owner, "Bot added");
        ctx.matrix.battle_broadcast(
            bid,
            &format!("ADDBOT {bid} {name} {owner} {} {} {ai}", status.0, color.0),
        );
        Ok(())
    }
}

/// Handler for REMOVEBOT command.
///
/// `REMOVEBOT name`
pub struct RemoveBotHandler;

impl Handler for RemoveBotHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::words([Field::required("name")])).in_battle()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let name = args.text("name")?;
        let bid = ctx.battle()?;
        controls(ctx, bid, name)?;
        if let Some(battle) = ctx.matrix.battles.get_mut(bid) {
            battle.remove_bot(name);
        }
        ctx.matrix
            .battle_broadcast(bid, &format!("REMOVEBOT {bid} {name}"));
        Ok(())
    }
}

/// Handler for UPDATEBOT command.
///
/// `UPDATEBOT name status color`
pub struct UpdateBotHandler;

impl Handler for UpdateBotHandler {
    fn describe(&self) -> CommandSpec {
        CommandSpec::user(ArgumentShape::words([
            Field::required("name"),
            Field::required("status").long(),
            Field::required("color").color(),
        ]))
        .in_battle()
    }

    fn handle(&self, ctx: &mut Context<'_>, args: &ParsedArguments) -> HandlerResult {
        let name = args.text("name")?;
        let status = battle_status_arg(args, "status")?;
        within_limits(ctx, status)?;
        let color = color_arg(args, "color")?;
        let bid = ctx.battle()?;
        controls(ctx, bid, name)?;
        ctx.matrix.set_bot_status(bid, name, status, color)
    }
}
