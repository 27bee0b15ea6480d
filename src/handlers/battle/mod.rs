//! Battle handlers.
//!
//! Lifecycle (OPENBATTLE, JOINBATTLE and friends), per-participant status,
//! bots, founder-only setup (units, start rectangles, script tags, replay
//! scripts) and battle chat.

mod bots;
mod chat;
mod lifecycle;
mod setup;
mod status;

pub use bots::{AddBotHandler, RemoveBotHandler, UpdateBotHandler};
pub use chat::{RingHandler, SayBattleHandler};
pub use lifecycle::{
    ForceJoinBattleHandler, JoinBattleAnswerHandler, JoinBattleHandler, KickFromBattleHandler,
    LeaveBattleHandler, OpenBattleHandler,
};
pub use setup::{
    DisableUnitsHandler, EnableAllUnitsHandler, EnableUnitsHandler, RemoveScriptTagsHandler,
    ScriptHandler, ScriptPhase, SetScriptTagsHandler, StartRectHandler,
};
pub use status::{ForceStatusHandler, ForcedStatus, MyBattleStatusHandler, UpdateBattleInfoHandler};

use crate::error::{HandlerError, RegistrationError};
use crate::handlers::{Context, Registry};
use crate::state::{BattleId, SessionId};

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistrationError> {
    registry.register("OPENBATTLE", OpenBattleHandler)?;
    registry.register("JOINBATTLE", JoinBattleHandler)?;
    registry.register("JOINBATTLEACCEPT", JoinBattleAnswerHandler { accept: true })?;
    registry.register("JOINBATTLEDENY", JoinBattleAnswerHandler { accept: false })?;
    registry.register("LEAVEBATTLE", LeaveBattleHandler)?;
    registry.register("KICKFROMBATTLE", KickFromBattleHandler)?;
    registry.register("FORCEJOINBATTLE", ForceJoinBattleHandler)?;

    registry.register("MYBATTLESTATUS", MyBattleStatusHandler)?;
    registry.register("UPDATEBATTLEINFO", UpdateBattleInfoHandler)?;
    registry.register("FORCETEAMNO", ForceStatusHandler(ForcedStatus::Team))?;
    registry.register("FORCEALLYNO", ForceStatusHandler(ForcedStatus::Ally))?;
    registry.register("FORCETEAMCOLOR", ForceStatusHandler(ForcedStatus::Color))?;
    registry.register("FORCESPECTATORMODE", ForceStatusHandler(ForcedStatus::Spectator))?;
    registry.register("HANDICAP", ForceStatusHandler(ForcedStatus::Handicap))?;

    registry.register("ADDBOT", AddBotHandler)?;
    registry.register("REMOVEBOT", RemoveBotHandler)?;
    registry.register("UPDATEBOT", UpdateBotHandler)?;

    registry.register("DISABLEUNITS", DisableUnitsHandler)?;
    registry.register("ENABLEUNITS", EnableUnitsHandler)?;
    registry.register("ENABLEALLUNITS", EnableAllUnitsHandler)?;
    registry.register("ADDSTARTRECT", StartRectHandler { add: true })?;
    registry.register("REMOVESTARTRECT", StartRectHandler { add: false })?;
    registry.register("SETSCRIPTTAGS", SetScriptTagsHandler)?;
    registry.register("REMOVESCRIPTTAGS", RemoveScriptTagsHandler)?;
    registry.register("SCRIPTSTART", ScriptHandler(ScriptPhase::Start))?;
    registry.register("SCRIPT", ScriptHandler(ScriptPhase::Line))?;
    registry.register("SCRIPTEND", ScriptHandler(ScriptPhase::End))?;

    registry.register("SAYBATTLE", SayBattleHandler { ex: false })?;
    registry.register("SAYBATTLEEX", SayBattleHandler { ex: true })?;
    registry.register("RING", RingHandler)?;
    Ok(())
}

/// Resolve `name` to a participant of `bid` other than the founder.
fn member_of(ctx: &Context<'_>, bid: BattleId, name: &str) -> Result<SessionId, HandlerError> {
    let target = ctx.find_user(name)?;
    match ctx.matrix.battles.get(bid) {
        Some(battle) if battle.is_participant(target) => Ok(target),
        _ => Err(HandlerError::Rejected(format!("{name} is not in battle {bid}"))),
    }
}

/// Send a line to every participant except the issuer.
fn relay(ctx: &mut Context<'_>, bid: BattleId, line: &str) {
    let others: Vec<SessionId> = match ctx.matrix.battles.get(bid) {
        Some(battle) => battle.participants().filter(|p| *p != ctx.id).collect(),
        None => return,
    };
    ctx.matrix.sessions.send_all(others, line);
}
