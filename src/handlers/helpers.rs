//! Helpers shared by command handlers: argument narrowing and the lines
//! that describe users to other clients.

use crate::error::HandlerError;
use crate::state::Session;
use lobby_proto::{BattleStatus, ParsedArguments, TeamColor};

/// A non-negative 32-bit argument declared as `long`.
pub fn u32_arg(args: &ParsedArguments, name: &'static str) -> Result<u32, HandlerError> {
    let raw = args.long(name)?;
    u32::try_from(raw).map_err(|_| HandlerError::Rejected(format!("{name} out of range: {raw}")))
}

pub fn battle_status_arg(
    args: &ParsedArguments,
    name: &'static str,
) -> Result<BattleStatus, HandlerError> {
    u32_arg(args, name).map(BattleStatus)
}

pub fn color_arg(args: &ParsedArguments, name: &'static str) -> Result<TeamColor, HandlerError> {
    Ok(TeamColor(args.color(name)?))
}

/// `ADDUSER user country cpu accountID`
pub fn add_user_line(session: &Session) -> String {
    format!(
        "ADDUSER {} {} {} {}",
        session.display_name(),
        session.country,
        session.cpu,
        session.account.as_ref().map_or(0, |a| a.id)
    )
}

/// `CLIENTSTATUS user status`
pub fn client_status_line(session: &Session) -> String {
    format!("CLIENTSTATUS {} {}", session.display_name(), session.status.0)
}
