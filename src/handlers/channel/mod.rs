//! Channel handlers.
//!
//! Handles JOIN, LEAVE, CHANNELS, SAY, SAYEX, CHANNELTOPIC, SETCHANNELKEY,
//! MUTE, UNMUTE and MUTELIST.

mod chat;
mod membership;
mod mutes;

pub use chat::{ChannelTopicHandler, SayHandler, SetChannelKeyHandler};
pub use membership::{ChannelsHandler, JoinHandler, LeaveHandler};
pub use mutes::{MuteHandler, MuteListHandler, UnmuteHandler};

use crate::error::{HandlerError, RegistrationError};
use crate::handlers::{Context, Registry};

pub(crate) fn register(registry: &mut Registry) -> Result<(), RegistrationError> {
    registry.register("JOIN", JoinHandler)?;
    registry.register("LEAVE", LeaveHandler)?;
    registry.register("CHANNELS", ChannelsHandler)?;
    registry.register("SAY", SayHandler { ex: false })?;
    registry.register("SAYEX", SayHandler { ex: true })?;
    registry.register("CHANNELTOPIC", ChannelTopicHandler)?;
    registry.register("SETCHANNELKEY", SetChannelKeyHandler)?;
    registry.register("MUTE", MuteHandler)?;
    registry.register("UNMUTE", UnmuteHandler)?;
    registry.register("MUTELIST", MuteListHandler)?;
    Ok(())
}

/// Refuse unless the channel exists.
fn existing(ctx: &Context<'_>, name: &str) -> Result<(), HandlerError> {
    match ctx.matrix.channels.get(name) {
        Some(_) => Ok(()),
        None => Err(HandlerError::Rejected(format!("channel {name} does not exist"))),
    }
}
