//! State management module.
//!
//! Contains the Matrix (the single owner of lobby state) and the entities it
//! holds: sessions, channels and battles.

pub mod battle;
pub mod channel;
pub mod managers;
mod matrix;
pub mod session;

pub use battle::{Battle, BattleId, BattleKind, BattleSettings, Bot, StartRect};
pub use channel::{Channel, MuteList, MuteRemaining, Topic};
pub use matrix::{Matrix, MatrixConfig, ServerInfo};
pub use session::{
    Access, AuthRequest, Delivery, Flush, LoginRequest, PendingAuth, Session, SessionId, Transport,
};

#[cfg(test)]
pub(crate) use matrix::testing;
