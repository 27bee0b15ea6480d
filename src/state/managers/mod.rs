//! Domain managers for lobby state.
//!
//! Each manager owns one collection. Flows that cross collections (a kill
//! leaving channels and battles, a join touching a battle and its sessions)
//! are implemented on [`crate::state::Matrix`] inside the manager module of
//! the domain they start from.

pub mod battle;
pub mod channel;
pub mod session;

pub use battle::{BattleJoinRefusal, BattleManager, JoinOutcome};
pub use channel::{ChannelManager, JoinRefusal};
pub use session::SessionManager;
