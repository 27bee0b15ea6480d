//! Network module.
//!
//! The TCP gateway, the reactor it drives, and the transport glue between
//! socket tasks and sessions.

mod gateway;
pub mod reactor;
mod transport;

pub use gateway::Gateway;
pub use reactor::{NetEvent, Reactor};
