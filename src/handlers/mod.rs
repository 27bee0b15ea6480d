//! Lobby command handlers.
//!
//! `core` holds the [`Handler`] trait, the handler [`Context`] and the
//! [`Registry`] that runs the uniform precondition pipeline. Each sibling
//! module registers one family of commands.

mod admin;
mod battle;
mod channel;
mod connection;
pub mod core;
pub mod helpers;

pub use self::connection::complete_credentials;
pub use self::core::{CommandSpec, Context, Handler, Registry, epoch_millis, epoch_secs};

#[cfg(test)]
pub(crate) mod testing {
    //! Run queued credential work inline.

    use super::{Registry, complete_credentials};
    use crate::state::Matrix;
    use std::time::Instant;

    /// Run every queued credential job and deliver its outcome.
    pub fn settle(registry: &Registry, matrix: &mut Matrix, now: Instant) {
        for (id, job) in matrix.take_credential_jobs() {
            let _ = complete_credentials(registry, matrix, id, job.run(), now);
        }
    }
}
