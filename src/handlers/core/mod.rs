//! Core handler infrastructure.
//!
//! The handler trait with its declarative [`CommandSpec`], the per-command
//! [`Context`] and the [`Registry`] that runs the precondition pipeline.

pub mod context;
pub mod registry;
pub mod traits;

pub use context::{Context, epoch_millis, epoch_secs};
pub use registry::Registry;
pub use traits::{CommandSpec, Handler};
