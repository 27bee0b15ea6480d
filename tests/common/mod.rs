//! Integration test common infrastructure.
//!
//! Spawns the `lobbyd` binary against a generated config and drives it with
//! line-oriented test clients.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
