//! Security module for lobbyd.
//!
//! Provides core security features:
//! - **Abuse guard**: failed-login bookkeeping with time-bounded blocking
//! - **Flood guard**: governor token bucket over received bytes
//! - **Passwords**: Argon2 hashing and verification, run off the reactor as
//!   credential jobs

pub mod abuse;
pub mod credentials;
pub mod password;
pub mod rate_limit;

pub use abuse::{AbuseGuard, LoginGate};
pub use credentials::{CredentialJob, CredentialOutcome};
pub use password::{hash_password_with, is_phc};
pub use rate_limit::FloodGuard;
