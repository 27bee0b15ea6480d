//! Credential work that runs off the reactor.
//!
//! An Argon2 run takes tens of milliseconds, so LOGIN and REGISTER only queue a
//! [`CredentialJob`]. The gateway runs it on the blocking pool and hands the
//! [`CredentialOutcome`] back to the reactor as an event.

use super::password::{hash_password_with, verify_password};
use crate::config::HashCost;
use std::fmt;
use tracing::warn;

pub enum CredentialJob {
    /// Check `password` against a stored PHC string.
    Verify { password: String, phc: String },
    /// Hash a new password.
    Hash { password: String, cost: HashCost },
}

impl fmt::Debug for CredentialJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify { .. } => f.write_str("Verify"),
            Self::Hash { cost, .. } => f.debug_struct("Hash").field("cost", cost).finish(),
        }
    }
}

#[derive(Debug)]
pub enum CredentialOutcome {
    Verified(bool),
    Hashed(Result<String, argon2::password_hash::Error>),
}

impl CredentialJob {
    /// Do the work. Blocks for one Argon2 run.
    pub fn run(self) -> CredentialOutcome {
        match self {
            Self::Verify { password, phc } => match verify_password(&password, &phc) {
                Ok(ok) => CredentialOutcome::Verified(ok),
                Err(e) => {
                    warn!(error = %e, "Stored password hash is unreadable");
                    CredentialOutcome::Verified(false)
                }
            },
            Self::Hash { password, cost } => {
                CredentialOutcome::Hashed(hash_password_with(&password, cost))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEAP: HashCost = HashCost {
        memory_kib: 64,
        iterations: 1,
    };

    #[test]
    fn hash_then_verify() {
        let CredentialOutcome::Hashed(Ok(phc)) = (CredentialJob::Hash {
            password: "pw".into(),
            cost: CHEAP,
        })
        .run() else {
            panic!("hashing failed");
        };
        let good = CredentialJob::Verify {
            password: "pw".into(),
            phc: phc.clone(),
        };
        assert!(matches!(good.run(), CredentialOutcome::Verified(true)));
        let bad = CredentialJob::Verify {
            password: "nope".into(),
            phc,
        };
        assert!(matches!(bad.run(), CredentialOutcome::Verified(false)));
    }

    #[test]
    fn unreadable_hash_fails_verification() {
        let job = CredentialJob::Verify {
            password: "pw".into(),
            phc: "plaintext".into(),
        };
        assert_eq!(format!("{job:?}"), "Verify");
        assert!(matches!(job.run(), CredentialOutcome::Verified(false)));
    }
}
