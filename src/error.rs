//! Unified error handling for lobbyd.
//!
//! This module provides the error hierarchy for command processing and
//! dispatcher setup, with client-visible reply generation.

use crate::state::{Access, BattleId};
use lobby_proto::ProtocolError;
use thiserror::Error;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors that can occur during command handling.
///
/// All of these are recovered locally: the command is rejected and the
/// sender usually gets a reply. Only the issuing session is affected.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Framing, binding or conversion failure.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("expected {min}..{} arguments, got {actual}", .max.map_or("".to_string(), |m| m.to_string()))]
    ArgumentBounds {
        min: usize,
        max: Option<usize>,
        actual: usize,
    },

    #[error("requires {required} access, you have {actual}")]
    InsufficientAccess { required: Access, actual: Access },

    #[error("not in a battle")]
    NotInBattle,

    #[error("not the founder of battle {0}")]
    NotFounder(BattleId),

    /// The request was understood but refused by the command itself.
    #[error("{0}")]
    Rejected(String),

    /// A cross-entity reference pointed at something that no longer exists.
    #[error("inconsistent state: {0}")]
    ProtocolState(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Protocol(e) => e.error_code(),
            Self::ArgumentBounds { .. } => "argument_bounds",
            Self::InsufficientAccess { .. } => "insufficient_access",
            Self::NotInBattle => "not_in_battle",
            Self::NotFounder(_) => "not_founder",
            Self::Rejected(_) => "rejected",
            Self::ProtocolState(_) => "protocol_state",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Convert to the line sent back to the issuing session.
    ///
    /// Returns `None` for errors that don't warrant a client-visible reply.
    pub fn to_reply(&self, keyword: &str) -> Option<String> {
        match self {
            Self::Io(_) | Self::Internal(_) => None,
            other => Some(format!("SERVERMSG {keyword} failed: {other}")),
        }
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Registration Errors (dispatcher setup)
// ============================================================================

/// A command table entry that cannot be registered.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{0}: founder-only commands must also require battle membership")]
    FounderWithoutMembership(&'static str),

    #[error("{0}: keyword registered twice")]
    Duplicate(&'static str),

    #[error("{keyword}: {source}")]
    Shape {
        keyword: &'static str,
        #[source]
        source: ProtocolError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_bounds_message() {
        let err = HandlerError::ArgumentBounds {
            min: 2,
            max: Some(3),
            actual: 1,
        };
        assert_eq!(err.to_string(), "expected 2..3 arguments, got 1");
        let open = HandlerError::ArgumentBounds {
            min: 1,
            max: None,
            actual: 0,
        };
        assert_eq!(open.to_string(), "expected 1.. arguments, got 0");
    }

    #[test]
    fn replies_name_the_keyword() {
        let reply = HandlerError::NotInBattle.to_reply("SAYBATTLE").unwrap();
        assert_eq!(reply, "SERVERMSG SAYBATTLE failed: not in a battle");
        assert!(HandlerError::Internal("x".into()).to_reply("PING").is_none());
    }

    #[test]
    fn protocol_errors_keep_their_code() {
        let err = HandlerError::from(ProtocolError::ArgumentCount { field: "battleID" });
        assert_eq!(err.error_code(), "argument_count");
        assert!(err.to_reply("JOINBATTLE").unwrap().contains("battleID"));
    }

    #[test]
    fn access_error_shows_levels() {
        let err = HandlerError::InsufficientAccess {
            required: Access::Admin,
            actual: Access::User,
        };
        assert_eq!(err.to_string(), "requires admin access, you have user");
    }
}
