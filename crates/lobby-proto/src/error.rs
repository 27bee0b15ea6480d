//! Error types for the lobby protocol library.
//!
//! Everything that can go wrong between "a line arrived" and "a handler
//! received typed arguments" is a [`ProtocolError`].

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// The kind of typed conversion that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// `0` or `1`.
    Boolean,
    /// Packed `0x00BBGGRR` integer colour.
    Color,
    /// IPv4 or IPv6 address.
    IpAddress,
}

impl std::fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Boolean => "boolean",
            Self::Color => "color",
            Self::IpAddress => "ip address",
        };
        f.write_str(name)
    }
}

/// Protocol-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The `#<digits> ` response-id prefix was present but malformed.
    #[error("malformed response id prefix: {0:?}")]
    MalformedId(String),

    /// The line held no command keyword.
    #[error("empty command line")]
    EmptyLine,

    /// A required field had no value.
    #[error("missing required argument '{field}'")]
    ArgumentCount {
        /// Name of the first missing field.
        field: &'static str,
    },

    /// A value could not be converted to the field's declared type.
    #[error("argument '{field}' is not a valid {kind}: {value:?}")]
    Conversion {
        /// Field name.
        field: &'static str,
        /// Raw value that failed to convert.
        value: String,
        /// Declared conversion.
        kind: ConversionKind,
    },

    /// A named-argument token did not contain exactly one `=`.
    #[error("malformed key=value pair: {token:?}")]
    MalformedPair {
        /// The offending token.
        token: String,
    },

    /// Unknown key in a named-argument list while strict mode is on.
    #[error("unknown argument key '{key}'")]
    UnknownKey {
        /// The unrecognised key.
        key: String,
    },

    /// A field was declared in a way that makes parsing ambiguous.
    #[error("ambiguous argument shape: {0}")]
    AmbiguousShape(&'static str),
}

impl ProtocolError {
    /// Static code for log labelling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedId(_) => "malformed_id",
            Self::EmptyLine => "empty_line",
            Self::ArgumentCount { .. } => "argument_count",
            Self::Conversion { .. } => "argument_conversion",
            Self::MalformedPair { .. } => "malformed_pair",
            Self::UnknownKey { .. } => "unknown_key",
            Self::AmbiguousShape(_) => "ambiguous_shape",
        }
    }

    /// Whether this error stems from argument binding (as opposed to framing).
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::ArgumentCount { .. }
                | Self::Conversion { .. }
                | Self::MalformedPair { .. }
                | Self::UnknownKey { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_error_names_field() {
        let err = ProtocolError::Conversion {
            field: "maxPlayers",
            value: "ten".into(),
            kind: ConversionKind::Integer,
        };
        let text = err.to_string();
        assert!(text.contains("maxPlayers"));
        assert!(text.contains("integer"));
        assert_eq!(err.error_code(), "argument_conversion");
        assert!(err.is_argument_error());
    }

    #[test]
    fn framing_errors_are_not_argument_errors() {
        assert!(!ProtocolError::EmptyLine.is_argument_error());
        assert!(!ProtocolError::MalformedId("#x".into()).is_argument_error());
    }
}
