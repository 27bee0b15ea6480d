//! # lobby-proto
//!
//! Wire layer for the lobbyd text protocol.
//!
//! - [`line::LineBuffer`]: restartable newline framing over raw bytes
//! - [`command::CommandLine`]: `#id` prefix, keyword and argument tail
//! - [`args`]: declarative argument shapes with typed conversion
//! - [`status`]: packed client and battle status words
//!
//! ## Quick Start
//!
//! ```rust
//! use lobby_proto::{ArgumentShape, CommandLine, Field, LineBuffer};
//!
//! let mut buf = LineBuffer::new();
//! buf.extend(b"#7 JOINBATTLE 12 sec");
//! assert!(buf.read_line().is_none());
//! buf.extend(b"ret\r\n");
//!
//! let line = buf.read_line().unwrap();
//! let cmd = CommandLine::parse(&line).unwrap();
//! assert_eq!(cmd.id, Some(7));
//! assert_eq!(cmd.keyword(), "JOINBATTLE");
//!
//! let shape = ArgumentShape::words([
//!     Field::required("battleID").int(),
//!     Field::optional("password"),
//! ]);
//! let args = shape.bind(cmd.args, false).unwrap();
//! assert_eq!(args.int("battleID"), Ok(12));
//! assert_eq!(args.opt_text("password"), Some("secret"));
//! ```

#![deny(clippy::all)]

pub mod args;
pub mod command;
pub mod error;
pub mod line;
pub mod status;

pub use args::{ArgumentShape, Conversion, Field, ParsedArguments, Value};
pub use command::CommandLine;
pub use error::{ConversionKind, ProtocolError};
pub use line::LineBuffer;
pub use status::{BattleStatus, ClientStatus, Mode, TeamColor};
