//! Command line framing.
//!
//! A line is `[#<digits> ]KEYWORD[ <arguments>]`. Framing only separates the
//! optional response id, the keyword and the raw argument tail; argument
//! binding is the job of [`crate::args`].

use crate::error::{ProtocolError, Result};

/// A framed command line borrowing from the received text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    /// Response id requested by the client, echoed on direct replies.
    pub id: Option<u32>,
    /// Keyword as sent by the client.
    pub raw_keyword: &'a str,
    /// Everything after the keyword separator (may be empty).
    pub args: &'a str,
}

impl<'a> CommandLine<'a> {
    /// Frame a single line.
    ///
    /// A `#` prefix that is not followed by one or more ASCII digits and a
    /// space is rejected with [`ProtocolError::MalformedId`].
    pub fn parse(line: &'a str) -> Result<Self> {
        let (id, rest) = match line.strip_prefix('#') {
            Some(tail) => {
                let (digits, rest) = tail
                    .split_once(' ')
                    .ok_or_else(|| ProtocolError::MalformedId(line.to_string()))?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ProtocolError::MalformedId(line.to_string()));
                }
                let id = digits
                    .parse::<u32>()
                    .map_err(|_| ProtocolError::MalformedId(line.to_string()))?;
                (Some(id), rest)
            }
            None => (None, line),
        };

        let rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return Err(ProtocolError::EmptyLine);
        }

        let (raw_keyword, args) = match rest.find([' ', '\t']) {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, ""),
        };

        Ok(Self {
            id,
            raw_keyword,
            args,
        })
    }

    /// Keyword normalised for table lookup.
    pub fn keyword(&self) -> String {
        self.raw_keyword.to_ascii_uppercase()
    }

    /// Number of non-empty space-separated tokens in the argument tail.
    ///
    /// Used for coarse argument bounds before binding.
    pub fn token_count(&self) -> usize {
        self.args.split(' ').filter(|t| !t.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_command() {
        let cmd = CommandLine::parse("joinbattle 12 secret").unwrap();
        assert_eq!(cmd.id, None);
        assert_eq!(cmd.keyword(), "JOINBATTLE");
        assert_eq!(cmd.args, "12 secret");
        assert_eq!(cmd.token_count(), 2);
    }

    #[test]
    fn response_id_prefix() {
        let cmd = CommandLine::parse("#42 PING").unwrap();
        assert_eq!(cmd.id, Some(42));
        assert_eq!(cmd.keyword(), "PING");
        assert_eq!(cmd.args, "");
        assert_eq!(cmd.token_count(), 0);
    }

    #[test]
    fn malformed_prefix_is_rejected() {
        for line in ["#abc PING", "# PING", "#12", "#1x2 PING", "#99999999999 PING"] {
            assert!(
                matches!(CommandLine::parse(line), Err(ProtocolError::MalformedId(_))),
                "{line} should be rejected"
            );
        }
    }

    #[test]
    fn empty_after_prefix() {
        assert_eq!(CommandLine::parse("#7 "), Err(ProtocolError::EmptyLine));
        assert_eq!(CommandLine::parse(""), Err(ProtocolError::EmptyLine));
    }

    #[test]
    fn tab_terminates_keyword() {
        let cmd = CommandLine::parse("SAYBATTLE\thello there").unwrap();
        assert_eq!(cmd.keyword(), "SAYBATTLE");
        assert_eq!(cmd.args, "hello there");
    }
}
