//! Receive-side line accumulator.
//!
//! Bytes arrive in arbitrary chunks; [`LineBuffer::read_line`] hands back
//! exactly one complete line per call and is restartable across partial
//! appends. Decoding happens per line, so a multi-byte character split across
//! two reads is never mangled.

use bytes::{Buf, BytesMut};

/// Accumulates raw bytes and yields newline-terminated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
    /// Number of leading bytes already known to contain no `\n`.
    scanned: usize,
}

impl LineBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            scanned: 0,
        }
    }

    /// Append freshly received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes currently buffered (complete and partial lines).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Length of the trailing partial line, i.e. bytes with no newline yet.
    pub fn pending_partial(&self) -> usize {
        match self.buf.iter().rposition(|b| *b == b'\n') {
            Some(pos) => self.buf.len() - pos - 1,
            None => self.buf.len(),
        }
    }

    /// Remove and return one complete line, or `None` if no full line is
    /// buffered yet.
    ///
    /// Leading whitespace (including blank lines) is discarded, every `\r`
    /// inside the line is stripped and the terminating `\n` is consumed.
    pub fn read_line(&mut self) -> Option<String> {
        let leading = self
            .buf
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        if leading > 0 {
            self.buf.advance(leading);
            self.scanned = self.scanned.saturating_sub(leading);
        }

        let offset = match self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            Some(offset) => offset,
            None => {
                self.scanned = self.buf.len();
                return None;
            }
        };

        let end = self.scanned + offset;
        let raw = self.buf.split_to(end + 1);
        self.scanned = 0;

        let bytes: Vec<u8> = raw[..end].iter().copied().filter(|b| *b != b'\r').collect();
        Some(match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_appends_yield_one_line() {
        let mut buf = LineBuffer::new();
        buf.extend(b"AB");
        assert_eq!(buf.read_line(), None);
        buf.extend(b"CD\n");
        assert_eq!(buf.read_line().as_deref(), Some("ABCD"));
        assert_eq!(buf.read_line(), None);
    }

    #[test]
    fn strips_carriage_returns_and_leading_whitespace() {
        let mut buf = LineBuffer::new();
        buf.extend(b"\r\n  \tPING\r\n\n\nSAY main\thi\r\n");
        assert_eq!(buf.read_line().as_deref(), Some("PING"));
        assert_eq!(buf.read_line().as_deref(), Some("SAY main\thi"));
        assert_eq!(buf.read_line(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn returns_exactly_one_line_per_call() {
        let mut buf = LineBuffer::new();
        buf.extend(b"A\nB\nC");
        assert_eq!(buf.read_line().as_deref(), Some("A"));
        assert_eq!(buf.pending_partial(), 1);
        assert_eq!(buf.read_line().as_deref(), Some("B"));
        assert_eq!(buf.read_line(), None);
        buf.extend(b"\n");
        assert_eq!(buf.read_line().as_deref(), Some("C"));
    }

    #[test]
    fn split_multibyte_character_survives() {
        let text = "SAY main\tżółw\n".as_bytes();
        let mut buf = LineBuffer::new();
        // split inside the two-byte 'ż'
        let cut = text.iter().position(|b| *b >= 0x80).unwrap() + 1;
        buf.extend(&text[..cut]);
        assert_eq!(buf.read_line(), None);
        buf.extend(&text[cut..]);
        assert_eq!(buf.read_line().as_deref(), Some("SAY main\tżółw"));
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let mut buf = LineBuffer::new();
        buf.extend(b"SAY x\t\xff\n");
        let line = buf.read_line().unwrap();
        assert!(line.starts_with("SAY x\t"));
        assert!(line.contains('\u{FFFD}'));
    }

    #[test]
    fn whitespace_only_input_yields_nothing() {
        let mut buf = LineBuffer::with_capacity(16);
        buf.extend(b"   \r\n\t ");
        assert_eq!(buf.read_line(), None);
        assert!(buf.is_empty());
        buf.extend(b"X\n");
        assert_eq!(buf.read_line().as_deref(), Some("X"));
    }
}
