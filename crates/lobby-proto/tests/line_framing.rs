//! Property tests for the receive accumulator.

use lobby_proto::LineBuffer;
use proptest::prelude::*;

fn drain(buf: &mut LineBuffer) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(line) = buf.read_line() {
        lines.push(line);
    }
    lines
}

proptest! {
    /// However the byte stream is chopped up, the same lines come out.
    #[test]
    fn chunking_does_not_change_lines(
        lines in proptest::collection::vec("[A-Z]{1,8}( [a-z0-9]{1,6}){0,3}", 1..8),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let wire: Vec<u8> = lines.iter().flat_map(|l| format!("{l}\r\n").into_bytes()).collect();

        let mut offsets: Vec<usize> = cuts.iter().map(|c| c.index(wire.len())).collect();
        offsets.push(0);
        offsets.push(wire.len());
        offsets.sort_unstable();
        offsets.dedup();

        let mut buf = LineBuffer::new();
        let mut received = Vec::new();
        for pair in offsets.windows(2) {
            buf.extend(&wire[pair[0]..pair[1]]);
            received.extend(drain(&mut buf));
        }

        prop_assert_eq!(received, lines);
        prop_assert!(buf.is_empty());
    }

    /// Without a newline nothing is ever returned.
    #[test]
    fn no_newline_no_line(data in "[^\n]{0,64}") {
        let mut buf = LineBuffer::new();
        buf.extend(data.as_bytes());
        prop_assert_eq!(buf.read_line(), None);
    }
}
