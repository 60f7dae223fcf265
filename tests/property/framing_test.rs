// tests/property/framing_test.rs

//! Framing must not depend on how the transport splits the byte stream.

use bytes::BytesMut;
use lobbyd::core::protocol::LineCodec;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

/// Feeds `input` to a fresh codec in chunks ending at `cuts`.
fn decode_in_chunks(input: &[u8], cuts: &[usize], max: usize) -> Vec<String> {
    let mut codec = LineCodec::new(max);
    let mut buf = BytesMut::new();
    let mut lines = Vec::new();
    let mut start = 0;

    let mut ends: Vec<usize> = cuts.iter().map(|c| c % (input.len() + 1)).collect();
    ends.push(input.len());
    ends.sort_unstable();

    for end in ends {
        if end < start {
            continue;
        }
        buf.extend_from_slice(&input[start..end]);
        start = end;
        while let Some(line) = codec.decode(&mut buf).unwrap() {
            lines.push(line);
        }
    }
    lines
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_chunking_does_not_change_lines(
        lines in prop::collection::vec("[a-z_ ]{0,40}", 0..16),
        cuts in prop::collection::vec(any::<usize>(), 0..24),
    ) {
        let input: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let decoded = decode_in_chunks(input.as_bytes(), &cuts, 1024);
        prop_assert_eq!(decoded, lines);
    }

    #[test]
    fn test_crlf_is_stripped(
        lines in prop::collection::vec("[a-z_ ]{0,40}", 1..8),
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let input: String = lines.iter().map(|l| format!("{l}\r\n")).collect();
        let decoded = decode_in_chunks(input.as_bytes(), &cuts, 1024);
        prop_assert_eq!(decoded, lines);
    }

    #[test]
    fn test_unterminated_tail_is_held_back(
        line in "[a-z_ ]{0,40}",
        tail in "[a-z_ ]{1,40}",
        cuts in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let input = format!("{line}\n{tail}");
        let decoded = decode_in_chunks(input.as_bytes(), &cuts, 1024);
        prop_assert_eq!(decoded, vec![line]);
    }

    #[test]
    fn test_buffer_stays_bounded(
        bytes in prop::collection::vec(any::<u8>(), 0..4096),
        max in 2usize..64,
    ) {
        let mut codec = LineCodec::new(max);
        let mut buf = BytesMut::new();
        for chunk in bytes.chunks(7) {
            buf.extend_from_slice(chunk);
            while codec.decode(&mut buf).unwrap().is_some() {}
            prop_assert!(buf.len() < max + 7);
        }
    }
}
