//! Property-based tests for frame decoding
//!
//! The decoder's core contract: the frames produced for a byte stream do not
//! depend on how that stream is split into chunks.

use super::{Frame, FrameDecoder};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Strategies
// ============================================================================

fn arb_event_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("thinking".to_string()),
        Just("tool_call".to_string()),
        Just("tool_result".to_string()),
        Just("text".to_string()),
        Just("proposal".to_string()),
        Just("error".to_string()),
        "[a-z_]{1,12}",
    ]
}

/// Text with multi-byte characters so chunk cuts land inside code points
fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?éüß→🏃🚴💪\\\\\"]{0,40}"
}

fn arb_frame() -> impl Strategy<Value = Frame> {
    (arb_event_name(), arb_text()).prop_map(|(event, text)| {
        Frame::new(event, json!({ "message": text }).to_string())
    })
}

#[derive(Debug, Clone, Copy)]
enum LineEnding {
    Lf,
    CrLf,
}

fn arb_line_ending() -> impl Strategy<Value = LineEnding> {
    prop_oneof![Just(LineEnding::Lf), Just(LineEnding::CrLf)]
}

fn encode(frames: &[Frame], ending: LineEnding, keep_alive: bool) -> Vec<u8> {
    let nl = match ending {
        LineEnding::Lf => "\n",
        LineEnding::CrLf => "\r\n",
    };
    let mut out = String::new();
    for frame in frames {
        if keep_alive {
            out.push_str(&format!(": ping{nl}"));
        }
        out.push_str(&format!(
            "event: {}{nl}data: {}{nl}{nl}",
            frame.event_name, frame.raw_payload
        ));
    }
    out.into_bytes()
}

/// Split `bytes` at the given (unsorted, possibly duplicate) cut points
fn split_at_cuts(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut points: Vec<usize> = cuts
        .iter()
        .map(|c| if bytes.is_empty() { 0 } else { c % (bytes.len() + 1) })
        .collect();
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for point in points {
        chunks.push(bytes[start..point].to_vec());
        start = point;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

fn decode_chunks(chunks: &[Vec<u8>]) -> Vec<Frame> {
    let mut decoder = FrameDecoder::new();
    let mut frames: Vec<Frame> = chunks.iter().flat_map(|c| decoder.feed(c)).collect();
    frames.extend(decoder.finish());
    frames
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_chunk_boundary_invariance(
        frames in proptest::collection::vec(arb_frame(), 0..8),
        ending in arb_line_ending(),
        keep_alive: bool,
        cuts in proptest::collection::vec(any::<usize>(), 0..24),
    ) {
        let bytes = encode(&frames, ending, keep_alive);
        let whole = decode_chunks(&[bytes.clone()]);
        let chunked = decode_chunks(&split_at_cuts(&bytes, &cuts));

        prop_assert_eq!(&whole, &chunked);
        prop_assert_eq!(&whole, &frames);
    }

    #[test]
    fn prop_byte_at_a_time_matches_whole(
        frames in proptest::collection::vec(arb_frame(), 1..4),
    ) {
        let bytes = encode(&frames, LineEnding::Lf, false);
        let singles: Vec<Vec<u8>> = bytes.iter().map(|b| vec![*b]).collect();

        prop_assert_eq!(decode_chunks(&singles), frames);
    }

    #[test]
    fn prop_malformed_frames_do_not_disturb_neighbours(
        before in proptest::collection::vec(arb_frame(), 0..4),
        after in proptest::collection::vec(arb_frame(), 0..4),
        garbage in "\\{[a-z :]{0,10}",
        cuts in proptest::collection::vec(any::<usize>(), 0..12),
    ) {
        let mut bytes = encode(&before, LineEnding::Lf, false);
        bytes.extend_from_slice(format!("event: text\ndata: {garbage}\n\n").as_bytes());
        bytes.extend(encode(&after, LineEnding::Lf, false));

        let mut expected = before.clone();
        expected.extend(after.iter().cloned());

        prop_assert_eq!(decode_chunks(&split_at_cuts(&bytes, &cuts)), expected);
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
        cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let whole = decode_chunks(&[bytes.clone()]);
        let chunked = decode_chunks(&split_at_cuts(&bytes, &cuts));
        prop_assert_eq!(whole, chunked);
    }
}
