use proptest::prelude::*;
use wire::{FrameBuffer, InboundPacket, Limits};

const PAYLOAD: &str = concat!(
    "{\"Type\":\"Hierarchy\",\"Joints\":[\"hips\",\"spine\",\"neck\"]}\n",
    "[{\"Type\":\"JointsUuids\",\"Joints\":[{\"hips\":\"u-1\"},{\"spine\":\"u-2\"}]}]\n",
    "\n",
    "{\"Type\":\"JointsStream\",\"Joints\":[",
    "{\"Name\":\"hips\",\"R\":[0.0,0.7071067811865476,0.0,0.7071067811865476],\"T\":[0.1,0.9,-0.25],\"Anatom\":7},",
    "{\"Name\":\"spine\",\"R\":[0.1,0.0,0.0,0.99498743710662],\"T\":[0.0,0.0,0.0],\"Anatom\":2}",
    "]}\n",
);

fn feed_chunks(chunks: &[&[u8]]) -> Vec<wire::Frame> {
    let mut buffer = FrameBuffer::new(Limits::default());
    let mut frames = Vec::new();
    for chunk in chunks {
        let outcome = buffer.feed(chunk);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        frames.extend(outcome.frames);
    }
    assert!(buffer.is_empty());
    frames
}

#[test]
fn whole_payload_decodes_three_packets() {
    let frames = feed_chunks(&[PAYLOAD.as_bytes()]);
    let types: Vec<&'static str> = frames
        .into_iter()
        .map(|frame| {
            InboundPacket::decode(frame, &Limits::default())
                .unwrap()
                .packet_type()
        })
        .collect();
    assert_eq!(types, vec!["Hierarchy", "JointsUuids", "JointsStream"]);
}

#[test]
fn byte_at_a_time_matches_whole() {
    let bytes = PAYLOAD.as_bytes();
    let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
    assert_eq!(feed_chunks(&chunks), feed_chunks(&[bytes]));
}

proptest! {
    #[test]
    fn prop_split_anywhere_matches_whole(split in 0usize..=PAYLOAD.len()) {
        let bytes = PAYLOAD.as_bytes();
        let (head, tail) = bytes.split_at(split);
        prop_assert_eq!(feed_chunks(&[head, tail]), feed_chunks(&[bytes]));
    }

    #[test]
    fn prop_three_way_split_matches_whole(a in 0usize..=PAYLOAD.len(), b in 0usize..=PAYLOAD.len()) {
        let bytes = PAYLOAD.as_bytes();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let chunks = [&bytes[..lo], &bytes[lo..hi], &bytes[hi..]];
        prop_assert_eq!(feed_chunks(&chunks), feed_chunks(&[bytes]));
    }

    #[test]
    fn prop_garbage_never_wedges_buffer(garbage in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut buffer = FrameBuffer::new(Limits::for_testing());
        let _ = buffer.feed(&garbage);
        let _ = buffer.feed(b"\n");
        let _ = buffer.feed(b"{\"Type\":\"Hierarchy\",\"Joints\":[]}\n");
        prop_assert!(buffer.len() <= Limits::for_testing().max_buffer_bytes);
    }
}
