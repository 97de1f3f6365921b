#![no_main]

use libfuzzer_sys::fuzz_target;
use wire::{FrameBuffer, InboundPacket, Limits};

fuzz_target!(|data: &[u8]| {
    let limits = Limits::for_testing();
    let mut buffer = FrameBuffer::new(limits.clone());

    // First byte picks the split size so fragmented delivery is covered too.
    let (chunk, data) = match data.split_first() {
        Some((first, rest)) => (usize::from(*first).max(1), rest),
        None => return,
    };
    for piece in data.chunks(chunk) {
        let outcome = buffer.feed(piece);
        assert!(buffer.len() <= limits.max_buffer_bytes);
        for frame in outcome.frames {
            let _ = InboundPacket::decode(frame, &limits);
        }
    }
});
