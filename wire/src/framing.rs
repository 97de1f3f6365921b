//! Newline-delimited JSON framing and the receive reassembly buffer.

use serde::Serialize;
use serde_json::{Deserializer, Map, Value};

use crate::error::{DecodeError, EncodeError, LimitKind};
use crate::limits::Limits;

/// One complete JSON object pulled out of the byte stream.
pub type Frame = Map<String, Value>;

/// Frame terminator on the wire.
pub const FRAME_DELIMITER: u8 = b'\n';

/// How an outbound object is framed.
///
/// The peer treats array-wrapped objects as safe to queue and replay in order,
/// while bare objects are "latest value wins": older undelivered ones may be
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Single-element array. Used for commands and acknowledgements.
    Queued,
    /// Bare object. Used for pose updates.
    Latest,
}

/// Serializes one object as a delimited frame.
pub fn encode_frame<T: Serialize>(
    value: &T,
    framing: Framing,
    packet_type: &'static str,
) -> Result<Vec<u8>, EncodeError> {
    let result = match framing {
        Framing::Queued => serde_json::to_vec(std::slice::from_ref(value)),
        Framing::Latest => serde_json::to_vec(value),
    };
    let mut bytes = result.map_err(|err| EncodeError::Serialize {
        packet_type,
        reason: err.to_string(),
    })?;
    bytes.push(FRAME_DELIMITER);
    Ok(bytes)
}

/// Frames and errors produced by one [`FrameBuffer::feed`] call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeedOutcome {
    /// Complete frames, in arrival order.
    pub frames: Vec<Frame>,
    /// Fragments that were dropped, in arrival order.
    pub errors: Vec<DecodeError>,
}

/// Reassembly buffer for a byte stream carrying JSON frames.
///
/// Bytes are consumed as soon as a value parses. A value cut off by the end of
/// the buffer is retained until more bytes arrive. Anything else that fails to
/// parse is dropped up to the next delimiter, so one bad packet never wedges
/// the stream. The retained remainder is capped by
/// [`Limits::max_buffer_bytes`].
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    limits: Limits,
}

impl FrameBuffer {
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            buf: Vec::new(),
            limits,
        }
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Number of bytes waiting for a frame boundary.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Appends `bytes` and extracts every complete frame.
    pub fn feed(&mut self, bytes: &[u8]) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();
        self.buf.extend_from_slice(bytes);

        let mut consumed = 0usize;
        loop {
            // Blank lines between frames.
            consumed += self.buf[consumed..]
                .iter()
                .take_while(|byte| byte.is_ascii_whitespace())
                .count();
            if consumed >= self.buf.len() {
                break;
            }

            let rest = &self.buf[consumed..];
            let mut values = Deserializer::from_slice(rest).into_iter::<Value>();
            match values.next() {
                None => consumed = self.buf.len(),
                Some(Ok(value)) => {
                    let len = values.byte_offset();
                    consumed += len;
                    if len > self.limits.max_frame_bytes {
                        outcome.errors.push(DecodeError::LimitsExceeded {
                            kind: LimitKind::FrameBytes,
                            limit: self.limits.max_frame_bytes,
                            actual: len,
                        });
                        continue;
                    }
                    split_frames(value, &mut outcome);
                }
                Some(Err(err)) if err.is_eof() || is_truncated(rest, &err) => break,
                Some(Err(err)) => {
                    let dropped = rest
                        .iter()
                        .position(|&byte| byte == FRAME_DELIMITER)
                        .map_or(rest.len(), |index| index + 1);
                    consumed += dropped;
                    outcome.errors.push(DecodeError::MalformedJson {
                        dropped,
                        reason: err.to_string(),
                    });
                }
            }
        }
        self.buf.drain(..consumed);

        if self.buf.len() > self.limits.max_buffer_bytes {
            outcome.errors.push(DecodeError::LimitsExceeded {
                kind: LimitKind::BufferBytes,
                limit: self.limits.max_buffer_bytes,
                actual: self.buf.len(),
            });
            self.buf.clear();
        }
        outcome
    }
}

/// A token cut at the end of the buffer (`0.`, `-`, `1e`) reports a syntax
/// error rather than end of input. It is only incomplete while no delimiter
/// has arrived and the parser stopped on the last byte.
fn is_truncated(rest: &[u8], err: &serde_json::Error) -> bool {
    !rest.contains(&FRAME_DELIMITER) && err.line() == 1 && err.column() == rest.len()
}

fn split_frames(value: Value, outcome: &mut FeedOutcome) {
    match value {
        Value::Object(frame) => outcome.frames.push(frame),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(frame) => outcome.frames.push(frame),
                    other => outcome.errors.push(DecodeError::NotAnObject {
                        found: value_kind(&other),
                    }),
                }
            }
        }
        other => outcome.errors.push(DecodeError::NotAnObject {
            found: value_kind(&other),
        }),
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
