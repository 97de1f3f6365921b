//! Wire framing and packet types for the Mosketch streaming link.
//!
//! This crate handles the wire format spoken with the peer: newline-delimited
//! JSON frames, reassembly of fragmented byte streams, and the typed packets
//! carried inside frames. It does not know about scenes or rotations beyond
//! the raw arrays on the wire.
//!
//! # Design Principles
//!
//! - **Tolerant reassembly** - A malformed fragment is dropped, never retained.
//! - **Bounded buffering** - The reassembly buffer is capped by [`Limits`].
//! - **No domain knowledge** - This crate handles framing, not retargeting.

mod error;
mod framing;
mod limits;
mod packet;

pub use error::{DecodeError, EncodeError, LimitKind, WireResult};
pub use framing::{encode_frame, FeedOutcome, Frame, FrameBuffer, Framing, FRAME_DELIMITER};
pub use limits::Limits;
pub use packet::{
    encode_packet, Command, Hierarchy, InboundPacket, JointSample, JointSpace, JointsStream,
    JointsUuids, OrientationMode, OutboundPacket, ANATOMICAL_SIX_DOF, TYPE_KEY,
};
