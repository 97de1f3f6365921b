//! Retargeting streaming engine for the Mosketch link.
//!
//! This crate ties the `wire` codec to a local scene: it maps the peer's joint
//! hierarchy onto scene nodes, converts rotations between the peer's local
//! convention and the scene's correction frames, and runs the connection
//! state machine that drives the handshake and pose stream.
//!
//! # Features
//!
//! - Sans-I/O [`Session`] with queued outbound frames and status events
//! - Direct joint mapping and control-rig controller mapping
//! - Quaternion conversions with rotate-axis and orientation corrections
//! - [`Scene`] adapter traits with an in-memory implementation
//!
//! # Design Principles
//!
//! - **No I/O** - The driver owns the socket; the session only queues bytes.
//! - **Rebuild, never patch** - Mapping tables are replaced on every handshake.
//! - **Skip, don't fail** - Unmapped joints in a stream are ignored.

mod config;
mod error;
mod mapping;
mod memory;
mod scene;
mod session;
mod transform;
mod types;

pub use config::{SessionConfig, DEFAULT_PEER_PORT};
pub use error::{SessionError, SessionResult};
pub use mapping::{
    map_controllers, map_joints, JointBinding, MappingOutcome, MappingTable, MappingWarning,
};
pub use memory::{MemoryScene, NodeId};
pub use scene::{ControlRigScene, NodeKind, Scene};
pub use session::{Report, ReportLevel, Session, SessionEvent, Transmit, UuidTable};
pub use transform::{
    normalize, to_peer_space, to_scene_space, Correction, EulerAngles, NORMALIZE_EPSILON,
    PEER_UNITS_PER_SCENE_UNIT, SCENE_UNITS_PER_PEER_UNIT,
};
pub use types::{ConnectionState, PoseSample, StreamingMode};
pub use wire::Limits as WireLimits;
