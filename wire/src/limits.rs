//! Configurable limits for bounded reassembly and decoding.

/// Wire-level limits for framing and packet decoding.
///
/// These limits keep the reassembly buffer bounded under sustained malformed
/// or never-terminated input, and cap the size of a single decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of bytes retained while waiting for a frame to complete.
    pub max_buffer_bytes: usize,

    /// Maximum size of a single parsed frame in bytes.
    pub max_frame_bytes: usize,

    /// Maximum number of joint entries in one packet.
    pub max_joints_per_packet: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // A full-body stream with a few hundred joints stays well under 256 KB
            max_buffer_bytes: 1024 * 1024,
            max_frame_bytes: 512 * 1024,
            max_joints_per_packet: 4096,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_buffer_bytes: 1024,
            max_frame_bytes: 512,
            max_joints_per_packet: 8,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_buffer_bytes: usize::MAX,
            max_frame_bytes: usize::MAX,
            max_joints_per_packet: usize::MAX,
        }
    }
}
