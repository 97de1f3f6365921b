//! Conversions between the peer's local-rotation convention and the scene's
//! per-joint correction frames.
//!
//! The scene composes a joint's local orientation as
//! `rotate_axis · rotation · orientation`. The peer streams that full local
//! orientation, so going to the scene strips both correction frames and going
//! to the peer puts them back.

use glam::{DQuat, DVec3, EulerRot};

/// Allowed drift of a quaternion's magnitude before it is re-normalized.
pub const NORMALIZE_EPSILON: f64 = 1e-6;

/// Scene lengths are centimeters, peer lengths are meters.
pub const SCENE_UNITS_PER_PEER_UNIT: f64 = 100.0;

/// Inverse of [`SCENE_UNITS_PER_PEER_UNIT`].
pub const PEER_UNITS_PER_SCENE_UNIT: f64 = 0.01;

/// Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EulerAngles {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn from_array([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }

    /// Intrinsic X, then Y, then Z.
    #[must_use]
    pub fn to_quat(self) -> DQuat {
        DQuat::from_euler(EulerRot::XYZ, self.x, self.y, self.z)
    }
}

/// Re-normalizes `rotation` if its magnitude drifted outside
/// `[1 - ε, 1 + ε]`. Degenerate input becomes the identity.
#[must_use]
pub fn normalize(rotation: DQuat) -> DQuat {
    let length = rotation.length();
    if !length.is_finite() || length <= f64::EPSILON {
        return DQuat::IDENTITY;
    }
    if (length - 1.0).abs() > NORMALIZE_EPSILON {
        rotation / length
    } else {
        rotation
    }
}

/// The two correction quaternions of one joint, stored inverted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub rotate_axis_inverse: DQuat,
    pub orientation_inverse: DQuat,
}

impl Correction {
    pub const IDENTITY: Self = Self {
        rotate_axis_inverse: DQuat::IDENTITY,
        orientation_inverse: DQuat::IDENTITY,
    };

    /// Builds the correction from the forward frames.
    #[must_use]
    pub fn from_frames(rotate_axis: DQuat, orientation: DQuat) -> Self {
        Self {
            rotate_axis_inverse: normalize(rotate_axis).inverse(),
            orientation_inverse: normalize(orientation).inverse(),
        }
    }
}

impl Default for Correction {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Scene local rotation/translation to the peer convention.
#[must_use]
pub fn to_peer_space(
    scene_rotation: DQuat,
    scene_translation: DVec3,
    correction: &Correction,
) -> (DQuat, DVec3) {
    let rotate_axis = normalize(correction.rotate_axis_inverse).inverse();
    let orientation = normalize(correction.orientation_inverse).inverse();
    let rotation = normalize(rotate_axis * normalize(scene_rotation) * orientation);
    (rotation, scene_translation * PEER_UNITS_PER_SCENE_UNIT)
}

/// Peer local rotation/translation to the scene convention.
///
/// The translation is only produced for joints that carry one.
#[must_use]
pub fn to_scene_space(
    peer_rotation: DQuat,
    peer_translation: DVec3,
    carries_translation: bool,
    correction: &Correction,
) -> (DQuat, Option<DVec3>) {
    let rotate_axis_inverse = normalize(correction.rotate_axis_inverse);
    let orientation_inverse = normalize(correction.orientation_inverse);
    let rotation = normalize(rotate_axis_inverse * normalize(peer_rotation) * orientation_inverse);
    let translation = carries_translation
        .then(|| (rotate_axis_inverse * peer_translation) * SCENE_UNITS_PER_PEER_UNIT);
    (rotation, translation)
}
