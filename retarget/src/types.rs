//! Core types for the retargeting session.

use std::fmt;
use std::str::FromStr;

use glam::{DQuat, DVec3};
use wire::{JointSample, ANATOMICAL_SIX_DOF};

/// Which mapping table receives streamed poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamingMode {
    /// Peer joints drive scene joints directly.
    #[default]
    Joints,
    /// Peer joints drive the FK controllers of a control rig.
    Controllers,
}

impl fmt::Display for StreamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Joints => "joints",
            Self::Controllers => "controllers",
        };
        write!(f, "{name}")
    }
}

impl FromStr for StreamingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "joints" => Ok(Self::Joints),
            "controllers" => Ok(Self::Controllers),
            other => Err(format!("unknown streaming mode: {other}")),
        }
    }
}

/// Lifecycle of the single peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        write!(f, "{name}")
    }
}

/// One joint's pose in the peer convention (meters, local rotation).
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSample {
    pub joint_name: String,
    pub rotation: DQuat,
    pub translation: DVec3,
    pub anatomical_type: Option<i64>,
}

impl PoseSample {
    /// Only six-DoF joints carry a meaningful translation.
    #[must_use]
    pub fn carries_translation(&self) -> bool {
        self.anatomical_type == Some(ANATOMICAL_SIX_DOF)
    }

    #[must_use]
    pub fn to_wire(&self) -> JointSample {
        JointSample {
            name: self.joint_name.clone(),
            rotation: self.rotation.to_array(),
            translation: self.translation.to_array(),
            anatomical_type: self.anatomical_type,
        }
    }
}

impl From<&JointSample> for PoseSample {
    fn from(sample: &JointSample) -> Self {
        Self {
            joint_name: sample.name.clone(),
            rotation: DQuat::from_array(sample.rotation),
            translation: DVec3::from_array(sample.translation),
            anatomical_type: sample.anatomical_type,
        }
    }
}
