use std::collections::HashMap;

use bevy_ecs::prelude::{Component, Entity};
use glam::{DQuat, DVec3};
use retarget::EulerAngles;

/// Scene-unique (ideally) node name matched against peer joint names.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct NodeName(pub String);

/// What a node is in the rig.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Joint,
    Transform,
    Controller,
    ControlRigRoot,
    ControlSet,
}

impl NodeRole {
    /// Nodes a peer joint name may map to directly.
    #[must_use]
    pub const fn is_joint_like(self) -> bool {
        matches!(self, Self::Joint | Self::Transform)
    }
}

/// Parent-relative pose in centimeters.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub rotation: DQuat,
    pub translation: DVec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            rotation: DQuat::IDENTITY,
            translation: DVec3::ZERO,
        }
    }
}

impl LocalTransform {
    #[must_use]
    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            rotation,
            ..Self::default()
        }
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct RotateAxis(pub EulerAngles);

/// Static orientation offset. Only joints carry one.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct JointOrient(pub DQuat);

/// Named slots of a control rig root, each driving one controller.
#[derive(Component, Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlRig {
    pub slots: HashMap<String, Entity>,
}
