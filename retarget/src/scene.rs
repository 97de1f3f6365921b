//! Scene adapter traits consumed by the session.

use std::fmt;
use std::hash::Hash;

use glam::{DQuat, DVec3};

use crate::transform::EulerAngles;

/// How a mapped node expresses its rest orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A true joint with a static orientation offset.
    Joint,
    /// A plain transform standing in for a joint. Its pose at mapping time is
    /// the zero-rotation reference.
    PlainTransform,
}

impl NodeKind {
    /// Frame applied after the animated rotation, read once at mapping time.
    pub fn orientation_reference<S: Scene + ?Sized>(self, scene: &S, node: S::Node) -> DQuat {
        match self {
            Self::Joint => scene.orientation_offset(node),
            Self::PlainTransform => scene.local_rotation(node),
        }
    }
}

/// Read/write access to the local scene's skeleton.
///
/// Rotations are local (parent-relative) and lengths are in scene units
/// (centimeters).
pub trait Scene {
    type Node: Copy + Eq + Hash + fmt::Debug;

    /// Every node a peer joint name may map to, in scene order.
    fn joint_like_nodes(&self) -> Vec<Self::Node>;

    fn node_name(&self, node: Self::Node) -> String;

    /// First joint-like node named `name`.
    fn find_by_name(&self, name: &str) -> Option<Self::Node> {
        self.joint_like_nodes()
            .into_iter()
            .find(|node| self.node_name(*node) == name)
    }

    fn node_kind(&self, node: Self::Node) -> NodeKind;

    fn local_rotation(&self, node: Self::Node) -> DQuat;

    fn set_local_rotation(&mut self, node: Self::Node, rotation: DQuat);

    fn local_translation(&self, node: Self::Node) -> DVec3;

    fn set_local_translation(&mut self, node: Self::Node, translation: DVec3);

    /// Modeling-time axis alignment applied before the animated rotation.
    fn rotate_axis(&self, node: Self::Node) -> EulerAngles;

    /// Static offset applied after the animated rotation. Only meaningful for
    /// [`NodeKind::Joint`] nodes.
    fn orientation_offset(&self, node: Self::Node) -> DQuat;
}

/// A scene that also hosts a control rig: one root node exposing a named slot
/// per peer joint, each slot driving one FK controller.
pub trait ControlRigScene: Scene {
    fn control_rig_roots(&self) -> Vec<Self::Node>;

    fn control_sets(&self) -> Vec<Self::Node>;

    fn controller_for_slot(&self, root: Self::Node, slot: &str) -> Option<Self::Node>;
}
