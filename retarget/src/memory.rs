//! In-memory scene for tests, benches and headless drivers.

use std::collections::HashMap;

use glam::{DQuat, DVec3};

use crate::scene::{ControlRigScene, NodeKind, Scene};
use crate::transform::EulerAngles;

/// Handle to a node of a [`MemoryScene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
enum Role {
    Skeleton(NodeKind),
    Controller,
    ControlRig { slots: HashMap<String, NodeId> },
    ControlSet,
}

#[derive(Debug, Clone, PartialEq)]
struct MemoryNode {
    name: String,
    role: Role,
    rotation: DQuat,
    translation: DVec3,
    rotate_axis: EulerAngles,
    orientation: DQuat,
}

/// Flat list of named nodes with local transforms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryScene {
    nodes: Vec<MemoryNode>,
}

impl MemoryScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a joint with the given orientation offset and an identity pose.
    pub fn add_joint(&mut self, name: &str, orientation: DQuat) -> NodeId {
        self.push(name, Role::Skeleton(NodeKind::Joint), DQuat::IDENTITY, orientation)
    }

    /// Adds a plain transform standing in for a joint.
    pub fn add_transform(&mut self, name: &str, rotation: DQuat) -> NodeId {
        self.push(
            name,
            Role::Skeleton(NodeKind::PlainTransform),
            rotation,
            DQuat::IDENTITY,
        )
    }

    /// Adds an FK controller. Controllers are not joint-like.
    pub fn add_controller(&mut self, name: &str, rotation: DQuat) -> NodeId {
        self.push(name, Role::Controller, rotation, DQuat::IDENTITY)
    }

    /// Adds a control rig root whose slots drive the given controllers.
    pub fn add_control_rig<'a>(
        &mut self,
        slots: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> NodeId {
        let slots = slots
            .into_iter()
            .map(|(slot, controller)| (slot.to_string(), controller))
            .collect();
        self.push(
            "ControlRig",
            Role::ControlRig { slots },
            DQuat::IDENTITY,
            DQuat::IDENTITY,
        )
    }

    pub fn add_control_set(&mut self) -> NodeId {
        self.push("ControlSet", Role::ControlSet, DQuat::IDENTITY, DQuat::IDENTITY)
    }

    pub fn set_rotate_axis(&mut self, node: NodeId, rotate_axis: EulerAngles) {
        if let Some(entry) = self.nodes.get_mut(node.0) {
            entry.rotate_axis = rotate_axis;
        }
    }

    fn push(&mut self, name: &str, role: Role, rotation: DQuat, orientation: DQuat) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MemoryNode {
            name: name.to_string(),
            role,
            rotation,
            translation: DVec3::ZERO,
            rotate_axis: EulerAngles::ZERO,
            orientation,
        });
        id
    }

    fn nodes_where(&self, keep: impl Fn(&Role) -> bool) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| keep(&node.role))
            .map(|(index, _)| NodeId(index))
            .collect()
    }
}

impl Scene for MemoryScene {
    type Node = NodeId;

    fn joint_like_nodes(&self) -> Vec<NodeId> {
        self.nodes_where(|role| matches!(role, Role::Skeleton(_)))
    }

    fn node_name(&self, node: NodeId) -> String {
        self.nodes
            .get(node.0)
            .map(|entry| entry.name.clone())
            .unwrap_or_default()
    }

    fn node_kind(&self, node: NodeId) -> NodeKind {
        match self.nodes.get(node.0).map(|entry| &entry.role) {
            Some(Role::Skeleton(kind)) => *kind,
            _ => NodeKind::PlainTransform,
        }
    }

    fn local_rotation(&self, node: NodeId) -> DQuat {
        self.nodes
            .get(node.0)
            .map_or(DQuat::IDENTITY, |entry| entry.rotation)
    }

    fn set_local_rotation(&mut self, node: NodeId, rotation: DQuat) {
        if let Some(entry) = self.nodes.get_mut(node.0) {
            entry.rotation = rotation;
        }
    }

    fn local_translation(&self, node: NodeId) -> DVec3 {
        self.nodes
            .get(node.0)
            .map_or(DVec3::ZERO, |entry| entry.translation)
    }

    fn set_local_translation(&mut self, node: NodeId, translation: DVec3) {
        if let Some(entry) = self.nodes.get_mut(node.0) {
            entry.translation = translation;
        }
    }

    fn rotate_axis(&self, node: NodeId) -> EulerAngles {
        self.nodes
            .get(node.0)
            .map_or(EulerAngles::ZERO, |entry| entry.rotate_axis)
    }

    fn orientation_offset(&self, node: NodeId) -> DQuat {
        self.nodes
            .get(node.0)
            .map_or(DQuat::IDENTITY, |entry| entry.orientation)
    }
}

impl ControlRigScene for MemoryScene {
    fn control_rig_roots(&self) -> Vec<NodeId> {
        self.nodes_where(|role| matches!(role, Role::ControlRig { .. }))
    }

    fn control_sets(&self) -> Vec<NodeId> {
        self.nodes_where(|role| matches!(role, Role::ControlSet))
    }

    fn controller_for_slot(&self, root: NodeId, slot: &str) -> Option<NodeId> {
        match &self.nodes.get(root.0)?.role {
            Role::ControlRig { slots } => slots.get(slot).copied(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controllers_are_not_joint_like() {
        let mut scene = MemoryScene::new();
        let hips = scene.add_joint("hips", DQuat::IDENTITY);
        let prop = scene.add_transform("prop", DQuat::IDENTITY);
        scene.add_controller("hips_fk", DQuat::IDENTITY);
        assert_eq!(scene.joint_like_nodes(), vec![hips, prop]);
    }

    #[test]
    fn find_by_name_returns_first() {
        let mut scene = MemoryScene::new();
        let first = scene.add_joint("arm", DQuat::IDENTITY);
        scene.add_joint("arm", DQuat::IDENTITY);
        assert_eq!(scene.find_by_name("arm"), Some(first));
        assert_eq!(scene.find_by_name("leg"), None);
    }

    #[test]
    fn writes_round_trip() {
        let mut scene = MemoryScene::new();
        let node = scene.add_joint("hips", DQuat::IDENTITY);
        let rotation = DQuat::from_rotation_y(0.5);
        scene.set_local_rotation(node, rotation);
        scene.set_local_translation(node, DVec3::new(0.0, 90.0, 0.0));
        assert_eq!(scene.local_rotation(node), rotation);
        assert_eq!(scene.local_translation(node), DVec3::new(0.0, 90.0, 0.0));
    }

    #[test]
    fn unknown_handle_reads_defaults() {
        let scene = MemoryScene::new();
        assert_eq!(scene.local_rotation(NodeId(3)), DQuat::IDENTITY);
        assert_eq!(scene.node_name(NodeId(3)), "");
    }

    #[test]
    fn slots_resolve_only_on_rig_roots() {
        let mut scene = MemoryScene::new();
        let ctrl = scene.add_controller("hips_fk", DQuat::IDENTITY);
        let rig = scene.add_control_rig([("hips", ctrl)]);
        assert_eq!(scene.controller_for_slot(rig, "hips"), Some(ctrl));
        assert_eq!(scene.controller_for_slot(ctrl, "hips"), None);
        assert_eq!(scene.control_rig_roots(), vec![rig]);
    }
}
