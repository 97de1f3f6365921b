use bevy_ecs::prelude::{Entity, World};
use glam::{DQuat, DVec3};
use retarget::{ControlRigScene, EulerAngles, NodeKind, Scene};

use crate::components::{ControlRig, JointOrient, LocalTransform, NodeName, NodeRole, RotateAxis};

/// A retargeting scene stored in a Bevy [`World`].
///
/// Every node is one entity. Spawn order is kept so enumeration is stable
/// and "first match" means first spawned.
pub struct BevyScene {
    world: World,
    nodes: Vec<Entity>,
}

impl Default for BevyScene {
    fn default() -> Self {
        Self::new()
    }
}

impl BevyScene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            world: World::new(),
            nodes: Vec::new(),
        }
    }

    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Entities in spawn order.
    #[must_use]
    pub fn nodes(&self) -> &[Entity] {
        &self.nodes
    }

    pub fn spawn_joint(&mut self, name: &str, orientation: DQuat) -> Entity {
        let entity = self
            .world
            .spawn((
                NodeName(name.to_string()),
                NodeRole::Joint,
                LocalTransform::default(),
                RotateAxis::default(),
                JointOrient(orientation),
            ))
            .id();
        self.nodes.push(entity);
        entity
    }

    pub fn spawn_transform(&mut self, name: &str, rotation: DQuat) -> Entity {
        self.spawn_posed(name, NodeRole::Transform, rotation)
    }

    pub fn spawn_controller(&mut self, name: &str, rotation: DQuat) -> Entity {
        self.spawn_posed(name, NodeRole::Controller, rotation)
    }

    pub fn spawn_control_rig<'a>(
        &mut self,
        name: &str,
        slots: impl IntoIterator<Item = (&'a str, Entity)>,
    ) -> Entity {
        let rig = ControlRig {
            slots: slots
                .into_iter()
                .map(|(slot, controller)| (slot.to_string(), controller))
                .collect(),
        };
        let entity = self
            .world
            .spawn((NodeName(name.to_string()), NodeRole::ControlRigRoot, rig))
            .id();
        self.nodes.push(entity);
        entity
    }

    pub fn spawn_control_set(&mut self, name: &str) -> Entity {
        let entity = self
            .world
            .spawn((NodeName(name.to_string()), NodeRole::ControlSet))
            .id();
        self.nodes.push(entity);
        entity
    }

    pub fn set_rotate_axis(&mut self, entity: Entity, rotate_axis: EulerAngles) {
        if let Some(mut axis) = self.world.get_mut::<RotateAxis>(entity) {
            axis.0 = rotate_axis;
        }
    }

    #[must_use]
    pub fn role(&self, entity: Entity) -> Option<NodeRole> {
        self.world.get::<NodeRole>(entity).copied()
    }

    fn spawn_posed(&mut self, name: &str, role: NodeRole, rotation: DQuat) -> Entity {
        let entity = self
            .world
            .spawn((
                NodeName(name.to_string()),
                role,
                LocalTransform::from_rotation(rotation),
                RotateAxis::default(),
            ))
            .id();
        self.nodes.push(entity);
        entity
    }

    fn nodes_with_role(&self, keep: impl Fn(NodeRole) -> bool) -> Vec<Entity> {
        self.nodes
            .iter()
            .copied()
            .filter(|entity| self.role(*entity).is_some_and(&keep))
            .collect()
    }

    fn transform(&self, entity: Entity) -> LocalTransform {
        self.world
            .get::<LocalTransform>(entity)
            .copied()
            .unwrap_or_default()
    }
}

impl Scene for BevyScene {
    type Node = Entity;

    fn joint_like_nodes(&self) -> Vec<Entity> {
        self.nodes_with_role(NodeRole::is_joint_like)
    }

    fn node_name(&self, node: Entity) -> String {
        self.world
            .get::<NodeName>(node)
            .map(|name| name.0.clone())
            .unwrap_or_default()
    }

    fn node_kind(&self, node: Entity) -> NodeKind {
        match self.role(node) {
            Some(NodeRole::Joint) => NodeKind::Joint,
            _ => NodeKind::PlainTransform,
        }
    }

    fn local_rotation(&self, node: Entity) -> DQuat {
        self.transform(node).rotation
    }

    fn set_local_rotation(&mut self, node: Entity, rotation: DQuat) {
        if let Some(mut transform) = self.world.get_mut::<LocalTransform>(node) {
            transform.rotation = rotation;
        }
    }

    fn local_translation(&self, node: Entity) -> DVec3 {
        self.transform(node).translation
    }

    fn set_local_translation(&mut self, node: Entity, translation: DVec3) {
        if let Some(mut transform) = self.world.get_mut::<LocalTransform>(node) {
            transform.translation = translation;
        }
    }

    fn rotate_axis(&self, node: Entity) -> EulerAngles {
        self.world
            .get::<RotateAxis>(node)
            .map_or(EulerAngles::ZERO, |axis| axis.0)
    }

    fn orientation_offset(&self, node: Entity) -> DQuat {
        self.world
            .get::<JointOrient>(node)
            .map_or(DQuat::IDENTITY, |orient| orient.0)
    }
}

impl ControlRigScene for BevyScene {
    fn control_rig_roots(&self) -> Vec<Entity> {
        self.nodes_with_role(|role| role == NodeRole::ControlRigRoot)
    }

    fn control_sets(&self) -> Vec<Entity> {
        self.nodes_with_role(|role| role == NodeRole::ControlSet)
    }

    fn controller_for_slot(&self, root: Entity, slot: &str) -> Option<Entity> {
        self.world
            .get::<ControlRig>(root)?
            .slots
            .get(slot)
            .copied()
    }
}
