//! Joint name to scene node mapping, rebuilt on every hierarchy handshake.

use std::collections::HashMap;
use std::fmt;

use glam::{DQuat, DVec3};

use crate::scene::{ControlRigScene, NodeKind, Scene};
use crate::transform::{to_peer_space, to_scene_space, Correction};

/// A peer joint resolved to one scene node and its correction frames.
#[derive(Debug, Clone, PartialEq)]
pub struct JointBinding<N> {
    name: String,
    node: N,
    kind: NodeKind,
    correction: Correction,
}

impl<N: Copy> JointBinding<N> {
    #[must_use]
    pub const fn new(name: String, node: N, kind: NodeKind, correction: Correction) -> Self {
        Self {
            name,
            node,
            kind,
            correction,
        }
    }

    /// Reads the node's correction frames from the scene.
    pub fn resolve<S: Scene<Node = N> + ?Sized>(scene: &S, name: &str, node: N) -> Self {
        let kind = scene.node_kind(node);
        let correction = Correction::from_frames(
            scene.rotate_axis(node).to_quat(),
            kind.orientation_reference(scene, node),
        );
        Self::new(name.to_string(), node, kind, correction)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn node(&self) -> N {
        self.node
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub const fn correction(&self) -> &Correction {
        &self.correction
    }

    #[must_use]
    pub fn to_peer_space(&self, rotation: DQuat, translation: DVec3) -> (DQuat, DVec3) {
        to_peer_space(rotation, translation, &self.correction)
    }

    #[must_use]
    pub fn to_scene_space(
        &self,
        rotation: DQuat,
        translation: DVec3,
        carries_translation: bool,
    ) -> (DQuat, Option<DVec3>) {
        to_scene_space(rotation, translation, carries_translation, &self.correction)
    }
}

/// Bindings keyed by peer joint name, iterated in hierarchy order.
#[derive(Debug, Clone)]
pub struct MappingTable<N> {
    bindings: Vec<JointBinding<N>>,
    index: HashMap<String, usize>,
}

impl<N> Default for MappingTable<N> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<N> MappingTable<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Binding for `name`, or `None` if the joint is not mapped.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JointBinding<N>> {
        let index = self.index.get(name).copied()?;
        self.bindings.get(index)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JointBinding<N>> {
        self.bindings.iter()
    }

    /// Adds a binding unless the name is already mapped.
    fn insert(&mut self, binding: JointBinding<N>) -> bool {
        if self.index.contains_key(&binding.name) {
            return false;
        }
        self.index.insert(binding.name.clone(), self.bindings.len());
        self.bindings.push(binding);
        true
    }
}

/// Non-fatal problems found while mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingWarning {
    /// Several scene nodes share a peer joint name; the first one was used.
    DuplicateName { name: String, matches: usize },
    /// The scene does not hold exactly one control rig.
    ControlRigCount { found: usize },
    /// The scene does not hold exactly one control set.
    ControlSetCount { found: usize },
}

impl fmt::Display for MappingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { name, matches } => {
                write!(f, "{matches} scene nodes are named {name:?}, using the first one")
            }
            Self::ControlRigCount { found } => {
                write!(f, "expected exactly one control rig, found {found}")
            }
            Self::ControlSetCount { found } => {
                write!(f, "expected exactly one control set, found {found}")
            }
        }
    }
}

/// Result of one mapping pass.
#[derive(Debug, Clone)]
pub struct MappingOutcome<N> {
    pub table: MappingTable<N>,
    /// Scene-side nodes the hierarchy was matched against.
    pub candidates: usize,
    pub warnings: Vec<MappingWarning>,
}

/// Maps peer joint names straight to joint-like scene nodes.
pub fn map_joints<S: Scene + ?Sized>(names: &[String], scene: &S) -> MappingOutcome<S::Node> {
    let nodes = scene.joint_like_nodes();
    let mut by_name: HashMap<String, Vec<S::Node>> = HashMap::new();
    for node in &nodes {
        by_name.entry(scene.node_name(*node)).or_default().push(*node);
    }

    let mut table = MappingTable::new();
    let mut warnings = Vec::new();
    for name in names {
        let Some(matches) = by_name.get(name.as_str()) else {
            continue;
        };
        if matches.len() > 1 {
            warnings.push(MappingWarning::DuplicateName {
                name: name.clone(),
                matches: matches.len(),
            });
        }
        table.insert(JointBinding::resolve(scene, name, matches[0]));
    }

    MappingOutcome {
        table,
        candidates: nodes.len(),
        warnings,
    }
}

/// Maps peer joint names to the FK controllers behind the control rig slots.
pub fn map_controllers<S: ControlRigScene + ?Sized>(
    names: &[String],
    scene: &S,
) -> MappingOutcome<S::Node> {
    let mut warnings = Vec::new();
    let roots = scene.control_rig_roots();
    if roots.len() != 1 {
        warnings.push(MappingWarning::ControlRigCount { found: roots.len() });
    }
    let sets = scene.control_sets();
    if sets.len() != 1 {
        warnings.push(MappingWarning::ControlSetCount { found: sets.len() });
    }

    let mut table = MappingTable::new();
    if let Some(&root) = roots.first() {
        for name in names {
            if let Some(controller) = scene.controller_for_slot(root, name) {
                table.insert(JointBinding::resolve(scene, name, controller));
            }
        }
    }

    MappingOutcome {
        table,
        candidates: names.len(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryScene;
    use crate::transform::EulerAngles;

    const TOLERANCE: f64 = 1e-9;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn maps_subset_of_scene_joints() {
        let mut scene = MemoryScene::new();
        scene.add_joint("hips", DQuat::IDENTITY);
        scene.add_joint("spine", DQuat::IDENTITY);
        scene.add_joint("head", DQuat::IDENTITY);

        let outcome = map_joints(&names(&["hips", "spine", "tail"]), &scene);
        assert_eq!(outcome.table.len(), 2);
        assert!(outcome.table.contains("hips"));
        assert!(outcome.table.contains("spine"));
        assert!(outcome.table.get("tail").is_none());
        assert_eq!(outcome.candidates, 3);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn iteration_follows_hierarchy_order() {
        let mut scene = MemoryScene::new();
        scene.add_joint("spine", DQuat::IDENTITY);
        scene.add_joint("hips", DQuat::IDENTITY);

        let outcome = map_joints(&names(&["hips", "spine"]), &scene);
        let order: Vec<&str> = outcome.table.iter().map(JointBinding::name).collect();
        assert_eq!(order, vec!["hips", "spine"]);
    }

    #[test]
    fn duplicate_scene_names_take_first_with_warning() {
        let mut scene = MemoryScene::new();
        let first = scene.add_joint("arm", DQuat::IDENTITY);
        scene.add_joint("arm", DQuat::IDENTITY);

        let outcome = map_joints(&names(&["arm"]), &scene);
        assert_eq!(outcome.table.get("arm").unwrap().node(), first);
        assert_eq!(
            outcome.warnings,
            vec![MappingWarning::DuplicateName {
                name: "arm".to_string(),
                matches: 2,
            }]
        );
    }

    #[test]
    fn repeated_hierarchy_name_binds_once() {
        let mut scene = MemoryScene::new();
        scene.add_joint("hips", DQuat::IDENTITY);
        let outcome = map_joints(&names(&["hips", "hips"]), &scene);
        assert_eq!(outcome.table.len(), 1);
    }

    #[test]
    fn joint_uses_orientation_offset() {
        let mut scene = MemoryScene::new();
        let orient = DQuat::from_rotation_x(0.5);
        let node = scene.add_joint("knee", orient);
        scene.set_rotate_axis(node, EulerAngles::new(0.0, 0.25, 0.0));

        let outcome = map_joints(&names(&["knee"]), &scene);
        let binding = outcome.table.get("knee").unwrap();
        assert_eq!(binding.kind(), NodeKind::Joint);
        let correction = binding.correction();
        assert!(correction
            .orientation_inverse
            .abs_diff_eq(orient.inverse(), TOLERANCE));
        assert!(correction
            .rotate_axis_inverse
            .abs_diff_eq(DQuat::from_rotation_y(0.25).inverse(), TOLERANCE));
    }

    #[test]
    fn plain_transform_uses_current_rotation() {
        let mut scene = MemoryScene::new();
        let pose = DQuat::from_rotation_z(0.3);
        scene.add_transform("prop", pose);

        let outcome = map_joints(&names(&["prop"]), &scene);
        let binding = outcome.table.get("prop").unwrap();
        assert_eq!(binding.kind(), NodeKind::PlainTransform);
        assert!(binding
            .correction()
            .orientation_inverse
            .abs_diff_eq(pose.inverse(), TOLERANCE));
    }

    #[test]
    fn controllers_resolve_through_rig_slots() {
        let mut scene = MemoryScene::new();
        scene.add_joint("hips", DQuat::IDENTITY);
        let hips_ctrl = scene.add_controller("hips_fk", DQuat::IDENTITY);
        let spine_ctrl = scene.add_controller("spine_fk", DQuat::IDENTITY);
        scene.add_control_rig([("hips", hips_ctrl), ("spine", spine_ctrl)]);
        scene.add_control_set();

        let outcome = map_controllers(&names(&["hips", "spine", "neck"]), &scene);
        assert_eq!(outcome.table.len(), 2);
        assert_eq!(outcome.table.get("hips").unwrap().node(), hips_ctrl);
        assert_eq!(outcome.table.get("spine").unwrap().node(), spine_ctrl);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn controllers_warn_on_unexpected_rig_counts() {
        let mut scene = MemoryScene::new();
        let first_ctrl = scene.add_controller("hips_a", DQuat::IDENTITY);
        let second_ctrl = scene.add_controller("hips_b", DQuat::IDENTITY);
        scene.add_control_rig([("hips", first_ctrl)]);
        scene.add_control_rig([("hips", second_ctrl)]);

        let outcome = map_controllers(&names(&["hips"]), &scene);
        assert_eq!(outcome.table.get("hips").unwrap().node(), first_ctrl);
        assert_eq!(
            outcome.warnings,
            vec![
                MappingWarning::ControlRigCount { found: 2 },
                MappingWarning::ControlSetCount { found: 0 },
            ]
        );
    }

    #[test]
    fn controllers_without_rig_map_nothing() {
        let mut scene = MemoryScene::new();
        scene.add_joint("hips", DQuat::IDENTITY);
        let outcome = map_controllers(&names(&["hips"]), &scene);
        assert!(outcome.table.is_empty());
    }

    #[test]
    fn warning_display() {
        let warning = MappingWarning::DuplicateName {
            name: "arm".to_string(),
            matches: 3,
        };
        assert!(warning.to_string().contains("3 scene nodes"));
    }
}
