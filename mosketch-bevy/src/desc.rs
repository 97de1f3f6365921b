//! JSON scene descriptions.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::{DQuat, DVec3};
use retarget::{ControlRigScene, EulerAngles, Scene};
use serde::{Deserialize, Serialize};

use crate::components::{ControlRig, NodeRole};
use crate::scene::BevyScene;

/// Serializable description of a skeleton and its optional control rig.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneDesc {
    #[serde(default)]
    pub nodes: Vec<NodeDesc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub control_rigs: Vec<ControlRigDesc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub control_sets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeDescKind {
    #[default]
    Joint,
    Transform,
    Controller,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDesc {
    pub name: String,
    #[serde(default)]
    pub kind: NodeDescKind,
    /// Local rotation as `[x, y, z, w]`.
    #[serde(default = "identity_rotation")]
    pub rotation: [f64; 4],
    /// Local translation in centimeters.
    #[serde(default)]
    pub translation: [f64; 3],
    /// Rotate-axis Euler angles in radians.
    #[serde(default)]
    pub rotate_axis: [f64; 3],
    /// Joint orientation offset; joints only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<[f64; 4]>,
}

/// Control rig root whose slots name the controllers they drive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlRigDesc {
    pub name: String,
    /// Slot (peer joint name) to controller node name.
    pub slots: BTreeMap<String, String>,
}

const fn identity_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl SceneDesc {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("parse scene description")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read scene {}", path.display()))?;
        Self::from_json(&bytes).with_context(|| format!("load scene {}", path.display()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize scene description")
    }
}

impl BevyScene {
    /// Spawns every node of `desc`, in order.
    pub fn from_desc(desc: &SceneDesc) -> Result<Self> {
        let mut scene = Self::new();
        let mut controllers = HashMap::new();
        for node in &desc.nodes {
            let rotation = DQuat::from_array(node.rotation);
            let entity = match node.kind {
                NodeDescKind::Joint => {
                    let orientation = node.orientation.map_or(DQuat::IDENTITY, DQuat::from_array);
                    let entity = scene.spawn_joint(&node.name, orientation);
                    scene.set_local_rotation(entity, rotation);
                    entity
                }
                NodeDescKind::Transform => scene.spawn_transform(&node.name, rotation),
                NodeDescKind::Controller => {
                    let entity = scene.spawn_controller(&node.name, rotation);
                    controllers.entry(node.name.clone()).or_insert(entity);
                    entity
                }
            };
            scene.set_local_translation(entity, DVec3::from_array(node.translation));
            scene.set_rotate_axis(entity, EulerAngles::from_array(node.rotate_axis));
        }

        for rig in &desc.control_rigs {
            let mut slots = Vec::with_capacity(rig.slots.len());
            for (slot, controller) in &rig.slots {
                let entity = controllers.get(controller).copied().ok_or_else(|| {
                    anyhow!(
                        "control rig {:?} slot {slot:?} names unknown controller {controller:?}",
                        rig.name
                    )
                })?;
                slots.push((slot.as_str(), entity));
            }
            scene.spawn_control_rig(&rig.name, slots);
        }
        for set in &desc.control_sets {
            scene.spawn_control_set(set);
        }
        log::debug!(
            "spawned scene with {} nodes and {} control rigs",
            scene.nodes().len(),
            desc.control_rigs.len()
        );
        Ok(scene)
    }

    /// Describes the current pose of every node.
    #[must_use]
    pub fn to_desc(&self) -> SceneDesc {
        let mut desc = SceneDesc::default();
        for &entity in self.nodes() {
            let name = self.node_name(entity);
            let kind = match self.role(entity) {
                Some(NodeRole::Joint) => NodeDescKind::Joint,
                Some(NodeRole::Transform) => NodeDescKind::Transform,
                Some(NodeRole::Controller) => NodeDescKind::Controller,
                Some(NodeRole::ControlRigRoot) => {
                    desc.control_rigs.push(self.describe_rig(entity, name));
                    continue;
                }
                Some(NodeRole::ControlSet) => {
                    desc.control_sets.push(name);
                    continue;
                }
                None => continue,
            };
            desc.nodes.push(NodeDesc {
                name,
                kind,
                rotation: self.local_rotation(entity).to_array(),
                translation: self.local_translation(entity).to_array(),
                rotate_axis: {
                    let axis = self.rotate_axis(entity);
                    [axis.x, axis.y, axis.z]
                },
                orientation: (kind == NodeDescKind::Joint)
                    .then(|| self.orientation_offset(entity).to_array()),
            });
        }
        desc
    }

    fn describe_rig(&self, root: bevy_ecs::prelude::Entity, name: String) -> ControlRigDesc {
        let slots = self
            .world()
            .get::<ControlRig>(root)
            .map(|rig| {
                rig.slots
                    .keys()
                    .filter_map(|slot| {
                        let controller = self.controller_for_slot(root, slot)?;
                        Some((slot.clone(), self.node_name(controller)))
                    })
                    .collect()
            })
            .unwrap_or_default();
        ControlRigDesc { name, slots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_node_uses_defaults() {
        let desc = SceneDesc::from_json(br#"{"nodes": [{"name": "hips"}]}"#).unwrap();
        let node = &desc.nodes[0];
        assert_eq!(node.kind, NodeDescKind::Joint);
        assert_eq!(node.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(node.translation, [0.0; 3]);
        assert_eq!(node.orientation, None);
    }

    #[test]
    fn unknown_controller_is_an_error() {
        let desc = SceneDesc::from_json(
            br#"{"nodes": [], "control_rigs": [{"name": "rig", "slots": {"hips": "missing"}}]}"#,
        )
        .unwrap();
        let err = BevyScene::from_desc(&desc).err().unwrap();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn desc_round_trips_through_scene() {
        let desc = SceneDesc {
            nodes: vec![
                NodeDesc {
                    name: "hips".to_string(),
                    kind: NodeDescKind::Joint,
                    rotation: identity_rotation(),
                    translation: [0.0, 95.0, 0.0],
                    rotate_axis: [0.0, 0.5, 0.0],
                    orientation: Some(identity_rotation()),
                },
                NodeDesc {
                    name: "hips_fk".to_string(),
                    kind: NodeDescKind::Controller,
                    rotation: identity_rotation(),
                    translation: [0.0; 3],
                    rotate_axis: [0.0; 3],
                    orientation: None,
                },
            ],
            control_rigs: vec![ControlRigDesc {
                name: "rig".to_string(),
                slots: BTreeMap::from([("hips".to_string(), "hips_fk".to_string())]),
            }],
            control_sets: vec!["set".to_string()],
        };
        let scene = BevyScene::from_desc(&desc).unwrap();
        assert_eq!(scene.to_desc(), desc);
    }
}
