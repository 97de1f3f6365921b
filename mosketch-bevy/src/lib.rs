//! Bevy ECS scene adapter for the Mosketch retargeting link.
//!
//! Nodes are entities carrying [`NodeName`], [`NodeRole`] and
//! [`LocalTransform`]; [`BevyScene`] implements the `retarget` scene traits
//! over them so a [`retarget::Session`] can drive a Bevy world directly.

mod components;
mod desc;
mod scene;

pub use components::{ControlRig, JointOrient, LocalTransform, NodeName, NodeRole, RotateAxis};
pub use desc::{ControlRigDesc, NodeDesc, NodeDescKind, SceneDesc};
pub use scene::BevyScene;

/// Session driving a [`BevyScene`].
pub type BevySession = retarget::Session<bevy_ecs::prelude::Entity>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = BevyScene::new();
        let _ = SceneDesc::default();
        let _ = LocalTransform::default();
        let _: BevySession = BevySession::default();
    }
}
