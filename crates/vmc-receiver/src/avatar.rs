//! In-memory targets
//!
//! Plain data implementations of the target traits. They hold the last
//! written values and nothing else, which makes them useful as a headless
//! model for monitoring tools and as observable targets in tests.

use std::collections::HashMap;

use vmc_core::{Quat, Vec3};

use crate::bone::HumanBone;
use crate::target::{BlendShapeProxy, CameraTarget, PoseTarget, TransformTarget};

/// Unparented transform; world and local space coincide
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl TransformTarget for Transform {
    fn set_local_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_local_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    fn set_local_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }
}

/// Humanoid model with an optional transform per bone slot
#[derive(Debug, Clone)]
pub struct Avatar {
    /// The model's own transform
    pub root: Transform,
    bones: [Option<Transform>; HumanBone::COUNT],
}

impl Avatar {
    /// Rig with every humanoid slot mapped
    pub fn humanoid() -> Self {
        Avatar {
            root: Transform::default(),
            bones: [Some(Transform::default()); HumanBone::COUNT],
        }
    }

    /// Rig with only the given slots mapped
    pub fn with_bones(bones: impl IntoIterator<Item = HumanBone>) -> Self {
        let mut avatar = Avatar {
            root: Transform::default(),
            bones: [None; HumanBone::COUNT],
        };
        for bone in bones {
            avatar.bones[bone.index()] = Some(Transform::default());
        }
        avatar
    }

    /// Current transform of a bone, if mapped
    pub fn bone(&self, bone: HumanBone) -> Option<&Transform> {
        self.bones[bone.index()].as_ref()
    }

    /// Number of mapped slots
    pub fn bone_count(&self) -> usize {
        self.bones.iter().filter(|b| b.is_some()).count()
    }
}

impl Default for Avatar {
    fn default() -> Self {
        Avatar::humanoid()
    }
}

impl TransformTarget for Avatar {
    fn set_local_position(&mut self, position: Vec3) {
        self.root.set_local_position(position);
    }

    fn set_local_rotation(&mut self, rotation: Quat) {
        self.root.set_local_rotation(rotation);
    }

    fn set_local_scale(&mut self, scale: Vec3) {
        self.root.set_local_scale(scale);
    }

    fn position(&self) -> Vec3 {
        self.root.position()
    }

    fn set_position(&mut self, position: Vec3) {
        self.root.set_position(position);
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.root.set_rotation(rotation);
    }
}

impl PoseTarget for Avatar {
    fn has_bone(&self, bone: HumanBone) -> bool {
        self.bones[bone.index()].is_some()
    }

    fn set_bone_local_position(&mut self, bone: HumanBone, position: Vec3) {
        if let Some(t) = self.bones[bone.index()].as_mut() {
            t.position = position;
        }
    }

    fn set_bone_local_rotation(&mut self, bone: HumanBone, rotation: Quat) {
        if let Some(t) = self.bones[bone.index()].as_mut() {
            t.rotation = rotation;
        }
    }
}

/// Blendshape values staged by name and committed on apply
///
/// Staging is per name: a second value for the same name before `apply`
/// replaces the first. Names not staged keep their applied weight.
#[derive(Debug, Clone, Default)]
pub struct BlendShapeState {
    pending: HashMap<String, f32>,
    applied: HashMap<String, f32>,
    /// Number of commits so far
    pub apply_count: u64,
}

impl BlendShapeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible weight of a blendshape
    pub fn value(&self, name: &str) -> Option<f32> {
        self.applied.get(name).copied()
    }

    /// Staged, not yet visible weight
    pub fn pending(&self, name: &str) -> Option<f32> {
        self.pending.get(name).copied()
    }

    /// Visible blendshape with the highest weight
    pub fn dominant(&self) -> Option<(&str, f32)> {
        self.applied
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(name, value)| (name.as_str(), *value))
    }
}

impl BlendShapeProxy for BlendShapeState {
    fn accumulate_value(&mut self, name: &str, value: f32) {
        self.pending.insert(name.to_string(), value);
    }

    fn apply(&mut self) {
        for (name, value) in self.pending.drain() {
            self.applied.insert(name, value);
        }
        self.apply_count += 1;
    }
}

/// Camera with a transform and a vertical field of view in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub transform: Transform,
    pub field_of_view: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            transform: Transform::default(),
            field_of_view: 60.0,
        }
    }
}

impl TransformTarget for Camera {
    fn set_local_position(&mut self, position: Vec3) {
        self.transform.set_local_position(position);
    }

    fn set_local_rotation(&mut self, rotation: Quat) {
        self.transform.set_local_rotation(rotation);
    }

    fn set_local_scale(&mut self, scale: Vec3) {
        self.transform.set_local_scale(scale);
    }

    fn position(&self) -> Vec3 {
        self.transform.position()
    }

    fn set_position(&mut self, position: Vec3) {
        self.transform.set_position(position);
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.transform.set_rotation(rotation);
    }
}

impl CameraTarget for Camera {
    fn set_field_of_view(&mut self, fov: f32) {
        self.field_of_view = fov;
    }
}
