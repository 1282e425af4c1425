//! Capabilities the receiver drives
//!
//! The receiver never owns a scene graph. It writes through these traits:
//! - `TransformTarget`: anything with a position, rotation and scale
//! - `PoseTarget`: a humanoid model, its own transform is the default root
//! - `BlendShapeProxy`: facial expression accumulator
//! - `CameraTarget`: a transform with a field of view
//!
//! Shared handles (`Rc<RefCell<T>>`) implement every trait, so an embedder
//! can keep a handle to a target it gave to a receiver.

use std::cell::RefCell;
use std::rc::Rc;

use vmc_core::{Quat, Vec3};

use crate::bone::HumanBone;

/// A transform in the embedder's scene
pub trait TransformTarget {
    fn set_local_position(&mut self, position: Vec3);
    fn set_local_rotation(&mut self, rotation: Quat);
    fn set_local_scale(&mut self, scale: Vec3);

    /// World-space position
    fn position(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
    /// World-space rotation
    fn set_rotation(&mut self, rotation: Quat);
}

/// A humanoid model
pub trait PoseTarget: TransformTarget {
    /// Whether the rig maps this slot to a transform
    fn has_bone(&self, bone: HumanBone) -> bool;
    fn set_bone_local_position(&mut self, bone: HumanBone, position: Vec3);
    fn set_bone_local_rotation(&mut self, bone: HumanBone, rotation: Quat);
}

/// Facial expression proxy
pub trait BlendShapeProxy {
    /// Stage a value for `name`, replacing any value staged for it since
    /// the last `apply`; nothing is visible until `apply`
    fn accumulate_value(&mut self, name: &str, value: f32);
    /// Commit staged values
    fn apply(&mut self);
}

/// A camera driven by the sender
pub trait CameraTarget: TransformTarget {
    fn set_field_of_view(&mut self, fov: f32);
}

impl<T: TransformTarget + ?Sized> TransformTarget for Rc<RefCell<T>> {
    fn set_local_position(&mut self, position: Vec3) {
        self.borrow_mut().set_local_position(position)
    }

    fn set_local_rotation(&mut self, rotation: Quat) {
        self.borrow_mut().set_local_rotation(rotation)
    }

    fn set_local_scale(&mut self, scale: Vec3) {
        self.borrow_mut().set_local_scale(scale)
    }

    fn position(&self) -> Vec3 {
        self.borrow().position()
    }

    fn set_position(&mut self, position: Vec3) {
        self.borrow_mut().set_position(position)
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.borrow_mut().set_rotation(rotation)
    }
}

impl<T: PoseTarget + ?Sized> PoseTarget for Rc<RefCell<T>> {
    fn has_bone(&self, bone: HumanBone) -> bool {
        self.borrow().has_bone(bone)
    }

    fn set_bone_local_position(&mut self, bone: HumanBone, position: Vec3) {
        self.borrow_mut().set_bone_local_position(bone, position)
    }

    fn set_bone_local_rotation(&mut self, bone: HumanBone, rotation: Quat) {
        self.borrow_mut().set_bone_local_rotation(bone, rotation)
    }
}

impl<T: BlendShapeProxy + ?Sized> BlendShapeProxy for Rc<RefCell<T>> {
    fn accumulate_value(&mut self, name: &str, value: f32) {
        self.borrow_mut().accumulate_value(name, value)
    }

    fn apply(&mut self) {
        self.borrow_mut().apply()
    }
}

impl<T: CameraTarget + ?Sized> CameraTarget for Rc<RefCell<T>> {
    fn set_field_of_view(&mut self, fov: f32) {
        self.borrow_mut().set_field_of_view(fov)
    }
}

/// Synchronous listener list, invoked in registration order
pub struct EventListeners<T> {
    listeners: Vec<Box<dyn FnMut(&T)>>,
}

impl<T> Default for EventListeners<T> {
    fn default() -> Self {
        EventListeners {
            listeners: Vec::new(),
        }
    }
}

impl<T> EventListeners<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&T) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn invoke(&mut self, event: &T) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    /// Move every listener of `other` to the end of this list
    pub fn append(&mut self, other: &mut Self) {
        self.listeners.append(&mut other.listeners);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl<T> std::fmt::Debug for EventListeners<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}
