//! Low-pass filters for positions and rotations
//!
//! Each filter keeps an accumulator. A filtered update moves the accumulator
//! a fraction `1 - k` toward the new value and returns it; positions use a
//! linear blend, rotations a spherical one. Accumulators change only through
//! filtered updates, so turning a filter off and on again resumes from the
//! last filtered value.

use vmc_core::{Quat, Vec3};

use crate::bone::HumanBone;

/// Default bone filter coefficient
pub const DEFAULT_BONE_FILTER: f32 = 0.7;

/// Default camera filter coefficient
pub const DEFAULT_CAMERA_FILTER: f32 = 0.95;

/// Position and rotation accumulators for one transform
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformFilter {
    pub position: Vec3,
    pub rotation: Quat,
}

impl TransformFilter {
    /// `accum = accum * k + new * (1 - k)`
    pub fn filter_position(&mut self, new: Vec3, k: f32) -> Vec3 {
        self.position = self.position * k + new * (1.0 - k);
        self.position
    }

    /// `accum = slerp(accum, new, 1 - k)`
    pub fn filter_rotation(&mut self, new: Quat, k: f32) -> Quat {
        self.rotation = self.rotation.slerp(&new, 1.0 - k);
        self.rotation
    }

    /// Filtered position when `enabled`, raw otherwise.
    /// The accumulator is left untouched when disabled.
    #[inline]
    pub fn position_or_raw(&mut self, new: Vec3, k: f32, enabled: bool) -> Vec3 {
        if enabled {
            self.filter_position(new, k)
        } else {
            new
        }
    }

    /// Filtered rotation when `enabled`, raw otherwise.
    /// The accumulator is left untouched when disabled.
    #[inline]
    pub fn rotation_or_raw(&mut self, new: Quat, k: f32, enabled: bool) -> Quat {
        if enabled {
            self.filter_rotation(new, k)
        } else {
            new
        }
    }
}

/// Filter history for every bone plus the camera
#[derive(Debug, Clone)]
pub struct FilterState {
    bones: [TransformFilter; HumanBone::COUNT],
    pub camera: TransformFilter,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            bones: [TransformFilter::default(); HumanBone::COUNT],
            camera: TransformFilter::default(),
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        FilterState::default()
    }

    pub fn bone(&self, bone: HumanBone) -> &TransformFilter {
        &self.bones[bone.index()]
    }

    pub fn bone_mut(&mut self, bone: HumanBone) -> &mut TransformFilter {
        &mut self.bones[bone.index()]
    }

    /// Back to zero position and identity rotation everywhere
    pub fn reset(&mut self) {
        *self = FilterState::default();
    }
}
