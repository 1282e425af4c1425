//! Receiver configuration
//!
//! Every field has a default, so a config file only needs the options it
//! changes.

use serde::{Deserialize, Serialize};

use vmc_core::{VmcError, VmcResult};

use crate::filter::{DEFAULT_BONE_FILTER, DEFAULT_CAMERA_FILTER};

/// Receiver configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    // Root synchronize
    /// Apply root position (room-scale movement)
    pub root_position_synchronize: bool,
    pub root_rotation_synchronize: bool,
    /// Apply the mixed-reality scale/offset extension
    pub root_scale_offset_synchronize: bool,

    // Other synchronize
    pub blend_shape_synchronize: bool,
    /// Apply bone positions; rotations are always applied
    pub bone_position_synchronize: bool,

    // Cutoffs
    /// Ignore finger bones
    pub hand_pose_synchronize_cutoff: bool,
    /// Ignore eye bones
    pub eye_bone_synchronize_cutoff: bool,

    /// Treat any unrecognized message as fatal
    pub strict_mode: bool,

    // Low-pass filters
    pub bone_position_filter_enable: bool,
    pub bone_rotation_filter_enable: bool,
    /// Bone filter coefficient, in (0, 1)
    pub bone_filter: f32,

    pub camera_position_filter_enable: bool,
    pub camera_rotation_filter_enable: bool,
    /// Camera filter coefficient, in (0, 1)
    pub camera_filter: f32,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            root_position_synchronize: true,
            root_rotation_synchronize: true,
            root_scale_offset_synchronize: false,
            blend_shape_synchronize: true,
            bone_position_synchronize: true,
            hand_pose_synchronize_cutoff: false,
            eye_bone_synchronize_cutoff: false,
            strict_mode: false,
            bone_position_filter_enable: false,
            bone_rotation_filter_enable: false,
            bone_filter: DEFAULT_BONE_FILTER,
            camera_position_filter_enable: false,
            camera_rotation_filter_enable: false,
            camera_filter: DEFAULT_CAMERA_FILTER,
        }
    }
}

impl ReceiverConfig {
    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> VmcResult<Self> {
        let config: ReceiverConfig =
            serde_json::from_str(json).map_err(|e| VmcError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> VmcResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| VmcError::InvalidConfig(e.to_string()))
    }

    /// Filter coefficients must lie strictly between 0 and 1
    pub fn validate(&self) -> VmcResult<()> {
        for (name, k) in [
            ("bone_filter", self.bone_filter),
            ("camera_filter", self.camera_filter),
        ] {
            if !(k > 0.0 && k < 1.0) {
                return Err(VmcError::InvalidConfig(format!(
                    "{} must be in (0, 1), got {}",
                    name, k
                )));
            }
        }
        Ok(())
    }
}
