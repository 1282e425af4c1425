//! Humanoid bone slots and bone-name resolution
//!
//! VMC senders name bones with the humanoid slot names (`Hips`,
//! `LeftIndexProximal`, ...). Resolution is case-insensitive and memoized,
//! misses included, so each distinct name is parsed at most once.

use std::collections::HashMap;
use std::str::FromStr;

use strum::{EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Humanoid bone slot
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, EnumCount, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum HumanBone {
    // Body
    Hips,
    LeftUpperLeg,
    RightUpperLeg,
    LeftLowerLeg,
    RightLowerLeg,
    LeftFoot,
    RightFoot,
    Spine,
    Chest,
    Neck,
    Head,
    LeftShoulder,
    RightShoulder,
    LeftUpperArm,
    RightUpperArm,
    LeftLowerArm,
    RightLowerArm,
    LeftHand,
    RightHand,
    LeftToes,
    RightToes,

    // Face
    LeftEye,
    RightEye,
    Jaw,

    // Left fingers
    LeftThumbProximal,
    LeftThumbIntermediate,
    LeftThumbDistal,
    LeftIndexProximal,
    LeftIndexIntermediate,
    LeftIndexDistal,
    LeftMiddleProximal,
    LeftMiddleIntermediate,
    LeftMiddleDistal,
    LeftRingProximal,
    LeftRingIntermediate,
    LeftRingDistal,
    LeftLittleProximal,
    LeftLittleIntermediate,
    LeftLittleDistal,

    // Right fingers
    RightThumbProximal,
    RightThumbIntermediate,
    RightThumbDistal,
    RightIndexProximal,
    RightIndexIntermediate,
    RightIndexDistal,
    RightMiddleProximal,
    RightMiddleIntermediate,
    RightMiddleDistal,
    RightRingProximal,
    RightRingIntermediate,
    RightRingDistal,
    RightLittleProximal,
    RightLittleIntermediate,
    RightLittleDistal,

    UpperChest,
}

/// How a bone is treated when applying poses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneGroup {
    /// Body bones, filtered per configuration
    Body,
    /// Finger segments, subject to the hand cutoff, never filtered
    Finger,
    /// Eyes, subject to the eye cutoff, never filtered
    Eye,
}

impl HumanBone {
    /// Number of bone slots
    pub const COUNT: usize = <HumanBone as EnumCount>::COUNT;

    /// All bones in slot order
    pub fn all() -> impl Iterator<Item = HumanBone> {
        HumanBone::iter()
    }

    /// Slot index, stable for the lifetime of the enum
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical slot name
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn group(self) -> BoneGroup {
        let first = HumanBone::LeftThumbProximal as usize;
        let last = HumanBone::RightLittleDistal as usize;
        match self {
            HumanBone::LeftEye | HumanBone::RightEye => BoneGroup::Eye,
            b if (first..=last).contains(&b.index()) => BoneGroup::Finger,
            _ => BoneGroup::Body,
        }
    }

    #[inline]
    pub fn is_finger(self) -> bool {
        self.group() == BoneGroup::Finger
    }

    #[inline]
    pub fn is_eye(self) -> bool {
        self.group() == BoneGroup::Eye
    }
}

/// Memoized bone-name lookup
#[derive(Debug, Default)]
pub struct BoneNameCache {
    /// `None` marks a name known not to resolve
    table: HashMap<String, Option<HumanBone>>,
    /// Number of uncached lookups performed
    lookups: u64,
}

impl BoneNameCache {
    pub fn new() -> Self {
        BoneNameCache::default()
    }

    /// Resolve a bone name, caching the outcome
    pub fn resolve(&mut self, name: &str) -> Option<HumanBone> {
        if let Some(cached) = self.table.get(name) {
            return *cached;
        }

        self.lookups += 1;
        let bone = HumanBone::from_str(name).ok();
        self.table.insert(name.to_string(), bone);
        bone
    }

    /// Number of uncached lookups performed so far
    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    /// Number of cached names (resolved and unresolved)
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.table.clear();
        self.lookups = 0;
    }
}
