//! Decoded VMC commands and the address table
//!
//! Each known address has a fixed minimum argument list. The table is the
//! single source of truth for what a well-formed message looks like; the
//! decoder checks a message against it before building a `Command`.

use vmc_core::{Pose, Value, Vec3};

/// Availability flag: `/VMC/Ext/OK`
pub const ADDR_AVAILABLE: &str = "/VMC/Ext/OK";
/// Sender time: `/VMC/Ext/T`
pub const ADDR_TIME: &str = "/VMC/Ext/T";
pub const ADDR_ROOT_POS: &str = "/VMC/Ext/Root/Pos";
pub const ADDR_BONE_POS: &str = "/VMC/Ext/Bone/Pos";
pub const ADDR_BLEND_VAL: &str = "/VMC/Ext/Blend/Val";
pub const ADDR_BLEND_APPLY: &str = "/VMC/Ext/Blend/Apply";
pub const ADDR_CAMERA: &str = "/VMC/Ext/Cam";
pub const ADDR_CONTROLLER: &str = "/VMC/Ext/Con";
pub const ADDR_KEY: &str = "/VMC/Ext/Key";
pub const ADDR_MIDI_NOTE: &str = "/VMC/Ext/Midi/Note";
pub const ADDR_MIDI_CC_VAL: &str = "/VMC/Ext/Midi/CC/Val";
pub const ADDR_MIDI_CC_BIT: &str = "/VMC/Ext/Midi/CC/Bit";
pub const ADDR_HMD_POS: &str = "/VMC/Ext/Hmd/Pos";
pub const ADDR_CON_POS: &str = "/VMC/Ext/Con/Pos";
pub const ADDR_TRA_POS: &str = "/VMC/Ext/Tra/Pos";

/// Argument count of a root pose without the scale/offset extension
pub const ROOT_BASE_ARGS: usize = 8;

/// Argument count of a root pose with the scale/offset extension
pub const ROOT_EXTENDED_ARGS: usize = 14;

/// Runtime type tag expected at an argument position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Int,
    Float,
    String,
}

impl ArgType {
    /// Exact tag match; no numeric widening
    #[inline]
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ArgType::Int, Value::Int(_))
                | (ArgType::Float, Value::Float(_))
                | (ArgType::String, Value::String(_))
        )
    }
}

/// Which command an address decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Available,
    Time,
    RootPose,
    BonePose,
    BlendShapeValue,
    BlendShapeApply,
    Camera,
    ControllerInput,
    KeyInput,
    MidiNote,
    MidiCcValue,
    MidiCcBit,
    TrackingPose(TrackedDevice),
}

/// One row of the address table
#[derive(Debug, Clone, Copy)]
pub struct AddressPattern {
    pub address: &'static str,
    pub kind: CommandKind,
    /// Required arguments, positions 0..
    pub args: &'static [ArgType],
}

impl AddressPattern {
    /// Every required position exists with the exact tag
    pub fn accepts(&self, values: &[Value]) -> bool {
        values.len() >= self.args.len()
            && self
                .args
                .iter()
                .zip(values)
                .all(|(expected, value)| expected.matches(value))
    }
}

use ArgType::{Float as F, Int as I, String as S};

const NAMED_POSE: &[ArgType] = &[S, F, F, F, F, F, F, F];

/// Known addresses
pub const ADDRESS_TABLE: &[AddressPattern] = &[
    AddressPattern {
        address: ADDR_AVAILABLE,
        kind: CommandKind::Available,
        args: &[I],
    },
    AddressPattern {
        address: ADDR_TIME,
        kind: CommandKind::Time,
        args: &[F],
    },
    AddressPattern {
        address: ADDR_ROOT_POS,
        kind: CommandKind::RootPose,
        args: NAMED_POSE,
    },
    AddressPattern {
        address: ADDR_BONE_POS,
        kind: CommandKind::BonePose,
        args: NAMED_POSE,
    },
    AddressPattern {
        address: ADDR_BLEND_VAL,
        kind: CommandKind::BlendShapeValue,
        args: &[S, F],
    },
    AddressPattern {
        address: ADDR_BLEND_APPLY,
        kind: CommandKind::BlendShapeApply,
        args: &[],
    },
    AddressPattern {
        address: ADDR_CAMERA,
        kind: CommandKind::Camera,
        args: &[S, F, F, F, F, F, F, F, F],
    },
    AddressPattern {
        address: ADDR_CONTROLLER,
        kind: CommandKind::ControllerInput,
        args: &[I, S, I, I, I, F, F, F],
    },
    AddressPattern {
        address: ADDR_KEY,
        kind: CommandKind::KeyInput,
        args: &[I, S, I],
    },
    AddressPattern {
        address: ADDR_MIDI_NOTE,
        kind: CommandKind::MidiNote,
        args: &[I, I, I, F],
    },
    AddressPattern {
        address: ADDR_MIDI_CC_VAL,
        kind: CommandKind::MidiCcValue,
        args: &[I, F],
    },
    AddressPattern {
        address: ADDR_MIDI_CC_BIT,
        kind: CommandKind::MidiCcBit,
        args: &[I, I],
    },
    AddressPattern {
        address: ADDR_HMD_POS,
        kind: CommandKind::TrackingPose(TrackedDevice::Hmd),
        args: NAMED_POSE,
    },
    AddressPattern {
        address: ADDR_CON_POS,
        kind: CommandKind::TrackingPose(TrackedDevice::Controller),
        args: NAMED_POSE,
    },
    AddressPattern {
        address: ADDR_TRA_POS,
        kind: CommandKind::TrackingPose(TrackedDevice::Tracker),
        args: NAMED_POSE,
    },
];

/// Look up the table row for an address
pub fn find_pattern(address: &str) -> Option<&'static AddressPattern> {
    ADDRESS_TABLE.iter().find(|p| p.address == address)
}

/// Root scale and offset (mixed-reality extension)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleOffset {
    /// Sender-side scale; applied as its reciprocal
    pub scale: Vec3,
    /// Offset subtracted from the root world position
    pub offset: Vec3,
}

/// Controller button/axis event
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerInput {
    pub active: i32,
    pub name: String,
    pub is_left: i32,
    pub is_touch: i32,
    pub is_axis: i32,
    pub axis: Vec3,
}

/// Keyboard event
#[derive(Debug, Clone, PartialEq)]
pub struct KeyInput {
    pub active: i32,
    pub name: String,
    pub keycode: i32,
}

/// MIDI note on/off
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiNote {
    pub active: i32,
    pub channel: i32,
    pub note: i32,
    pub velocity: f32,
}

/// MIDI control change, continuous value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiCcValue {
    pub knob: i32,
    pub value: f32,
}

/// MIDI control change, on/off
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiCcBit {
    pub knob: i32,
    pub active: i32,
}

/// Source of a raw tracking pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedDevice {
    Hmd,
    Controller,
    Tracker,
}

impl TrackedDevice {
    pub const COUNT: usize = 3;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A classified message
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Sender has a model loaded (non-zero) or not (zero)
    Available { loaded: i32 },
    /// Sender-side timestamp in seconds
    Time { time: f32 },
    RootPose {
        name: String,
        pose: Pose,
        scale_offset: Option<ScaleOffset>,
    },
    BonePose { name: String, pose: Pose },
    BlendShapeValue { name: String, value: f32 },
    BlendShapeApply,
    Camera { name: String, pose: Pose, fov: f32 },
    ControllerInput(ControllerInput),
    KeyInput(KeyInput),
    MidiNote(MidiNote),
    MidiCcValue(MidiCcValue),
    MidiCcBit(MidiCcBit),
    TrackingPose {
        device: TrackedDevice,
        serial: String,
        pose: Pose,
    },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Available { .. } => CommandKind::Available,
            Command::Time { .. } => CommandKind::Time,
            Command::RootPose { .. } => CommandKind::RootPose,
            Command::BonePose { .. } => CommandKind::BonePose,
            Command::BlendShapeValue { .. } => CommandKind::BlendShapeValue,
            Command::BlendShapeApply => CommandKind::BlendShapeApply,
            Command::Camera { .. } => CommandKind::Camera,
            Command::ControllerInput(_) => CommandKind::ControllerInput,
            Command::KeyInput(_) => CommandKind::KeyInput,
            Command::MidiNote(_) => CommandKind::MidiNote,
            Command::MidiCcValue(_) => CommandKind::MidiCcValue,
            Command::MidiCcBit(_) => CommandKind::MidiCcBit,
            Command::TrackingPose { device, .. } => CommandKind::TrackingPose(*device),
        }
    }
}
