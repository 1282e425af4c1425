//! Message decoder - classify a message into exactly one command
//!
//! A message matches a pattern only if the address is equal and every
//! required argument has the exact expected tag. A known address whose
//! arguments do not check out is reported the same way as an unknown
//! address; callers see a single "unrecognized" class.

use thiserror::Error;

use vmc_core::{Message, Pose, Quat, Value, Vec3};

use crate::command::{
    find_pattern, Command, CommandKind, ControllerInput, KeyInput, MidiCcBit, MidiCcValue,
    MidiNote, ScaleOffset, ROOT_BASE_ARGS, ROOT_EXTENDED_ARGS,
};

/// Why a message did not decode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Message has no address
    #[error("Bad message")]
    Malformed,

    /// Address unknown, or arguments do not fit its pattern
    #[error("{0} is not valid")]
    Unrecognized(String),
}

/// Typed, non-panicking view over message arguments
struct Args<'a>(&'a [Value]);

impl<'a> Args<'a> {
    fn int(&self, i: usize) -> Option<i32> {
        self.0.get(i).and_then(Value::as_int)
    }

    fn float(&self, i: usize) -> Option<f32> {
        self.0.get(i).and_then(Value::as_float)
    }

    fn string(&self, i: usize) -> Option<String> {
        self.0.get(i).and_then(Value::as_str).map(str::to_string)
    }

    fn vec3(&self, i: usize) -> Option<Vec3> {
        Some(Vec3::new(self.float(i)?, self.float(i + 1)?, self.float(i + 2)?))
    }

    /// Position at `i..i+3`, rotation (x, y, z, w) at `i+3..i+7`
    fn pose(&self, i: usize) -> Option<Pose> {
        let position = self.vec3(i)?;
        let rotation = Quat::new(
            self.float(i + 3)?,
            self.float(i + 4)?,
            self.float(i + 5)?,
            self.float(i + 6)?,
        );
        Some(Pose::new(position, rotation))
    }

    /// Present only when all six extension floats are
    fn scale_offset(&self) -> Option<ScaleOffset> {
        if self.0.len() < ROOT_EXTENDED_ARGS {
            return None;
        }
        Some(ScaleOffset {
            scale: self.vec3(ROOT_BASE_ARGS)?,
            offset: self.vec3(ROOT_BASE_ARGS + 3)?,
        })
    }
}

/// Decode a message against the address table
pub fn decode(message: &Message) -> Result<Command, DecodeError> {
    if message.is_malformed() {
        return Err(DecodeError::Malformed);
    }

    let unrecognized = || DecodeError::Unrecognized(message.address.clone());

    let pattern = find_pattern(&message.address).ok_or_else(unrecognized)?;
    if !pattern.accepts(&message.values) {
        return Err(unrecognized());
    }

    build(pattern.kind, &Args(&message.values)).ok_or_else(unrecognized)
}

fn build(kind: CommandKind, args: &Args<'_>) -> Option<Command> {
    let command = match kind {
        CommandKind::Available => Command::Available {
            loaded: args.int(0)?,
        },
        CommandKind::Time => Command::Time {
            time: args.float(0)?,
        },
        CommandKind::RootPose => Command::RootPose {
            name: args.string(0)?,
            pose: args.pose(1)?,
            scale_offset: args.scale_offset(),
        },
        CommandKind::BonePose => Command::BonePose {
            name: args.string(0)?,
            pose: args.pose(1)?,
        },
        CommandKind::BlendShapeValue => Command::BlendShapeValue {
            name: args.string(0)?,
            value: args.float(1)?,
        },
        CommandKind::BlendShapeApply => Command::BlendShapeApply,
        CommandKind::Camera => Command::Camera {
            name: args.string(0)?,
            pose: args.pose(1)?,
            fov: args.float(8)?,
        },
        CommandKind::ControllerInput => Command::ControllerInput(ControllerInput {
            active: args.int(0)?,
            name: args.string(1)?,
            is_left: args.int(2)?,
            is_touch: args.int(3)?,
            is_axis: args.int(4)?,
            axis: args.vec3(5)?,
        }),
        CommandKind::KeyInput => Command::KeyInput(KeyInput {
            active: args.int(0)?,
            name: args.string(1)?,
            keycode: args.int(2)?,
        }),
        CommandKind::MidiNote => Command::MidiNote(MidiNote {
            active: args.int(0)?,
            channel: args.int(1)?,
            note: args.int(2)?,
            velocity: args.float(3)?,
        }),
        CommandKind::MidiCcValue => Command::MidiCcValue(MidiCcValue {
            knob: args.int(0)?,
            value: args.float(1)?,
        }),
        CommandKind::MidiCcBit => Command::MidiCcBit(MidiCcBit {
            knob: args.int(0)?,
            active: args.int(1)?,
        }),
        CommandKind::TrackingPose(device) => Command::TrackingPose {
            device,
            serial: args.string(0)?,
            pose: args.pose(1)?,
        },
    };
    Some(command)
}
