//! Applier - turns decoded commands into target updates
//!
//! `ReceiverCore` owns every piece of per-receiver state: configuration,
//! status, filter history, the bone-name cache and the targets. It is
//! mutated by exactly one call stack at a time.

use tracing::{debug, error, trace};

use vmc_core::{Message, Pose, VmcError};

use crate::bone::{BoneGroup, BoneNameCache, HumanBone};
use crate::command::{
    Command, ControllerInput, KeyInput, MidiCcBit, MidiCcValue, MidiNote, ScaleOffset,
    TrackedDevice,
};
use crate::config::ReceiverConfig;
use crate::decoder::{decode, DecodeError};
use crate::filter::{FilterState, TransformFilter};
use crate::target::{BlendShapeProxy, CameraTarget, EventListeners, PoseTarget, TransformTarget};

pub const STATUS_WAITING_FOR_VMC: &str = "Waiting for VMC...";
pub const STATUS_WAITING_FOR_MASTER: &str = "Waiting for Master...";
pub const STATUS_WAITING_FOR_MODEL: &str = "Waiting for [Load VRM]";
pub const STATUS_MODEL_NOT_FOUND: &str = "Model not found.";
pub const STATUS_OK: &str = "OK";
pub const STATUS_BAD_MESSAGE: &str = "Bad message.";
pub const STATUS_COMMUNICATION_ERROR: &str = "Communication error.";
pub const STATUS_INFINITE_LOOP: &str = "Infinite loop detected!";

/// Observable receiver state
#[derive(Clone, Debug, PartialEq)]
pub struct ReceiverState {
    /// One-way latch; set on fatal faults, cleared only by reinitialization
    pub shutdown: bool,
    /// Last `/VMC/Ext/OK` value
    pub available: i32,
    /// Last `/VMC/Ext/T` value
    pub remote_time: f32,
    /// Human-readable status line
    pub status: String,
    /// Most recent recorded fault
    pub last_error: Option<VmcError>,
}

impl ReceiverState {
    fn new(status: &str) -> Self {
        ReceiverState {
            shutdown: false,
            available: 0,
            remote_time: 0.0,
            status: status.to_string(),
            last_error: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub messages: u64,
    pub applied: u64,
    pub ignored: u64,
    pub forwarded: u64,
}

/// Peripheral input produced by a message, dispatched after the core is
/// released so listeners may query or feed the receiver
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Controller(ControllerInput),
    Key(KeyInput),
    MidiNote(MidiNote),
    MidiCcValue(MidiCcValue),
    MidiCcBit(MidiCcBit),
}

/// Listener lists for every input event kind
#[derive(Debug, Default)]
pub struct InputListeners {
    pub controller: EventListeners<ControllerInput>,
    pub key: EventListeners<KeyInput>,
    pub midi_note: EventListeners<MidiNote>,
    pub midi_cc_value: EventListeners<MidiCcValue>,
    pub midi_cc_bit: EventListeners<MidiCcBit>,
}

impl InputListeners {
    pub fn dispatch(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Controller(e) => self.controller.invoke(e),
            InputEvent::Key(e) => self.key.invoke(e),
            InputEvent::MidiNote(e) => self.midi_note.invoke(e),
            InputEvent::MidiCcValue(e) => self.midi_cc_value.invoke(e),
            InputEvent::MidiCcBit(e) => self.midi_cc_bit.invoke(e),
        }
    }

    /// Move every listener of `other` behind the ones already here
    pub fn append(&mut self, other: &mut InputListeners) {
        self.controller.append(&mut other.controller);
        self.key.append(&mut other.key);
        self.midi_note.append(&mut other.midi_note);
        self.midi_cc_value.append(&mut other.midi_cc_value);
        self.midi_cc_bit.append(&mut other.midi_cc_bit);
    }
}

/// Targets a receiver writes to; all optional
#[derive(Default)]
pub struct Targets {
    pub model: Option<Box<dyn PoseTarget>>,
    /// Overrides the model's own transform as root
    pub root: Option<Box<dyn TransformTarget>>,
    pub blend_shape: Option<Box<dyn BlendShapeProxy>>,
    pub camera: Option<Box<dyn CameraTarget>>,
    /// Debug targets for raw HMD, controller and tracker poses
    pub trackers: [Option<Box<dyn TransformTarget>>; TrackedDevice::COUNT],
}

impl std::fmt::Debug for Targets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Targets")
            .field("model", &self.model.is_some())
            .field("root", &self.root.is_some())
            .field("blend_shape", &self.blend_shape.is_some())
            .field("camera", &self.camera.is_some())
            .finish()
    }
}

/// Per-receiver state and the apply logic
#[derive(Debug)]
pub struct ReceiverCore {
    pub config: ReceiverConfig,
    pub state: ReceiverState,
    pub stats: ReceiverStats,
    pub targets: Targets,
    filters: FilterState,
    bones: BoneNameCache,
    /// A message source feeds this receiver directly
    source_attached: bool,
}

impl ReceiverCore {
    pub fn new(config: ReceiverConfig) -> Self {
        ReceiverCore {
            config,
            state: ReceiverState::new(STATUS_WAITING_FOR_MASTER),
            stats: ReceiverStats::default(),
            targets: Targets::default(),
            filters: FilterState::new(),
            bones: BoneNameCache::new(),
            source_attached: false,
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn bone_cache(&self) -> &BoneNameCache {
        &self.bones
    }

    /// Mark this receiver as the head of a chain fed by a source
    pub fn attach_source(&mut self) {
        self.source_attached = true;
        self.state.status = STATUS_WAITING_FOR_VMC.to_string();
    }

    /// Back to the just-started state. Targets and config are kept.
    pub fn reinitialize(&mut self) {
        let status = if self.source_attached {
            STATUS_WAITING_FOR_VMC
        } else {
            STATUS_WAITING_FOR_MASTER
        };
        self.state = ReceiverState::new(status);
        self.stats = ReceiverStats::default();
        self.filters.reset();
        self.bones.clear();
    }

    /// Periodic housekeeping
    pub fn tick(&mut self) {
        if self.state.shutdown {
            return;
        }
        if self.targets.model.is_none() {
            self.state.status = STATUS_MODEL_NOT_FOUND.to_string();
        }
    }

    /// Set the one-way shutdown latch
    pub fn latch_shutdown(&mut self, status: &str, err: VmcError) {
        self.state.shutdown = true;
        self.state.status = status.to_string();
        self.state.last_error = Some(err);
    }

    pub fn record_error(&mut self, err: VmcError) {
        self.state.last_error = Some(err);
    }

    /// Decode and apply one message
    pub fn process(&mut self, message: &Message) -> Option<InputEvent> {
        self.stats.messages += 1;

        match decode(message) {
            Ok(command) => {
                self.stats.applied += 1;
                self.apply(command)
            }
            Err(DecodeError::Malformed) => {
                self.state.status = STATUS_BAD_MESSAGE.to_string();
                if self.config.strict_mode {
                    error!("[ExternalReceiver] null message received");
                    self.latch_shutdown(STATUS_BAD_MESSAGE, VmcError::BadMessage);
                } else {
                    self.stats.ignored += 1;
                }
                None
            }
            Err(DecodeError::Unrecognized(address)) => {
                if self.config.strict_mode {
                    error!("[ExternalReceiver] {} is not valid", address);
                    self.latch_shutdown(
                        STATUS_COMMUNICATION_ERROR,
                        VmcError::ProtocolViolation(address),
                    );
                } else {
                    trace!(%address, "ignoring unrecognized message");
                    self.stats.ignored += 1;
                }
                None
            }
        }
    }

    /// Apply a decoded command
    pub fn apply(&mut self, command: Command) -> Option<InputEvent> {
        match command {
            Command::Available { loaded } => {
                self.state.available = loaded;
                if loaded == 0 {
                    self.state.status = STATUS_WAITING_FOR_MODEL.to_string();
                }
            }
            Command::Time { time } => {
                self.state.remote_time = time;
            }
            Command::RootPose {
                pose, scale_offset, ..
            } => {
                self.state.status = STATUS_OK.to_string();
                self.sync_root(pose, scale_offset);
            }
            Command::BonePose { name, pose } => {
                self.sync_bone(&name, pose);
            }
            Command::BlendShapeValue { name, value } => {
                if self.config.blend_shape_synchronize {
                    if let Some(proxy) = self.targets.blend_shape.as_mut() {
                        proxy.accumulate_value(&name, value);
                    }
                }
            }
            Command::BlendShapeApply => {
                if self.config.blend_shape_synchronize {
                    if let Some(proxy) = self.targets.blend_shape.as_mut() {
                        proxy.apply();
                    }
                }
            }
            Command::Camera { pose, fov, .. } => {
                self.sync_camera(pose, fov);
            }
            Command::ControllerInput(con) => return Some(InputEvent::Controller(con)),
            Command::KeyInput(key) => return Some(InputEvent::Key(key)),
            Command::MidiNote(note) => {
                debug!(
                    "Note {}/{}/{}/{}",
                    note.active, note.channel, note.note, note.velocity
                );
                return Some(InputEvent::MidiNote(note));
            }
            Command::MidiCcValue(cc) => {
                debug!("CC Val {}/{}", cc.knob, cc.value);
                return Some(InputEvent::MidiCcValue(cc));
            }
            Command::MidiCcBit(cc) => {
                debug!("CC Bit {}/{}", cc.knob, cc.active);
                return Some(InputEvent::MidiCcBit(cc));
            }
            Command::TrackingPose {
                device,
                serial,
                pose,
            } => {
                debug!(
                    "{:?} pos {} : {}/{}",
                    device, serial, pose.position, pose.rotation
                );
                if let Some(target) = self.targets.trackers[device.index()].as_mut() {
                    target.set_position(pose.position);
                    target.set_rotation(pose.rotation);
                }
            }
        }
        None
    }

    fn sync_root(&mut self, pose: Pose, scale_offset: Option<ScaleOffset>) {
        let config = &self.config;
        if let Some(root) = self.targets.root.as_deref_mut() {
            apply_root(root, config, pose, scale_offset);
        } else if let Some(model) = self.targets.model.as_deref_mut() {
            apply_root(model, config, pose, scale_offset);
        }
    }

    fn sync_bone(&mut self, name: &str, pose: Pose) {
        let Some(bone) = self.bones.resolve(name) else {
            return;
        };
        let Some(model) = self.targets.model.as_deref_mut() else {
            return;
        };
        if !model.has_bone(bone) {
            return;
        }

        let config = &self.config;
        let (position_filter, rotation_filter) = match bone.group() {
            BoneGroup::Finger if config.hand_pose_synchronize_cutoff => return,
            BoneGroup::Eye if config.eye_bone_synchronize_cutoff => return,
            BoneGroup::Finger | BoneGroup::Eye => (false, false),
            BoneGroup::Body => (
                config.bone_position_filter_enable,
                config.bone_rotation_filter_enable,
            ),
        };

        sync_single_bone(
            model,
            self.filters.bone_mut(bone),
            config,
            bone,
            pose,
            position_filter,
            rotation_filter,
        );
    }

    fn sync_camera(&mut self, pose: Pose, fov: f32) {
        let Some(camera) = self.targets.camera.as_deref_mut() else {
            return;
        };
        let config = &self.config;
        let filter = &mut self.filters.camera;
        let k = config.camera_filter;

        camera.set_local_position(filter.position_or_raw(
            pose.position,
            k,
            config.camera_position_filter_enable,
        ));
        camera.set_local_rotation(filter.rotation_or_raw(
            pose.rotation,
            k,
            config.camera_rotation_filter_enable,
        ));
        camera.set_field_of_view(fov);
    }
}

fn apply_root<T: TransformTarget + ?Sized>(
    root: &mut T,
    config: &ReceiverConfig,
    pose: Pose,
    scale_offset: Option<ScaleOffset>,
) {
    if config.root_position_synchronize {
        root.set_local_position(pose.position);
    }
    if config.root_rotation_synchronize {
        root.set_local_rotation(pose.rotation);
    }
    if config.root_scale_offset_synchronize {
        if let Some(so) = scale_offset {
            root.set_local_scale(so.scale.recip());
            let world = root.position();
            root.set_position(world - so.offset);
        }
    }
}

fn sync_single_bone(
    model: &mut dyn PoseTarget,
    filter: &mut TransformFilter,
    config: &ReceiverConfig,
    bone: HumanBone,
    pose: Pose,
    position_filter: bool,
    rotation_filter: bool,
) {
    let k = config.bone_filter;

    if config.bone_position_synchronize {
        let position = filter.position_or_raw(pose.position, k, position_filter);
        model.set_bone_local_position(bone, position);
    }

    let rotation = filter.rotation_or_raw(pose.rotation, k, rotation_filter);
    model.set_bone_local_rotation(bone, rotation);
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::avatar::{Avatar, BlendShapeState, Camera, Transform};
    use vmc_core::{Quat, Value, Vec3};

    fn core_with_avatar(config: ReceiverConfig) -> (ReceiverCore, Rc<RefCell<Avatar>>) {
        let avatar = Rc::new(RefCell::new(Avatar::humanoid()));
        let mut core = ReceiverCore::new(config);
        core.targets.model = Some(Box::new(avatar.clone()));
        (core, avatar)
    }

    fn pose_message(address: &str, name: &str, p: Vec3, r: Quat) -> Message {
        Message::new(
            address,
            vec![
                name.into(),
                Value::Float(p.x),
                Value::Float(p.y),
                Value::Float(p.z),
                Value::Float(r.x),
                Value::Float(r.y),
                Value::Float(r.z),
                Value::Float(r.w),
            ],
        )
    }

    fn root_message(extension: &[f32]) -> Message {
        let mut msg = pose_message(
            "/VMC/Ext/Root/Pos",
            "root",
            Vec3::new(1.0, 0.0, 2.0),
            Quat::IDENTITY,
        );
        msg.values.extend(extension.iter().copied().map(Value::Float));
        msg
    }

    #[test]
    fn test_root_pose_identity() {
        let (mut core, avatar) = core_with_avatar(ReceiverConfig::default());
        avatar.borrow_mut().root.position = Vec3::new(5.0, 5.0, 5.0);
        avatar.borrow_mut().root.rotation = Quat::new(0.0, 1.0, 0.0, 0.0);

        let msg = pose_message("/VMC/Ext/Root/Pos", "root", Vec3::ZERO, Quat::IDENTITY);
        core.process(&msg);

        assert_eq!(avatar.borrow().root.position, Vec3::ZERO);
        assert_eq!(avatar.borrow().root.rotation, Quat::IDENTITY);
        assert_eq!(core.state.status, STATUS_OK);
    }

    #[test]
    fn test_root_sync_flags() {
        let config = ReceiverConfig {
            root_position_synchronize: false,
            ..ReceiverConfig::default()
        };
        let (mut core, avatar) = core_with_avatar(config);
        let rotated = Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), 1.0);

        core.process(&pose_message(
            "/VMC/Ext/Root/Pos",
            "root",
            Vec3::ONE,
            rotated,
        ));

        assert_eq!(avatar.borrow().root.position, Vec3::ZERO);
        assert_eq!(avatar.borrow().root.rotation, rotated);
    }

    #[test]
    fn test_root_scale_offset() {
        let config = ReceiverConfig {
            root_scale_offset_synchronize: true,
            ..ReceiverConfig::default()
        };
        let (mut core, avatar) = core_with_avatar(config);

        core.process(&root_message(&[0.5, 1.0, 4.0, 0.5, 0.0, 1.0]));

        let root = avatar.borrow().root;
        assert_eq!(root.scale, Vec3::new(2.0, 1.0, 0.25));
        assert_eq!(root.position, Vec3::new(0.5, 0.0, 1.0));
    }

    #[test]
    fn test_root_offset_applies_without_position_sync() {
        let config = ReceiverConfig {
            root_position_synchronize: false,
            root_scale_offset_synchronize: true,
            ..ReceiverConfig::default()
        };
        let (mut core, avatar) = core_with_avatar(config);

        core.process(&root_message(&[1.0, 1.0, 1.0, 0.0, 1.0, 0.0]));
        assert_eq!(avatar.borrow().root.position, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_root_scale_offset_disabled() {
        let (mut core, avatar) = core_with_avatar(ReceiverConfig::default());
        core.process(&root_message(&[0.5, 0.5, 0.5, 1.0, 1.0, 1.0]));

        let root = avatar.borrow().root;
        assert_eq!(root.scale, Vec3::ONE);
        assert_eq!(root.position, Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_explicit_root_overrides_model() {
        let (mut core, avatar) = core_with_avatar(ReceiverConfig::default());
        let root = Rc::new(RefCell::new(Transform::default()));
        core.targets.root = Some(Box::new(root.clone()));

        core.process(&root_message(&[]));
        assert_eq!(root.borrow().position, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(avatar.borrow().root.position, Vec3::ZERO);
    }

    #[test]
    fn test_bone_pose_raw() {
        let (mut core, avatar) = core_with_avatar(ReceiverConfig::default());
        let r = Quat::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), 0.5);

        core.process(&pose_message("/VMC/Ext/Bone/Pos", "Spine", Vec3::ONE, r));

        let avatar = avatar.borrow();
        let spine = avatar.bone(HumanBone::Spine).unwrap();
        assert_eq!(spine.position, Vec3::ONE);
        assert_eq!(spine.rotation, r);
    }

    #[test]
    fn test_bone_position_sync_off_still_rotates() {
        let config = ReceiverConfig {
            bone_position_synchronize: false,
            ..ReceiverConfig::default()
        };
        let (mut core, avatar) = core_with_avatar(config);
        let r = Quat::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), 0.5);

        core.process(&pose_message("/VMC/Ext/Bone/Pos", "Head", Vec3::ONE, r));

        let avatar = avatar.borrow();
        let head = avatar.bone(HumanBone::Head).unwrap();
        assert_eq!(head.position, Vec3::ZERO);
        assert_eq!(head.rotation, r);
    }

    #[test]
    fn test_unknown_bone_is_noop() {
        let (mut core, avatar) = core_with_avatar(ReceiverConfig::default());
        let before = avatar.borrow().clone();

        core.process(&pose_message("/VMC/Ext/Bone/Pos", "Tail", Vec3::ONE, Quat::IDENTITY));
        core.process(&pose_message("/VMC/Ext/Bone/Pos", "Tail", Vec3::ONE, Quat::IDENTITY));

        assert_eq!(avatar.borrow().root, before.root);
        assert_eq!(core.bone_cache().lookups(), 1);
        assert!(!core.state.shutdown);
    }

    #[test]
    fn test_bone_filter_blends_position() {
        let config = ReceiverConfig {
            bone_position_filter_enable: true,
            ..ReceiverConfig::default()
        };
        let (mut core, avatar) = core_with_avatar(config);

        core.process(&pose_message(
            "/VMC/Ext/Bone/Pos",
            "Hips",
            Vec3::new(1.0, 0.0, 0.0),
            Quat::IDENTITY,
        ));

        let x = avatar.borrow().bone(HumanBone::Hips).unwrap().position.x;
        assert!((x - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_finger_and_eye_bones_never_filtered() {
        let config = ReceiverConfig {
            bone_position_filter_enable: true,
            bone_rotation_filter_enable: true,
            ..ReceiverConfig::default()
        };
        let (mut core, avatar) = core_with_avatar(config);
        let r = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), 1.0);

        for name in ["LeftIndexProximal", "RightThumbDistal", "LeftEye"] {
            core.process(&pose_message("/VMC/Ext/Bone/Pos", name, Vec3::ONE, r));
        }

        let avatar = avatar.borrow();
        for bone in [
            HumanBone::LeftIndexProximal,
            HumanBone::RightThumbDistal,
            HumanBone::LeftEye,
        ] {
            let t = avatar.bone(bone).unwrap();
            assert_eq!(t.position, Vec3::ONE);
            assert_eq!(t.rotation, r);
            assert_eq!(core.filters().bone(bone).position, Vec3::ZERO);
        }
    }

    #[test]
    fn test_hand_and_eye_cutoff() {
        let config = ReceiverConfig {
            hand_pose_synchronize_cutoff: true,
            eye_bone_synchronize_cutoff: true,
            ..ReceiverConfig::default()
        };
        let (mut core, avatar) = core_with_avatar(config);

        for name in ["LeftIndexProximal", "RightEye", "Neck"] {
            core.process(&pose_message("/VMC/Ext/Bone/Pos", name, Vec3::ONE, Quat::IDENTITY));
        }

        let avatar = avatar.borrow();
        assert_eq!(avatar.bone(HumanBone::LeftIndexProximal).unwrap().position, Vec3::ZERO);
        assert_eq!(avatar.bone(HumanBone::RightEye).unwrap().position, Vec3::ZERO);
        assert_eq!(avatar.bone(HumanBone::Neck).unwrap().position, Vec3::ONE);
    }

    #[test]
    fn test_rotation_filter_converges_without_overshoot() {
        let config = ReceiverConfig {
            bone_rotation_filter_enable: true,
            ..ReceiverConfig::default()
        };
        let (mut core, avatar) = core_with_avatar(config);
        let target = Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), 1.2);
        let msg = pose_message("/VMC/Ext/Bone/Pos", "Chest", Vec3::ZERO, target);

        core.process(&msg);
        let first = avatar.borrow().bone(HumanBone::Chest).unwrap().rotation;
        core.process(&msg);
        let second = avatar.borrow().bone(HumanBone::Chest).unwrap().rotation;

        let d0 = Quat::IDENTITY.angle_to(&target);
        let d1 = first.angle_to(&target);
        let d2 = second.angle_to(&target);
        assert!(d1 < d0);
        assert!(d2 < d1);
        assert!(second.angle_to(&Quat::IDENTITY) <= 1.2 + 1e-3);
        assert!((d1 - 1.2 * 0.7).abs() < 1e-2);
    }

    #[test]
    fn test_filter_resumes_from_accumulator() {
        let mut config = ReceiverConfig {
            bone_position_filter_enable: true,
            bone_filter: 0.5,
            ..ReceiverConfig::default()
        };
        let (mut core, avatar) = core_with_avatar(config.clone());
        let at = |x: f32| {
            pose_message("/VMC/Ext/Bone/Pos", "Hips", Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)
        };

        core.process(&at(1.0));
        assert_eq!(core.filters().bone(HumanBone::Hips).position.x, 0.5);

        config.bone_position_filter_enable = false;
        core.config = config.clone();
        core.process(&at(100.0));
        assert_eq!(avatar.borrow().bone(HumanBone::Hips).unwrap().position.x, 100.0);
        assert_eq!(core.filters().bone(HumanBone::Hips).position.x, 0.5);

        config.bone_position_filter_enable = true;
        core.config = config;
        core.process(&at(1.0));
        assert_eq!(avatar.borrow().bone(HumanBone::Hips).unwrap().position.x, 0.75);
    }

    #[test]
    fn test_blendshape_value_and_apply() {
        let mut core = ReceiverCore::new(ReceiverConfig::default());
        let face = Rc::new(RefCell::new(BlendShapeState::new()));
        core.targets.blend_shape = Some(Box::new(face.clone()));

        core.process(&Message::new(
            "/VMC/Ext/Blend/Val",
            vec!["Joy".into(), Value::Float(0.6)],
        ));
        assert_eq!(face.borrow().value("Joy"), None);

        core.process(&Message::new("/VMC/Ext/Blend/Apply", vec![]));
        assert_eq!(face.borrow().value("Joy"), Some(0.6));
    }

    #[test]
    fn test_blendshape_sync_disabled() {
        let config = ReceiverConfig {
            blend_shape_synchronize: false,
            ..ReceiverConfig::default()
        };
        let mut core = ReceiverCore::new(config);
        let face = Rc::new(RefCell::new(BlendShapeState::new()));
        core.targets.blend_shape = Some(Box::new(face.clone()));

        core.process(&Message::new(
            "/VMC/Ext/Blend/Val",
            vec!["Joy".into(), Value::Float(0.6)],
        ));
        core.process(&Message::new("/VMC/Ext/Blend/Apply", vec![]));
        assert_eq!(face.borrow().apply_count, 0);
        assert_eq!(face.borrow().pending("Joy"), None);
    }

    #[test]
    fn test_camera_filter_and_raw_fov() {
        let config = ReceiverConfig {
            camera_position_filter_enable: true,
            ..ReceiverConfig::default()
        };
        let mut core = ReceiverCore::new(config);
        let camera = Rc::new(RefCell::new(Camera::default()));
        core.targets.camera = Some(Box::new(camera.clone()));

        let mut msg = pose_message(
            "/VMC/Ext/Cam",
            "Camera",
            Vec3::new(0.0, 0.0, 10.0),
            Quat::IDENTITY,
        );
        msg.values.push(Value::Float(42.0));
        core.process(&msg);

        let camera = camera.borrow();
        assert!((camera.transform.position.z - 0.5).abs() < 1e-5);
        assert_eq!(camera.field_of_view, 42.0);
    }

    #[test]
    fn test_camera_without_target_is_noop() {
        let mut core = ReceiverCore::new(ReceiverConfig::default());
        let mut msg = pose_message("/VMC/Ext/Cam", "Camera", Vec3::ONE, Quat::IDENTITY);
        msg.values.push(Value::Float(42.0));

        assert_eq!(core.process(&msg), None);
        assert_eq!(core.filters().camera.position, Vec3::ZERO);
    }

    fn camera_message(p: Vec3, r: Quat, fov: f32) -> Message {
        let mut msg = pose_message("/VMC/Ext/Cam", "Camera", p, r);
        msg.values.push(Value::Float(fov));
        msg
    }

    #[test]
    fn test_camera_rotation_filter_step() {
        let config = ReceiverConfig {
            camera_rotation_filter_enable: true,
            ..ReceiverConfig::default()
        };
        let mut core = ReceiverCore::new(config);
        let camera = Rc::new(RefCell::new(Camera::default()));
        core.targets.camera = Some(Box::new(camera.clone()));
        let target = Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), 1.0);

        core.process(&camera_message(Vec3::new(0.0, 1.0, 0.0), target, 30.0));

        let camera = camera.borrow();
        let moved = camera.transform.rotation.angle_to(&Quat::IDENTITY);
        assert!((moved - 1.0 * (1.0 - 0.95)).abs() < 1e-3);
        assert_eq!(core.filters().camera.rotation, camera.transform.rotation);

        // Position filter is off: raw value, accumulator untouched
        assert_eq!(camera.transform.position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(core.filters().camera.position, Vec3::ZERO);
    }

    #[test]
    fn test_camera_and_bone_accumulators_independent() {
        let config = ReceiverConfig {
            bone_position_filter_enable: true,
            bone_rotation_filter_enable: true,
            camera_position_filter_enable: true,
            camera_rotation_filter_enable: true,
            ..ReceiverConfig::default()
        };
        let (mut core, _avatar) = core_with_avatar(config);
        core.targets.camera = Some(Box::new(Camera::default()));
        let r = Quat::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), 0.8);

        core.process(&pose_message("/VMC/Ext/Bone/Pos", "Hips", Vec3::ONE, r));
        assert_eq!(core.filters().camera, TransformFilter::default());
        let hips = *core.filters().bone(HumanBone::Hips);
        assert_ne!(hips, TransformFilter::default());

        core.process(&camera_message(Vec3::new(0.0, 0.0, 5.0), r, 40.0));
        assert_eq!(*core.filters().bone(HumanBone::Hips), hips);
        assert_ne!(core.filters().camera, TransformFilter::default());
    }

    #[test]
    fn test_availability_and_time() {
        let mut core = ReceiverCore::new(ReceiverConfig::default());

        core.process(&Message::new("/VMC/Ext/OK", vec![Value::Int(1)]));
        assert_eq!(core.state.available, 1);

        core.process(&Message::new("/VMC/Ext/OK", vec![Value::Int(0)]));
        assert_eq!(core.state.available, 0);
        assert_eq!(core.state.status, STATUS_WAITING_FOR_MODEL);

        core.process(&Message::new("/VMC/Ext/T", vec![Value::Float(3.25)]));
        assert_eq!(core.state.remote_time, 3.25);
    }

    #[test]
    fn test_input_events_returned() {
        let mut core = ReceiverCore::new(ReceiverConfig::default());
        let event = core.process(&Message::new(
            "/VMC/Ext/Key",
            vec![Value::Int(1), "A".into(), Value::Int(65)],
        ));
        assert_eq!(
            event,
            Some(InputEvent::Key(KeyInput {
                active: 1,
                name: "A".into(),
                keycode: 65,
            }))
        );
    }

    #[test]
    fn test_tracker_debug_target() {
        let mut core = ReceiverCore::new(ReceiverConfig::default());
        let hmd = Rc::new(RefCell::new(Transform::default()));
        core.targets.trackers[TrackedDevice::Hmd.index()] = Some(Box::new(hmd.clone()));

        core.process(&pose_message(
            "/VMC/Ext/Hmd/Pos",
            "HMD",
            Vec3::new(0.0, 1.7, 0.0),
            Quat::IDENTITY,
        ));
        core.process(&pose_message(
            "/VMC/Ext/Tra/Pos",
            "LHR-1",
            Vec3::new(9.0, 9.0, 9.0),
            Quat::IDENTITY,
        ));

        assert_eq!(hmd.borrow().position, Vec3::new(0.0, 1.7, 0.0));
    }

    #[test]
    fn test_lenient_unrecognized_only_counts() {
        let mut core = ReceiverCore::new(ReceiverConfig::default());
        let before = core.state.clone();

        core.process(&Message::new("/VMC/Ext/Nope", vec![]));
        assert_eq!(core.state, before);
        assert_eq!(core.stats.ignored, 1);
    }

    #[test]
    fn test_strict_unrecognized_latches() {
        let config = ReceiverConfig {
            strict_mode: true,
            ..ReceiverConfig::default()
        };
        let mut core = ReceiverCore::new(config);

        core.process(&Message::new("/VMC/Ext/Nope", vec![]));
        assert!(core.state.shutdown);
        assert_eq!(core.state.status, STATUS_COMMUNICATION_ERROR);
        assert_eq!(
            core.state.last_error,
            Some(VmcError::ProtocolViolation("/VMC/Ext/Nope".into()))
        );
    }

    #[test]
    fn test_malformed_message() {
        let mut lenient = ReceiverCore::new(ReceiverConfig::default());
        lenient.process(&Message::default());
        assert_eq!(lenient.state.status, STATUS_BAD_MESSAGE);
        assert!(!lenient.state.shutdown);

        let mut strict = ReceiverCore::new(ReceiverConfig {
            strict_mode: true,
            ..ReceiverConfig::default()
        });
        strict.process(&Message::default());
        assert!(strict.state.shutdown);
        assert_eq!(strict.state.last_error, Some(VmcError::BadMessage));
    }

    #[test]
    fn test_tick_reports_missing_model() {
        let mut core = ReceiverCore::new(ReceiverConfig::default());
        core.tick();
        assert_eq!(core.state.status, STATUS_MODEL_NOT_FOUND);
    }

    #[test]
    fn test_reinitialize() {
        let config = ReceiverConfig {
            strict_mode: true,
            bone_position_filter_enable: true,
            ..ReceiverConfig::default()
        };
        let (mut core, _avatar) = core_with_avatar(config);
        core.attach_source();
        core.process(&pose_message("/VMC/Ext/Bone/Pos", "Hips", Vec3::ONE, Quat::IDENTITY));
        core.process(&Message::new("/bad", vec![]));
        assert!(core.state.shutdown);

        core.reinitialize();
        assert!(!core.state.shutdown);
        assert_eq!(core.state.status, STATUS_WAITING_FOR_VMC);
        assert_eq!(core.filters().bone(HumanBone::Hips).position, Vec3::ZERO);
        assert!(core.bone_cache().is_empty());
        assert!(core.targets.model.is_some());
    }
}
