//! Daisy-chained receivers
//!
//! A receiver applies a message locally and then forwards the same message
//! to its next receiver, if any. Links are weak: a receiver never keeps its
//! successor alive, and a link whose target is gone is treated as absent.
//!
//! Cycles are allowed at link time. A message that travels more than
//! `MAX_CHAIN_DEPTH` hops latches the forwarding receiver into shutdown.

use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::{debug, error, info};

use vmc_core::{Message, VmcError, VmcResult};

use crate::apply::{
    InputEvent, InputListeners, ReceiverCore, ReceiverState, ReceiverStats, STATUS_INFINITE_LOOP,
};
use crate::command::{ControllerInput, KeyInput, MidiCcBit, MidiCcValue, MidiNote, TrackedDevice};
use crate::config::ReceiverConfig;
use crate::target::{BlendShapeProxy, CameraTarget, PoseTarget, TransformTarget};

/// Deepest hop count a message may be forwarded from
pub const MAX_CHAIN_DEPTH: u32 = 100;

/// Accepts a message together with its hop count
pub trait DaisyChain {
    fn message_daisy_chain(&self, message: &Message, depth: u32);
}

/// Anything that can be linked as a next receiver
pub trait ChainNode {
    /// The chain capability, if this node has one
    fn as_daisy_chain(&self) -> Option<&dyn DaisyChain> {
        None
    }
}

/// A VMC receiver
///
/// All methods take `&self`; state lives behind `RefCell`s and no borrow
/// is held while a message is forwarded or a listener runs, so a receiver
/// may be linked to itself and listeners may feed it messages.
///
/// Input raised while listeners are running is queued and delivered once
/// the running listener returns, in the order it was raised.
pub struct ExternalReceiver {
    core: RefCell<ReceiverCore>,
    listeners: RefCell<InputListeners>,
    pending: RefCell<VecDeque<InputEvent>>,
    dispatching: Cell<bool>,
    next: RefCell<Option<Weak<dyn ChainNode>>>,
}

impl ExternalReceiver {
    /// Create a receiver; the config is validated first
    pub fn new(config: ReceiverConfig) -> VmcResult<Self> {
        config.validate()?;
        Ok(ExternalReceiver::with_config(config))
    }

    fn with_config(config: ReceiverConfig) -> Self {
        ExternalReceiver {
            core: RefCell::new(ReceiverCore::new(config)),
            listeners: RefCell::new(InputListeners::default()),
            pending: RefCell::new(VecDeque::new()),
            dispatching: Cell::new(false),
            next: RefCell::new(None),
        }
    }

    /// Entry point for messages from a source
    pub fn on_data_received(&self, message: &Message) {
        self.message_daisy_chain(message, 0);
    }

    /// Mark this receiver as fed directly by a source
    pub fn attach_source(&self) {
        self.core.borrow_mut().attach_source();
    }

    /// Link `next` as the successor
    pub fn set_next_receiver<N: ChainNode + 'static>(&self, next: &Rc<N>) {
        let next: Rc<dyn ChainNode> = next.clone();
        self.set_next_node(Rc::downgrade(&next));
    }

    pub fn set_next_node(&self, next: Weak<dyn ChainNode>) {
        *self.next.borrow_mut() = Some(next);
    }

    pub fn clear_next_receiver(&self) {
        *self.next.borrow_mut() = None;
    }

    /// Whether a live successor is linked
    pub fn has_next_receiver(&self) -> bool {
        self.next
            .borrow()
            .as_ref()
            .map_or(false, |w| w.strong_count() > 0)
    }

    /// Clear the shutdown latch, filter history and bone cache
    pub fn reinitialize(&self) {
        self.core.borrow_mut().reinitialize();
        info!("[ExternalReceiver] reinitialized");
    }

    pub fn tick(&self) {
        self.core.borrow_mut().tick();
    }

    // Targets

    pub fn set_model(&self, model: impl PoseTarget + 'static) {
        self.core.borrow_mut().targets.model = Some(Box::new(model));
        info!("[ExternalReceiver] new model attached");
    }

    pub fn clear_model(&self) {
        self.core.borrow_mut().targets.model = None;
    }

    /// Use `root` instead of the model's own transform for root poses
    pub fn set_root_transform(&self, root: impl TransformTarget + 'static) {
        self.core.borrow_mut().targets.root = Some(Box::new(root));
    }

    pub fn set_blend_shape_proxy(&self, proxy: impl BlendShapeProxy + 'static) {
        self.core.borrow_mut().targets.blend_shape = Some(Box::new(proxy));
    }

    pub fn set_camera(&self, camera: impl CameraTarget + 'static) {
        self.core.borrow_mut().targets.camera = Some(Box::new(camera));
    }

    /// Debug target for raw tracking poses of `device`
    pub fn set_tracker_target(&self, device: TrackedDevice, target: impl TransformTarget + 'static) {
        self.core.borrow_mut().targets.trackers[device.index()] = Some(Box::new(target));
    }

    // Listeners

    pub fn add_controller_listener(&self, listener: impl FnMut(&ControllerInput) + 'static) {
        self.listeners.borrow_mut().controller.add_listener(listener);
    }

    pub fn add_key_listener(&self, listener: impl FnMut(&KeyInput) + 'static) {
        self.listeners.borrow_mut().key.add_listener(listener);
    }

    pub fn add_midi_note_listener(&self, listener: impl FnMut(&MidiNote) + 'static) {
        self.listeners.borrow_mut().midi_note.add_listener(listener);
    }

    pub fn add_midi_cc_value_listener(&self, listener: impl FnMut(&MidiCcValue) + 'static) {
        self.listeners.borrow_mut().midi_cc_value.add_listener(listener);
    }

    pub fn add_midi_cc_bit_listener(&self, listener: impl FnMut(&MidiCcBit) + 'static) {
        self.listeners.borrow_mut().midi_cc_bit.add_listener(listener);
    }

    // Accessors

    pub fn config(&self) -> ReceiverConfig {
        self.core.borrow().config.clone()
    }

    /// Replace the configuration; takes effect with the next message.
    /// An invalid config is rejected and the current one kept.
    pub fn configure(&self, config: ReceiverConfig) -> VmcResult<()> {
        config.validate()?;
        self.core.borrow_mut().config = config;
        Ok(())
    }

    pub fn state(&self) -> ReceiverState {
        self.core.borrow().state.clone()
    }

    pub fn stats(&self) -> ReceiverStats {
        self.core.borrow().stats.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.core.borrow().state.shutdown
    }

    pub fn status(&self) -> String {
        self.core.borrow().state.status.clone()
    }

    pub fn available(&self) -> i32 {
        self.core.borrow().state.available
    }

    pub fn remote_time(&self) -> f32 {
        self.core.borrow().state.remote_time
    }

    pub fn last_error(&self) -> Option<VmcError> {
        self.core.borrow().state.last_error.clone()
    }

    /// Read access to the core, for inspection
    pub fn core(&self) -> Ref<'_, ReceiverCore> {
        self.core.borrow()
    }

    fn dispatch(&self, event: InputEvent) {
        self.pending.borrow_mut().push_back(event);
        if self.dispatching.replace(true) {
            return;
        }

        loop {
            let event = self.pending.borrow_mut().pop_front();
            let Some(event) = event else {
                break;
            };

            let mut running = std::mem::take(&mut *self.listeners.borrow_mut());
            running.dispatch(&event);

            // Keep listeners registered during the dispatch, after the others
            let mut listeners = self.listeners.borrow_mut();
            running.append(&mut listeners);
            *listeners = running;
        }

        self.dispatching.set(false);
    }

    fn forward(&self, message: &Message, depth: u32) {
        let link = self.next.borrow().clone();
        let Some(link) = link else {
            return;
        };
        let Some(node) = link.upgrade() else {
            debug!("[ExternalReceiver] next receiver dropped, unlinking");
            self.clear_next_receiver();
            return;
        };

        if depth > MAX_CHAIN_DEPTH {
            error!("[ExternalReceiver] Too many call(maybe infinite loop).");
            self.core
                .borrow_mut()
                .latch_shutdown(STATUS_INFINITE_LOOP, VmcError::ChainTooDeep(depth));
            return;
        }

        match node.as_daisy_chain() {
            Some(next) => {
                self.core.borrow_mut().stats.forwarded += 1;
                next.message_daisy_chain(message, depth + 1);
            }
            None => {
                error!("[ExternalReceiver] {}", VmcError::NotAReceiver);
                self.clear_next_receiver();
                self.core.borrow_mut().record_error(VmcError::NotAReceiver);
            }
        }
    }
}

impl Default for ExternalReceiver {
    fn default() -> Self {
        ExternalReceiver::with_config(ReceiverConfig::default())
    }
}

impl std::fmt::Debug for ExternalReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalReceiver")
            .field("core", &self.core)
            .field("has_next", &self.has_next_receiver())
            .finish()
    }
}

impl DaisyChain for ExternalReceiver {
    fn message_daisy_chain(&self, message: &Message, depth: u32) {
        let event = {
            let mut core = self.core.borrow_mut();
            if core.state.shutdown {
                return;
            }
            core.process(message)
        };

        if let Some(event) = event {
            self.dispatch(event);
        }

        self.forward(message, depth);
    }
}

impl ChainNode for ExternalReceiver {
    fn as_daisy_chain(&self) -> Option<&dyn DaisyChain> {
        Some(self)
    }
}
