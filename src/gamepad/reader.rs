//! Joystick polling loop. Owns the only sampling clock in the system:
//! a dedicated thread drains attach/detach notifications, reads the
//! device occupying the requested player slot, normalizes the sample
//! through its mapping profile, and emits a [ControllerState] on the
//! change channel whenever the delta against the last emitted snapshot
//! is non-empty.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::constants::{DEADZONE, POLL_INTERVAL};

use super::backend::{
    BackendEvent, DeviceId, JoystickBackend, JoystickDevice, SdlBackend, HAT_DOWN, HAT_LEFT,
    HAT_RIGHT, HAT_UP,
};
use super::mapping::{self, AxisTarget, ButtonTarget, DeviceMapping};
use super::state::{compute_delta, ControllerState};

/// State shared between the polling thread and the rest of the
/// process. The device map itself is confined to the polling thread;
/// only the last emitted snapshot and the slot bookkeeping are shared.
struct Shared {
    /// Last emitted snapshot, for serving a fresh client before the
    /// next tick
    state: RwLock<ControllerState>,
    /// Requested 1-based player slot
    active_player: AtomicUsize,
    /// Number of currently attached devices
    device_count: AtomicUsize,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: RwLock::new(ControllerState::default()),
            active_player: AtomicUsize::new(1),
            device_count: AtomicUsize::new(0),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ControllerState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ControllerState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Cloneable frontend for interacting with the polling loop from other
/// tasks.
#[derive(Clone)]
pub struct ReaderHandle {
    shared: Arc<Shared>,
}

impl ReaderHandle {
    /// Select which device (by 1-based connection-order index) the
    /// emitted state should follow. Returns false if no device
    /// occupies that ordinal.
    pub fn set_active_by_player_index(&self, index: usize) -> bool {
        if index == 0 || index > self.shared.device_count.load(Ordering::SeqCst) {
            return false;
        }
        self.shared.active_player.store(index, Ordering::SeqCst);
        true
    }

    /// Snapshot of the last emitted state
    pub fn current_state(&self) -> ControllerState {
        self.shared.read_state().clone()
    }
}

struct OpenDevice<D> {
    device: D,
    mapping: &'static DeviceMapping,
    name: String,
}

/// The polling loop and its device session state. Generic over the
/// joystick backend so the loop can be driven tick-by-tick in tests.
pub struct Reader<B: JoystickBackend> {
    backend: B,
    devices: HashMap<DeviceId, OpenDevice<B::Device>>,
    /// Device identities in connection order. Player slot N resolves
    /// to the Nth entry; detaching a device promotes everything after
    /// it.
    order: Vec<DeviceId>,
    last_emitted: ControllerState,
    shared: Arc<Shared>,
    changes: mpsc::Sender<ControllerState>,
}

/// Spawns the SDL polling loop on a dedicated thread. SDL joystick
/// handles are thread-affine, so the backend is constructed inside the
/// thread and every handle is closed there before the thread returns.
pub fn spawn(
    changes: mpsc::Sender<ControllerState>,
    token: CancellationToken,
) -> io::Result<(ReaderHandle, thread::JoinHandle<()>)> {
    let shared = Arc::new(Shared::new());
    let handle = ReaderHandle {
        shared: shared.clone(),
    };

    let thread = thread::Builder::new()
        .name("joystick-reader".to_string())
        .spawn(move || {
            let backend = match SdlBackend::new() {
                Ok(backend) => backend,
                Err(e) => {
                    log::error!("Unable to initialize joystick backend: {e}");
                    return;
                }
            };
            Reader::with_shared(backend, shared, changes).run(token);
        })?;

    Ok((handle, thread))
}

impl<B: JoystickBackend> Reader<B> {
    pub fn new(backend: B, changes: mpsc::Sender<ControllerState>) -> Self {
        Self::with_shared(backend, Arc::new(Shared::new()), changes)
    }

    fn with_shared(backend: B, shared: Arc<Shared>, changes: mpsc::Sender<ControllerState>) -> Self {
        Self {
            backend,
            devices: HashMap::new(),
            order: Vec::new(),
            last_emitted: ControllerState::default(),
            shared,
            changes,
        }
    }

    pub fn handle(&self) -> ReaderHandle {
        ReaderHandle {
            shared: self.shared.clone(),
        }
    }

    /// Runs the polling loop until the token is cancelled, then closes
    /// every open device before returning.
    pub fn run(mut self, token: CancellationToken) {
        while !token.is_cancelled() {
            self.tick();
            thread::sleep(POLL_INTERVAL);
        }
        let count = self.devices.len();
        self.devices.clear();
        self.order.clear();
        self.shared.device_count.store(0, Ordering::SeqCst);
        log::info!("Joystick reader stopped ({count} devices closed)");
    }

    /// One polling cycle: drain hardware notifications, then sample
    /// the active device.
    pub fn tick(&mut self) {
        for event in self.backend.drain_events() {
            match event {
                BackendEvent::Attached(index) => self.attach(index),
                BackendEvent::Detached(id) => self.detach(id),
            }
        }
        self.poll_active();
    }

    fn active_player(&self) -> usize {
        self.shared.active_player.load(Ordering::SeqCst)
    }

    /// Device identity currently occupying the requested player slot
    fn resolved_active(&self) -> Option<DeviceId> {
        self.order.get(self.active_player() - 1).copied()
    }

    fn attach(&mut self, index: u32) {
        let device = match self.backend.open(index) {
            Ok(device) => device,
            Err(e) => {
                // Treated as not present; the OS will send another
                // attach notification if it rediscovers the device.
                log::warn!("Failed to open joystick {index}: {e}");
                return;
            }
        };

        let id = device.id();
        if self.devices.contains_key(&id) {
            return;
        }

        let vendor_id = device.vendor_id();
        let product_id = device.product_id();
        let name = device.name();
        let mapping = mapping::resolve(vendor_id, product_id);
        log::info!(
            "Joystick connected: {name} (VID={vendor_id:04X} PID={product_id:04X}) mapping={} buttons={} hats={}",
            mapping.name,
            device.num_buttons(),
            device.num_hats(),
        );

        self.devices.insert(
            id,
            OpenDevice {
                device,
                mapping,
                name: name.clone(),
            },
        );
        self.order.push(id);
        self.shared
            .device_count
            .store(self.order.len(), Ordering::SeqCst);

        // If this device fills the active slot, a client connected
        // before any input event still gets a "connected" state
        // immediately instead of waiting for the first change.
        if self.resolved_active() == Some(id) {
            let slot = self.active_player();
            log::info!("Active joystick set: {name} (slot {slot})");
            let state = self.identity_state(id, slot);
            self.emit(state);
        }
    }

    fn detach(&mut self, id: DeviceId) {
        let Some(removed) = self.devices.remove(&id) else {
            return;
        };
        log::info!("Joystick disconnected: {}", removed.name);

        let previously_resolved = self.resolved_active();
        self.order.retain(|&d| d != id);
        self.shared
            .device_count
            .store(self.order.len(), Ordering::SeqCst);

        if self.order.is_empty() {
            let slot = self.active_player();
            self.shared.active_player.store(1, Ordering::SeqCst);
            log::info!("No joysticks remain");
            let state = ControllerState {
                player_index: slot,
                ..ControllerState::default()
            };
            self.emit(state);
            return;
        }

        // A slot now pointing past the end of the shrunken list is
        // repaired by the next poll.
        let resolved = self.resolved_active();
        if resolved != previously_resolved {
            if let Some(active_id) = resolved {
                let slot = self.active_player();
                if let Some(open) = self.devices.get(&active_id) {
                    log::info!("Active joystick switched to: {} (slot {slot})", open.name);
                }
                let state = self.identity_state(active_id, slot);
                self.emit(state);
            }
        }
    }

    /// Connected-but-idle state announcing a device's identity. Input
    /// values are filled in by the next poll's delta.
    fn identity_state(&self, id: DeviceId, slot: usize) -> ControllerState {
        let Some(open) = self.devices.get(&id) else {
            return ControllerState::default();
        };
        ControllerState {
            connected: true,
            controller_type: open.mapping.name.to_string(),
            name: open.name.clone(),
            player_index: slot,
            ..ControllerState::default()
        }
    }

    fn poll_active(&mut self) {
        let mut slot = self.active_player();
        if slot > self.order.len() {
            // A detach can race a slot selection and strand the slot
            // past the end of the connection order.
            if self.order.is_empty() {
                return;
            }
            slot = self.order.len();
            self.shared.active_player.store(slot, Ordering::SeqCst);
            log::info!("Player slot out of range, clamped to {slot}");
        }
        let Some(id) = self.order.get(slot - 1).copied() else {
            return;
        };
        let Some(open) = self.devices.get(&id) else {
            return;
        };
        if !open.device.is_attached() {
            return;
        }

        let state = assemble_state(open, slot);
        let delta = compute_delta(&self.last_emitted, &state);
        if delta.is_empty() {
            return;
        }
        self.emit(state);
    }

    fn emit(&mut self, state: ControllerState) {
        self.last_emitted = state.clone();
        *self.shared.write_state() = state.clone();

        match self.changes.try_send(state) {
            Ok(()) => (),
            Err(TrySendError::Full(_)) => {
                // Never block the polling tick on a slow consumer;
                // freshness beats completeness here.
                log::trace!("Change channel full, dropping sample");
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("Change channel closed, dropping sample");
            }
        }
    }
}

/// Reads every mapped axis, button, and hat bit from an open device
/// and assembles a normalized snapshot.
fn assemble_state<D: JoystickDevice>(open: &OpenDevice<D>, slot: usize) -> ControllerState {
    let device = &open.device;
    let mapping = open.mapping;
    let mut state = ControllerState {
        connected: true,
        controller_type: mapping.name.to_string(),
        name: open.name.clone(),
        player_index: slot,
        ..ControllerState::default()
    };

    for am in mapping.axes {
        let raw = device.axis(am.index);
        if am.target.is_trigger() {
            let value = mapping::apply_deadzone(
                mapping::normalize_trigger(raw, am.raw_min, am.raw_max),
                DEADZONE,
            );
            match am.target {
                AxisTarget::LeftTrigger => state.triggers.lt.value = value,
                AxisTarget::RightTrigger => state.triggers.rt.value = value,
                _ => (),
            }
        } else {
            let mut value = mapping::normalize_axis(raw);
            if am.invert {
                value = -value;
            }
            let value = mapping::apply_deadzone(value, DEADZONE);
            match am.target {
                AxisTarget::LeftX => state.sticks.left.position.x = value,
                AxisTarget::LeftY => state.sticks.left.position.y = value,
                AxisTarget::RightX => state.sticks.right.position.x = value,
                AxisTarget::RightY => state.sticks.right.position.y = value,
                _ => (),
            }
        }
    }

    let num_buttons = device.num_buttons();
    for bm in mapping.buttons {
        if bm.index >= num_buttons {
            continue;
        }
        let pressed = device.button(bm.index);
        match bm.target {
            ButtonTarget::A => state.buttons.a = pressed,
            ButtonTarget::B => state.buttons.b = pressed,
            ButtonTarget::X => state.buttons.x = pressed,
            ButtonTarget::Y => state.buttons.y = pressed,
            ButtonTarget::LB => state.buttons.lb = pressed,
            ButtonTarget::RB => state.buttons.rb = pressed,
            ButtonTarget::Select => state.buttons.select = pressed,
            ButtonTarget::Start => state.buttons.start = pressed,
            ButtonTarget::Home => state.buttons.home = pressed,
            ButtonTarget::LeftStick => state.sticks.left.pressed = pressed,
            ButtonTarget::RightStick => state.sticks.right.pressed = pressed,
        }
    }

    if mapping.has_hat && device.num_hats() > 0 {
        let hat = device.hat();
        state.dpad.up = hat & HAT_UP != 0;
        state.dpad.right = hat & HAT_RIGHT != 0;
        state.dpad.down = hat & HAT_DOWN != 0;
        state.dpad.left = hat & HAT_LEFT != 0;
    }

    state
}
