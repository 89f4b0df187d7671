use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::gamepad::backend::{
    BackendError, BackendEvent, DeviceId, JoystickBackend, JoystickDevice, HAT_UP,
};
use crate::gamepad::reader::Reader;
use crate::gamepad::state::ControllerState;

#[derive(Debug)]
struct MockInputs {
    axes: [i16; 8],
    buttons: [bool; 16],
    hat: u8,
    attached: bool,
}

impl Default for MockInputs {
    fn default() -> Self {
        // Trigger axes rest at the bottom of the raw range, matching
        // how SDL reports full-range XInput triggers.
        let mut axes = [0; 8];
        axes[2] = i16::MIN;
        axes[5] = i16::MIN;
        Self {
            axes,
            buttons: [false; 16],
            hat: 0,
            attached: true,
        }
    }
}

#[derive(Clone)]
struct MockDevice {
    id: DeviceId,
    vendor_id: u16,
    product_id: u16,
    name: String,
    inputs: Arc<Mutex<MockInputs>>,
}

impl JoystickDevice for MockDevice {
    fn id(&self) -> DeviceId {
        self.id
    }
    fn vendor_id(&self) -> u16 {
        self.vendor_id
    }
    fn product_id(&self) -> u16 {
        self.product_id
    }
    fn name(&self) -> String {
        self.name.clone()
    }
    fn is_attached(&self) -> bool {
        self.inputs.lock().unwrap().attached
    }
    fn num_buttons(&self) -> u32 {
        16
    }
    fn num_hats(&self) -> u32 {
        1
    }
    fn axis(&self, index: u32) -> i16 {
        let inputs = self.inputs.lock().unwrap();
        inputs.axes.get(index as usize).copied().unwrap_or(0)
    }
    fn button(&self, index: u32) -> bool {
        let inputs = self.inputs.lock().unwrap();
        inputs.buttons.get(index as usize).copied().unwrap_or(false)
    }
    fn hat(&self) -> u8 {
        self.inputs.lock().unwrap().hat
    }
}

/// Simulated hardware side of the backend: tests hold this to plug and
/// unplug devices and wiggle inputs between ticks.
#[derive(Clone, Default)]
struct MockHardware {
    events: Arc<Mutex<VecDeque<BackendEvent>>>,
    devices: Arc<Mutex<HashMap<u32, MockDevice>>>,
}

impl MockHardware {
    fn attach(&self, id: u32, vendor_id: u16, product_id: u16, name: &str) -> Arc<Mutex<MockInputs>> {
        let inputs = Arc::new(Mutex::new(MockInputs::default()));
        let device = MockDevice {
            id,
            vendor_id,
            product_id,
            name: name.to_string(),
            inputs: inputs.clone(),
        };
        self.devices.lock().unwrap().insert(id, device);
        self.events
            .lock()
            .unwrap()
            .push_back(BackendEvent::Attached(id));
        inputs
    }

    fn detach(&self, id: u32) {
        self.devices.lock().unwrap().remove(&id);
        self.events
            .lock()
            .unwrap()
            .push_back(BackendEvent::Detached(id));
    }

    fn push_attach_event(&self, index: u32) {
        self.events
            .lock()
            .unwrap()
            .push_back(BackendEvent::Attached(index));
    }
}

struct MockBackend {
    hw: MockHardware,
}

impl JoystickBackend for MockBackend {
    type Device = MockDevice;

    fn drain_events(&mut self) -> Vec<BackendEvent> {
        self.hw.events.lock().unwrap().drain(..).collect()
    }

    fn open(&mut self, index: u32) -> Result<Self::Device, BackendError> {
        self.hw
            .devices
            .lock()
            .unwrap()
            .get(&index)
            .cloned()
            .ok_or_else(|| BackendError::Open(index, "no such device".to_string()))
    }
}

fn new_reader(
    capacity: usize,
) -> (
    MockHardware,
    Reader<MockBackend>,
    mpsc::Receiver<ControllerState>,
) {
    let hw = MockHardware::default();
    let (tx, rx) = mpsc::channel(capacity);
    let reader = Reader::new(MockBackend { hw: hw.clone() }, tx);
    (hw, reader, rx)
}

#[test]
fn test_attach_unknown_device_reads_generic_defaults() {
    let (hw, mut reader, mut rx) = new_reader(8);
    hw.attach(1, 0x1234, 0x5678, "Mystery Pad");
    reader.tick();

    let state = rx.try_recv().expect("initial state should be emitted on attach");
    assert!(state.connected);
    assert_eq!(state.controller_type, "generic");
    assert_eq!(state.name, "Mystery Pad");
    assert_eq!(state.player_index, 1);
    assert_eq!(state.buttons, Default::default());
    assert_eq!(state.sticks, Default::default());
    assert_eq!(state.triggers, Default::default());

    // Inputs at rest: no further emission
    reader.tick();
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_known_vendor_resolves_profile() {
    let (hw, mut reader, mut rx) = new_reader(8);
    hw.attach(1, 0x045E, 0x028E, "Xbox Controller");
    reader.tick();
    let state = rx.try_recv().unwrap();
    assert_eq!(state.controller_type, "xbox");
}

#[test]
fn test_input_change_emits_state() {
    let (hw, mut reader, mut rx) = new_reader(8);
    let inputs = hw.attach(1, 0, 0, "Pad");
    reader.tick();
    rx.try_recv().unwrap();

    inputs.lock().unwrap().buttons[0] = true;
    inputs.lock().unwrap().hat = HAT_UP;
    reader.tick();
    let state = rx.try_recv().unwrap();
    assert!(state.buttons.a);
    assert!(state.dpad.up);

    // Unchanged inputs produce no emission
    reader.tick();
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_stick_jitter_below_tolerance_not_emitted() {
    let (hw, mut reader, mut rx) = new_reader(8);
    let inputs = hw.attach(1, 0, 0, "Pad");
    reader.tick();
    rx.try_recv().unwrap();

    inputs.lock().unwrap().axes[0] = 20000;
    reader.tick();
    let state = rx.try_recv().unwrap();
    assert!(state.sticks.left.position.x > 0.6);

    // ~0.003 of normalized travel: ADC noise, suppressed
    inputs.lock().unwrap().axes[0] = 20100;
    reader.tick();
    assert!(rx.try_recv().is_err());

    inputs.lock().unwrap().axes[0] = 25000;
    reader.tick();
    assert!(rx.try_recv().is_ok());
}

#[test]
fn test_deadzone_rests_at_zero() {
    let (hw, mut reader, mut rx) = new_reader(8);
    let inputs = hw.attach(1, 0, 0, "Pad");
    // Just under 5% deflection
    inputs.lock().unwrap().axes[0] = 1500;
    reader.tick();
    let state = rx.try_recv().unwrap();
    assert_eq!(state.sticks.left.position.x, 0.0);
}

#[test]
fn test_triggers_rest_at_zero_and_travel_to_one() {
    let (hw, mut reader, mut rx) = new_reader(8);
    let inputs = hw.attach(1, 0, 0, "Pad");
    reader.tick();

    let state = rx.try_recv().unwrap();
    assert_eq!(state.triggers.lt.value, 0.0);
    assert_eq!(state.triggers.rt.value, 0.0);

    // Raw 0 is the midpoint of the full-range trigger axis
    inputs.lock().unwrap().axes[2] = 0;
    reader.tick();
    let state = rx.try_recv().unwrap();
    assert!((state.triggers.lt.value - 0.5).abs() < 0.01);
    assert_eq!(state.triggers.rt.value, 0.0);

    inputs.lock().unwrap().axes[2] = i16::MAX;
    reader.tick();
    let state = rx.try_recv().unwrap();
    assert_eq!(state.triggers.lt.value, 1.0);
}

#[test]
fn test_detach_promotes_next_in_connection_order() {
    let (hw, mut reader, mut rx) = new_reader(8);
    hw.attach(1, 0x045E, 0x028E, "Pad A");
    hw.attach(2, 0, 0, "Pad B");
    reader.tick();

    let state = rx.try_recv().unwrap();
    assert_eq!(state.name, "Pad A");
    assert!(rx.try_recv().is_err());

    hw.detach(1);
    reader.tick();
    let state = rx.try_recv().unwrap();
    assert!(state.connected);
    assert_eq!(state.name, "Pad B");
    assert_eq!(state.player_index, 1);
}

#[test]
fn test_last_detach_emits_disconnected_state() {
    let (hw, mut reader, mut rx) = new_reader(8);
    hw.attach(1, 0, 0, "Pad");
    reader.tick();
    rx.try_recv().unwrap();

    hw.detach(1);
    reader.tick();
    let state = rx.try_recv().unwrap();
    assert!(!state.connected);
    assert_eq!(state.controller_type, "");
    assert_eq!(state.name, "");
}

#[test]
fn test_set_active_by_player_index() {
    let (hw, mut reader, mut rx) = new_reader(8);
    let handle = reader.handle();

    // Nothing attached yet
    assert!(!handle.set_active_by_player_index(1));

    hw.attach(1, 0, 0, "Pad A");
    hw.attach(2, 0, 0, "Pad B");
    reader.tick();
    rx.try_recv().unwrap();

    assert!(!handle.set_active_by_player_index(0));
    assert!(!handle.set_active_by_player_index(3));
    assert!(handle.set_active_by_player_index(2));

    reader.tick();
    let state = rx.try_recv().unwrap();
    assert_eq!(state.name, "Pad B");
    assert_eq!(state.player_index, 2);
    assert_eq!(handle.current_state().player_index, 2);
}

#[test]
fn test_detached_slot_is_repaired_on_next_poll() {
    let (hw, mut reader, mut rx) = new_reader(8);
    hw.attach(1, 0, 0, "Pad A");
    hw.attach(2, 0, 0, "Pad B");
    reader.tick();
    rx.try_recv().unwrap();

    assert!(reader.handle().set_active_by_player_index(2));
    reader.tick();
    assert_eq!(rx.try_recv().unwrap().name, "Pad B");

    // The followed device disappears; the slot now points past the
    // end of the connection order and must be pulled back.
    hw.detach(2);
    reader.tick();
    let state = rx.try_recv().unwrap();
    assert!(state.connected);
    assert_eq!(state.name, "Pad A");
    assert_eq!(state.player_index, 1);
    assert_eq!(reader.handle().current_state().player_index, 1);
}

#[test]
fn test_failed_open_is_skipped() {
    let (hw, mut reader, mut rx) = new_reader(8);
    hw.push_attach_event(99);
    reader.tick();
    assert!(rx.try_recv().is_err());
    assert!(!reader.handle().set_active_by_player_index(1));
}

#[test]
fn test_full_change_channel_drops_instead_of_blocking() {
    let (hw, mut reader, mut rx) = new_reader(1);
    let inputs = hw.attach(1, 0, 0, "Pad");
    reader.tick();

    // Channel now full; further changes must be dropped silently
    inputs.lock().unwrap().buttons[0] = true;
    reader.tick();
    inputs.lock().unwrap().buttons[0] = false;
    reader.tick();

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}
