//! Thin seam over the platform joystick layer. The reader only needs
//! six capabilities from it: enumerate on start, attach/detach
//! notifications, open/close by identity, indexed axis/button/hat
//! reads, and vendor/product/name queries. Keeping these behind a
//! trait lets the reader run against a mock in tests.

use sdl2::{
    event::Event,
    joystick::{HatState, Joystick},
    EventPump, JoystickSubsystem, Sdl,
};
use thiserror::Error;

/// SDL hat bitmask: up
pub const HAT_UP: u8 = 0x01;
/// SDL hat bitmask: right
pub const HAT_RIGHT: u8 = 0x02;
/// SDL hat bitmask: down
pub const HAT_DOWN: u8 = 0x04;
/// SDL hat bitmask: left
pub const HAT_LEFT: u8 = 0x08;

/// Stable identity of an open device (SDL instance ID)
pub type DeviceId = u32;

/// Represents all possible errors from the joystick backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("joystick subsystem initialization failed: {0}")]
    Init(String),
    #[error("failed to open joystick {0}: {1}")]
    Open(u32, String),
}

/// Hardware notifications drained by the reader at the start of each
/// tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    /// A device appeared. Carries the backend's enumeration index,
    /// valid until the device is opened.
    Attached(u32),
    /// An open device disappeared. Carries its [DeviceId].
    Detached(DeviceId),
}

/// One open joystick handle
pub trait JoystickDevice {
    fn id(&self) -> DeviceId;
    fn vendor_id(&self) -> u16;
    fn product_id(&self) -> u16;
    fn name(&self) -> String;
    fn is_attached(&self) -> bool;
    fn num_buttons(&self) -> u32;
    fn num_hats(&self) -> u32;
    /// Raw value of the given axis. Reads of unknown axes degrade to 0
    /// rather than failing the tick.
    fn axis(&self, index: u32) -> i16;
    fn button(&self, index: u32) -> bool;
    /// First hat as an SDL direction bitmask
    fn hat(&self) -> u8;
}

/// Platform joystick access. Implementations are thread-affine; the
/// reader constructs and drives the backend entirely on its own
/// thread.
pub trait JoystickBackend {
    type Device: JoystickDevice;

    /// Drain pending attach/detach notifications
    fn drain_events(&mut self) -> Vec<BackendEvent>;

    /// Open the device at the given enumeration index
    fn open(&mut self, index: u32) -> Result<Self::Device, BackendError>;
}

/// SDL2 joystick subsystem backend
pub struct SdlBackend {
    // Keeps the SDL context alive for the lifetime of the backend
    _sdl: Sdl,
    subsystem: JoystickSubsystem,
    events: EventPump,
    pending: Vec<BackendEvent>,
}

impl SdlBackend {
    pub fn new() -> Result<Self, BackendError> {
        // The server has no window; without this hint SDL stops
        // reporting joystick input when unfocused on some platforms.
        sdl2::hint::set("SDL_JOYSTICK_ALLOW_BACKGROUND_EVENTS", "1");

        let sdl = sdl2::init().map_err(BackendError::Init)?;
        let subsystem = sdl.joystick().map_err(BackendError::Init)?;
        let events = sdl.event_pump().map_err(BackendError::Init)?;

        // Devices connected before init won't produce added events on
        // every SDL build, so seed them from enumeration.
        let count = subsystem.num_joysticks().map_err(BackendError::Init)?;
        let pending = (0..count).map(BackendEvent::Attached).collect();

        log::info!("SDL joystick subsystem initialized ({count} devices present)");

        Ok(Self {
            _sdl: sdl,
            subsystem,
            events,
            pending,
        })
    }
}

impl JoystickBackend for SdlBackend {
    type Device = SdlDevice;

    fn drain_events(&mut self) -> Vec<BackendEvent> {
        let mut drained = std::mem::take(&mut self.pending);
        for event in self.events.poll_iter() {
            match event {
                Event::JoyDeviceAdded { which, .. } => {
                    drained.push(BackendEvent::Attached(which));
                }
                Event::JoyDeviceRemoved { which, .. } => {
                    drained.push(BackendEvent::Detached(which));
                }
                _ => (),
            }
        }
        drained
    }

    fn open(&mut self, index: u32) -> Result<Self::Device, BackendError> {
        let joystick = self
            .subsystem
            .open(index)
            .map_err(|e| BackendError::Open(index, e.to_string()))?;
        Ok(SdlDevice { joystick })
    }
}

/// One open SDL joystick
pub struct SdlDevice {
    joystick: Joystick,
}

impl JoystickDevice for SdlDevice {
    fn id(&self) -> DeviceId {
        self.joystick.instance_id()
    }

    /// Vendor ID from the SDL GUID (little-endian at bytes 4-5 for
    /// USB/Bluetooth bus types)
    fn vendor_id(&self) -> u16 {
        let data = self.joystick.guid().raw().data;
        u16::from_le_bytes([data[4], data[5]])
    }

    /// Product ID from the SDL GUID (little-endian at bytes 8-9)
    fn product_id(&self) -> u16 {
        let data = self.joystick.guid().raw().data;
        u16::from_le_bytes([data[8], data[9]])
    }

    fn name(&self) -> String {
        self.joystick.name()
    }

    fn is_attached(&self) -> bool {
        self.joystick.attached()
    }

    fn num_buttons(&self) -> u32 {
        self.joystick.num_buttons()
    }

    fn num_hats(&self) -> u32 {
        self.joystick.num_hats()
    }

    fn axis(&self, index: u32) -> i16 {
        self.joystick.axis(index).unwrap_or(0)
    }

    fn button(&self, index: u32) -> bool {
        self.joystick.button(index).unwrap_or(false)
    }

    fn hat(&self) -> u8 {
        let state = self.joystick.hat(0).unwrap_or(HatState::Centered);
        match state {
            HatState::Centered => 0,
            HatState::Up => HAT_UP,
            HatState::Right => HAT_RIGHT,
            HatState::Down => HAT_DOWN,
            HatState::Left => HAT_LEFT,
            HatState::RightUp => HAT_RIGHT | HAT_UP,
            HatState::RightDown => HAT_RIGHT | HAT_DOWN,
            HatState::LeftUp => HAT_LEFT | HAT_UP,
            HatState::LeftDown => HAT_LEFT | HAT_DOWN,
        }
    }
}
