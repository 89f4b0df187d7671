//! Static lookup from a device's vendor/product ID pair to the mapping
//! profile that translates raw axis/button indices into semantic
//! fields. Unknown devices never fail to resolve, they degrade to the
//! generic profile.

/// Microsoft vendor ID
pub const XBOX_VID: u16 = 0x045E;
/// Xbox 360 / Xbox One / Xbox Series controllers
pub const XBOX_PIDS: [u16; 6] = [0x028E, 0x02D1, 0x02DD, 0x02E3, 0x02EA, 0x0B12];

/// Sony vendor ID
pub const PLAYSTATION_VID: u16 = 0x054C;
/// DualShock 4 (v1/v2) and DualSense controllers
pub const PLAYSTATION_PIDS: [u16; 3] = [0x05C4, 0x09CC, 0x0CE6];

/// Semantic destination of a mapped axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisTarget {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

impl AxisTarget {
    /// Triggers normalize to [0.0, 1.0] rather than [-1.0, 1.0]
    pub fn is_trigger(&self) -> bool {
        matches!(self, AxisTarget::LeftTrigger | AxisTarget::RightTrigger)
    }
}

/// Semantic destination of a mapped button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTarget {
    A,
    B,
    X,
    Y,
    LB,
    RB,
    Select,
    Start,
    Home,
    /// Left stick click (L3)
    LeftStick,
    /// Right stick click (R3)
    RightStick,
}

/// How a raw axis index maps to a semantic field
#[derive(Debug, Clone, Copy)]
pub struct AxisMapping {
    pub index: u32,
    pub target: AxisTarget,
    pub invert: bool,
    /// Raw range for triggers. Some devices report -32768..32767,
    /// others 0..32767.
    pub raw_min: i16,
    pub raw_max: i16,
}

/// How a raw button index maps to a semantic button
#[derive(Debug, Clone, Copy)]
pub struct ButtonMapping {
    pub index: u32,
    pub target: ButtonTarget,
}

/// Complete mapping profile for one device model. Constructed once as
/// static data and never mutated.
#[derive(Debug)]
pub struct DeviceMapping {
    pub name: &'static str,
    pub axes: &'static [AxisMapping],
    pub buttons: &'static [ButtonMapping],
    pub has_hat: bool,
}

const fn axis(index: u32, target: AxisTarget) -> AxisMapping {
    AxisMapping {
        index,
        target,
        invert: false,
        raw_min: i16::MIN,
        raw_max: i16::MAX,
    }
}

const fn button(index: u32, target: ButtonTarget) -> ButtonMapping {
    ButtonMapping { index, target }
}

/// XInput-style axis layout as exposed by the SDL joystick API
const XINPUT_AXES: &[AxisMapping] = &[
    axis(0, AxisTarget::LeftX),
    axis(1, AxisTarget::LeftY),
    axis(2, AxisTarget::LeftTrigger),
    axis(3, AxisTarget::RightX),
    axis(4, AxisTarget::RightY),
    axis(5, AxisTarget::RightTrigger),
];

const XINPUT_BUTTONS: &[ButtonMapping] = &[
    button(0, ButtonTarget::A),
    button(1, ButtonTarget::B),
    button(2, ButtonTarget::X),
    button(3, ButtonTarget::Y),
    button(4, ButtonTarget::LB),
    button(5, ButtonTarget::RB),
    button(6, ButtonTarget::Select),
    button(7, ButtonTarget::Start),
    button(8, ButtonTarget::Home),
    button(9, ButtonTarget::LeftStick),
    button(10, ButtonTarget::RightStick),
];

static XBOX: DeviceMapping = DeviceMapping {
    name: "xbox",
    axes: XINPUT_AXES,
    buttons: XINPUT_BUTTONS,
    has_hat: true,
};

/// DualShock 4 / DualSense HID layout. Face buttons are reported in
/// cross/circle/triangle/square order; the right stick Y sits at axis 5.
static PLAYSTATION: DeviceMapping = DeviceMapping {
    name: "playstation",
    axes: &[
        axis(0, AxisTarget::LeftX),
        axis(1, AxisTarget::LeftY),
        axis(2, AxisTarget::RightX),
        axis(3, AxisTarget::LeftTrigger),
        axis(4, AxisTarget::RightTrigger),
        axis(5, AxisTarget::RightY),
    ],
    buttons: &[
        button(0, ButtonTarget::A),
        button(1, ButtonTarget::B),
        button(2, ButtonTarget::Y),
        button(3, ButtonTarget::X),
        button(4, ButtonTarget::LB),
        button(5, ButtonTarget::RB),
        button(8, ButtonTarget::Select),
        button(9, ButtonTarget::Start),
        button(10, ButtonTarget::Home),
        button(11, ButtonTarget::LeftStick),
        button(12, ButtonTarget::RightStick),
    ],
    has_hat: true,
};

/// Fallback for unrecognized devices: two sticks, two analog triggers,
/// the common 11-button layout, and a hat.
static GENERIC: DeviceMapping = DeviceMapping {
    name: "generic",
    axes: XINPUT_AXES,
    buttons: XINPUT_BUTTONS,
    has_hat: true,
};

/// Returns the mapping profile for a device identified by its
/// vendor/product ID pair. Unknown pairs resolve to the generic
/// profile; there is no error path.
pub fn resolve(vendor_id: u16, product_id: u16) -> &'static DeviceMapping {
    match vendor_id {
        XBOX_VID if XBOX_PIDS.contains(&product_id) => &XBOX,
        PLAYSTATION_VID if PLAYSTATION_PIDS.contains(&product_id) => &PLAYSTATION,
        _ => &GENERIC,
    }
}

/// Converts a raw axis value (-32768..32767) to [-1.0, 1.0]. The
/// asymmetric i16 range is clamped so the negative extreme never
/// produces a value below -1.0.
pub fn normalize_axis(raw: i16) -> f64 {
    let value = f64::from(raw) / f64::from(i16::MAX);
    value.max(-1.0)
}

/// Converts a raw trigger value within [raw_min, raw_max] to
/// [0.0, 1.0], clamped. A degenerate range normalizes to 0.
pub fn normalize_trigger(raw: i16, raw_min: i16, raw_max: i16) -> f64 {
    if raw_max == raw_min {
        return 0.0;
    }
    let value = f64::from(i32::from(raw) - i32::from(raw_min))
        / f64::from(i32::from(raw_max) - i32::from(raw_min));
    value.clamp(0.0, 1.0)
}

/// Forces values within the deadzone threshold to zero; everything
/// else passes through unchanged.
pub fn apply_deadzone(value: f64, threshold: f64) -> f64 {
    if value.abs() < threshold {
        0.0
    } else {
        value
    }
}
