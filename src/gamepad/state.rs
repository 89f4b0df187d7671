use serde::{Deserialize, Serialize};

use crate::constants::ANALOG_TOLERANCE;

/// 2D position of an analog stick, each component in [-1.0, 1.0]
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

/// State of a single analog stick
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StickState {
    pub position: Vector,
    pub pressed: bool,
}

/// State of a single analog trigger, value in [0.0, 1.0]
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerState {
    pub value: f64,
}

/// Digital face/shoulder/menu button states
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ButtonState {
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub lb: bool,
    pub rb: bool,
    pub select: bool,
    pub start: bool,
    pub home: bool,
}

/// Directional pad (hat) state
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DpadState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Both analog sticks. Stick clicks (L3/R3) live here, not in
/// [ButtonState].
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SticksState {
    pub left: StickState,
    pub right: StickState,
}

/// Both analog triggers
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggersState {
    pub lt: TriggerState,
    pub rt: TriggerState,
}

/// Canonical snapshot of one controller's inputs after normalization,
/// inversion, and deadzone have been applied.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerState {
    pub connected: bool,
    /// Mapping profile name, e.g. "xbox", "playstation", "generic"
    pub controller_type: String,
    /// Human-readable device name
    pub name: String,
    pub buttons: ButtonState,
    pub dpad: DpadState,
    pub sticks: SticksState,
    pub triggers: TriggersState,
    /// 1-based ordinal among connected devices
    pub player_index: usize,
}

/// Sparse diff between two [ControllerState] snapshots. Each field is
/// absent when unchanged since the last emitted snapshot.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<ButtonState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpad: Option<DpadState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticks: Option<SticksState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggers: Option<TriggersState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_index: Option<usize>,
}

impl DeltaChanges {
    /// Returns true if no field changed. Empty deltas are suppressed
    /// before they ever reach the broadcaster.
    pub fn is_empty(&self) -> bool {
        self.connected.is_none()
            && self.controller_type.is_none()
            && self.name.is_none()
            && self.buttons.is_none()
            && self.dpad.is_none()
            && self.sticks.is_none()
            && self.triggers.is_none()
            && self.player_index.is_none()
    }
}

/// Returns true if two normalized analog values are within the noise
/// tolerance of each other.
fn analog_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < ANALOG_TOLERANCE
}

/// Computes the sparse diff between two snapshots. Digital fields use
/// value equality; stick positions and trigger values only count as
/// changed beyond [ANALOG_TOLERANCE].
pub fn compute_delta(old: &ControllerState, new: &ControllerState) -> DeltaChanges {
    let mut delta = DeltaChanges::default();

    if old.connected != new.connected {
        delta.connected = Some(new.connected);
    }
    if old.controller_type != new.controller_type {
        delta.controller_type = Some(new.controller_type.clone());
    }
    if old.name != new.name {
        delta.name = Some(new.name.clone());
    }
    if old.buttons != new.buttons {
        delta.buttons = Some(new.buttons);
    }
    if old.dpad != new.dpad {
        delta.dpad = Some(new.dpad);
    }
    if old.player_index != new.player_index {
        delta.player_index = Some(new.player_index);
    }

    if !analog_eq(old.sticks.left.position.x, new.sticks.left.position.x)
        || !analog_eq(old.sticks.left.position.y, new.sticks.left.position.y)
        || old.sticks.left.pressed != new.sticks.left.pressed
        || !analog_eq(old.sticks.right.position.x, new.sticks.right.position.x)
        || !analog_eq(old.sticks.right.position.y, new.sticks.right.position.y)
        || old.sticks.right.pressed != new.sticks.right.pressed
    {
        delta.sticks = Some(new.sticks);
    }

    if !analog_eq(old.triggers.lt.value, new.triggers.lt.value)
        || !analog_eq(old.triggers.rt.value, new.triggers.rt.value)
    {
        delta.triggers = Some(new.triggers);
    }

    delta
}
