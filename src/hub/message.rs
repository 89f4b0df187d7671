//! Wire protocol envelopes. The message set is closed on both
//! directions; unrecognized inbound types deserialize to [Unknown] and
//! are ignored at the boundary.

use serde::{Deserialize, Serialize};

use crate::gamepad::state::{ControllerState, DeltaChanges};

/// Server -> client envelope. `seq` is a process-lifetime monotonic
/// counter shared across full and delta envelopes so clients can
/// detect gaps; `timestamp` is milliseconds since epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    Full {
        seq: u64,
        timestamp: i64,
        data: ControllerState,
    },
    Delta {
        seq: u64,
        timestamp: i64,
        changes: DeltaChanges,
    },
    PlayerSelected {
        seq: u64,
        timestamp: i64,
        #[serde(rename = "playerIndex")]
        player_index: usize,
    },
}

impl Envelope {
    /// Complete snapshot, used to (re)establish ground truth
    pub fn full(seq: u64, data: ControllerState) -> Self {
        Envelope::Full {
            seq,
            timestamp: now_millis(),
            data,
        }
    }

    /// Sparse diff since the last emitted snapshot
    pub fn delta(seq: u64, changes: DeltaChanges) -> Self {
        Envelope::Delta {
            seq,
            timestamp: now_millis(),
            changes,
        }
    }

    /// Confirmation of a device-selection request. Not part of the
    /// state stream, so it carries seq 0.
    pub fn player_selected(player_index: usize) -> Self {
        Envelope::PlayerSelected {
            seq: 0,
            timestamp: now_millis(),
            player_index,
        }
    }
}

/// Client -> server message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request to observe a different device by connection-order
    /// ordinal
    SelectPlayer {
        #[serde(rename = "playerIndex")]
        player_index: usize,
    },
    /// Any message type this server does not recognize
    #[serde(other)]
    Unknown,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
