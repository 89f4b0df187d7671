//! Bridges the reader's change stream to the wire protocol. Emits
//! delta envelopes by default and full snapshots on two schedules: a
//! wall-clock resync interval and a cap on consecutive deltas. Either
//! bound limits how far a client that silently dropped messages can
//! drift from ground truth.

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use crate::constants::{DELTA_FULL_SYNC_COUNT, FULL_SYNC_INTERVAL, SYNC_BUFFER};
use crate::gamepad::state::{compute_delta, ControllerState, DeltaChanges};

use super::message::Envelope;
use super::{ClientId, HubHandle};

/// Broadcaster commands sent from connection handlers
#[derive(Debug)]
pub enum Command {
    /// Add a client to the hub and queue its initial full-state
    /// envelope, back to back on the hub task so no delta can slip in
    /// between.
    RegisterClient {
        id: ClientId,
        tx: mpsc::Sender<String>,
    },
}

/// Returns a new broadcaster frontend and backend
pub fn new(hub: HubHandle, changes: mpsc::Receiver<ControllerState>) -> (BroadcasterHandle, Broadcaster) {
    let (tx, rx) = mpsc::channel(SYNC_BUFFER);
    let frontend = BroadcasterHandle { tx: tx.clone() };
    let backend = Broadcaster {
        changes,
        rx,
        _tx: tx,
        session: Session {
            hub,
            last_state: ControllerState::default(),
            seq: 0,
            delta_count: 0,
        },
    };
    (frontend, backend)
}

/// Cloneable frontend for sending commands to the broadcaster task
#[derive(Debug, Clone)]
pub struct BroadcasterHandle {
    tx: mpsc::Sender<Command>,
}

impl BroadcasterHandle {
    pub async fn register_client(&self, id: ClientId, tx: mpsc::Sender<String>) {
        if let Err(e) = self.tx.send(Command::RegisterClient { id, tx }).await {
            log::debug!("Broadcaster task is gone, dropping registration: {e}");
        }
    }
}

/// Broadcaster backend. Consumes the reader change stream and client
/// registrations on one task, so every envelope a client ever sees is
/// serialized in emission order.
pub struct Broadcaster {
    changes: mpsc::Receiver<ControllerState>,
    rx: mpsc::Receiver<Command>,
    // Held so `rx` can never observe a closed channel while the
    // change stream is still live
    _tx: mpsc::Sender<Command>,
    session: Session,
}

struct Session {
    hub: HubHandle,
    /// Most recent snapshot seen from the reader
    last_state: ControllerState,
    /// Monotonic envelope counter shared across full and delta frames
    seq: u64,
    /// Deltas emitted since the last full snapshot
    delta_count: u32,
}

impl Broadcaster {
    /// Runs until the reader's change channel closes
    pub async fn run(mut self) {
        let mut resync = interval(FULL_SYNC_INTERVAL);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                state = self.changes.recv() => {
                    let Some(state) = state else {
                        break;
                    };
                    self.session.handle_state(state).await;
                }
                command = self.rx.recv() => {
                    if let Some(command) = command {
                        self.session.handle_command(command).await;
                    }
                }
                _ = resync.tick() => {
                    self.session.periodic_full().await;
                }
            }
        }
        log::debug!("Change stream closed, broadcaster stopping");
    }
}

impl Session {
    async fn handle_state(&mut self, state: ControllerState) {
        let delta = compute_delta(&self.last_state, &state);
        self.last_state = state;

        // The reader already suppresses empty deltas, but the policy
        // holds regardless of who feeds the channel.
        if delta.is_empty() {
            return;
        }

        self.seq += 1;
        self.delta_count += 1;

        if self.delta_count >= DELTA_FULL_SYNC_COUNT {
            self.send_full().await;
            self.delta_count = 0;
        } else {
            self.send_delta(delta).await;
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::RegisterClient { id, tx } => {
                self.hub.register(id, tx).await;
                self.seq += 1;
                let envelope = Envelope::full(self.seq, self.last_state.clone());
                if let Some(payload) = serialize(&envelope) {
                    self.hub.send_to_client(id, payload).await;
                }
            }
        }
    }

    /// Timer-driven resync while a device is connected
    async fn periodic_full(&mut self) {
        if !self.last_state.connected {
            return;
        }
        self.seq += 1;
        self.send_full().await;
        self.delta_count = 0;
    }

    async fn send_full(&mut self) {
        let envelope = Envelope::full(self.seq, self.last_state.clone());
        let Some(payload) = serialize(&envelope) else {
            return;
        };
        self.hub
            .broadcast_to_player(payload, self.last_state.player_index)
            .await;
    }

    async fn send_delta(&mut self, changes: DeltaChanges) {
        let envelope = Envelope::delta(self.seq, changes);
        let Some(payload) = serialize(&envelope) else {
            return;
        };
        self.hub
            .broadcast_to_player(payload, self.last_state.player_index)
            .await;
    }
}

fn serialize(envelope: &Envelope) -> Option<String> {
    match serde_json::to_string(envelope) {
        Ok(payload) => Some(payload),
        Err(e) => {
            log::error!("Error serializing envelope: {e}");
            None
        }
    }
}
