//! Connection registry. Tracks live WebSocket clients and the player
//! slot each one is subscribed to, and fans wire messages out to the
//! matching audience. All membership mutation is serialized through a
//! single command channel so connect/disconnect/broadcast can never
//! race.

pub mod broadcast;
pub mod message;

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;

use crate::constants::HUB_BUFFER;

/// Unique identity of one client connection
pub type ClientId = u64;

/// Provided by the requester and used by the hub task to send the
/// response back to the requester.
type Responder<T> = oneshot::Sender<T>;

/// Hub commands define all the different ways to interact with [Hub]
/// over a channel. These commands are processed by the hub task and
/// dispatched as they come in.
#[derive(Debug)]
pub enum Command {
    Register {
        id: ClientId,
        tx: mpsc::Sender<String>,
    },
    Unregister {
        id: ClientId,
    },
    SetPlayerIndex {
        id: ClientId,
        player_index: usize,
    },
    Broadcast {
        payload: String,
        player_index: usize,
    },
    Send {
        id: ClientId,
        payload: String,
    },
    ClientCount {
        resp: Responder<usize>,
    },
}

struct ClientEntry {
    tx: mpsc::Sender<String>,
    player_index: usize,
}

/// Returns a new hub frontend and backend
pub fn new() -> (HubHandle, Hub) {
    let (tx, rx) = mpsc::channel(HUB_BUFFER);
    let frontend = HubHandle { tx };
    let backend = Hub {
        rx,
        clients: HashMap::new(),
    };
    (frontend, backend)
}

/// Cloneable frontend for sending commands to the hub task
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<Command>,
}

impl HubHandle {
    /// Add a client to the live set. New clients observe player slot 1
    /// until they select otherwise.
    pub async fn register(&self, id: ClientId, tx: mpsc::Sender<String>) {
        self.send(Command::Register { id, tx }).await;
    }

    /// Remove a client from the live set. Idempotent.
    pub async fn unregister(&self, id: ClientId) {
        self.send(Command::Unregister { id }).await;
    }

    /// Change which player slot a client is subscribed to
    pub async fn set_player_index(&self, id: ClientId, player_index: usize) {
        self.send(Command::SetPlayerIndex { id, player_index }).await;
    }

    /// Deliver a serialized message to every client subscribed to the
    /// given player slot.
    pub async fn broadcast_to_player(&self, payload: String, player_index: usize) {
        self.send(Command::Broadcast {
            payload,
            player_index,
        })
        .await;
    }

    /// Deliver a serialized message to one client. Serialized with
    /// broadcasts on the hub task, so per-client ordering holds across
    /// both paths.
    pub async fn send_to_client(&self, id: ClientId, payload: String) {
        self.send(Command::Send { id, payload }).await;
    }

    /// Number of clients in the live set
    pub async fn client_count(&self) -> usize {
        let (resp, rx) = oneshot::channel();
        self.send(Command::ClientCount { resp }).await;
        rx.await.unwrap_or(0)
    }

    async fn send(&self, command: Command) {
        if let Err(e) = self.tx.send(command).await {
            log::debug!("Hub task is gone, dropping command: {e}");
        }
    }
}

/// Client registry backend. Owns the live client set exclusively; all
/// mutation happens on the hub task.
pub struct Hub {
    rx: mpsc::Receiver<Command>,
    clients: HashMap<ClientId, ClientEntry>,
}

impl Hub {
    /// Process commands until every [HubHandle] is dropped
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
        log::debug!("Hub command channel closed");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register { id, tx } => {
                self.clients.insert(id, ClientEntry { tx, player_index: 1 });
                log::info!("Client {id} connected (total: {})", self.clients.len());
            }
            Command::Unregister { id } => {
                if self.clients.remove(&id).is_some() {
                    log::info!("Client {id} disconnected (total: {})", self.clients.len());
                }
            }
            Command::SetPlayerIndex { id, player_index } => {
                if let Some(entry) = self.clients.get_mut(&id) {
                    entry.player_index = player_index;
                }
            }
            Command::Broadcast {
                payload,
                player_index,
            } => self.broadcast(payload, player_index),
            Command::Send { id, payload } => self.send_to(id, payload),
            Command::ClientCount { resp } => {
                let _ = resp.send(self.clients.len());
            }
        }
    }

    fn broadcast(&mut self, payload: String, player_index: usize) {
        let mut evicted = Vec::new();
        for (id, entry) in self.clients.iter() {
            if entry.player_index != player_index {
                continue;
            }
            match entry.tx.try_send(payload.clone()) {
                Ok(()) => (),
                Err(TrySendError::Full(_)) => {
                    // An unresponsive client must not stall delivery
                    // to anyone else.
                    log::warn!("Client {id} outbound queue full, evicting");
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    evicted.push(*id);
                }
            }
        }
        for id in evicted {
            self.clients.remove(&id);
            log::info!("Client {id} removed (total: {})", self.clients.len());
        }
    }

    fn send_to(&mut self, id: ClientId, payload: String) {
        let delivered = match self.clients.get(&id) {
            Some(entry) => match entry.tx.try_send(payload) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    log::warn!("Client {id} outbound queue full, evicting");
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            },
            None => true,
        };
        if !delivered {
            self.clients.remove(&id);
            log::info!("Client {id} removed (total: {})", self.clients.len());
        }
    }
}
