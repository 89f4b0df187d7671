//! HTTP surface: the `/ws` WebSocket endpoint and the static frontend.
//! Connection handlers are thin; they wire a client's queue into the
//! hub, request its initial sync, and relay `select_player` requests
//! to the reader.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_http::services::ServeDir;

use crate::constants::CLIENT_BUFFER;
use crate::gamepad::reader::ReaderHandle;
use crate::hub::broadcast::BroadcasterHandle;
use crate::hub::message::{ClientMessage, Envelope};
use crate::hub::{ClientId, HubHandle};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Handles shared by every connection handler
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub broadcaster: BroadcasterHandle,
    pub reader: ReaderHandle,
}

/// Builds the application router: WebSocket endpoint at `/ws`, static
/// frontend assets everywhere else.
pub fn router(state: AppState, frontend_dir: PathBuf) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(frontend_dir))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-client connection loop. The write pump drains the client's
/// outbound queue to the socket on its own task; this task reads
/// inbound messages until the connection drops or the queue closes.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
    let (tx, mut rx) = mpsc::channel::<String>(CLIENT_BUFFER);

    // The hub owns the only sender after this point: once it evicts
    // this client, the queue closes, the write pump exits, and the
    // connection comes down.
    state.broadcaster.register_client(id, tx).await;

    let (mut sink, mut stream) = socket.split();
    let mut write_pump = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            // Queue closed after eviction, or the socket write failed
            _ = &mut write_pump => break,
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(id, &text, &state).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => (),
                    Some(Err(e)) => {
                        log::debug!("Client {id} read error: {e}");
                        break;
                    }
                }
            }
        }
    }

    state.hub.unregister(id).await;
    write_pump.abort();
}

/// Dispatches one inbound client message. Malformed or unrecognized
/// messages are logged and ignored; the connection stays open.
async fn handle_client_message(id: ClientId, text: &str, state: &AppState) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::SelectPlayer { player_index }) => {
            if !state.reader.set_active_by_player_index(player_index) {
                // Benign race with device attach/detach, not a client
                // error. No confirmation, no state change.
                log::debug!("Client {id} requested player {player_index}, no device at that slot");
                return;
            }
            state.hub.set_player_index(id, player_index).await;
            match serde_json::to_string(&Envelope::player_selected(player_index)) {
                Ok(payload) => state.hub.send_to_client(id, payload).await,
                Err(e) => log::error!("Error serializing confirmation: {e}"),
            }
            log::info!("Client {id} switched to player {player_index}");
        }
        Ok(ClientMessage::Unknown) => {
            log::debug!("Client {id} sent unrecognized message type");
        }
        Err(e) => {
            log::debug!("Error parsing client message: {e}");
        }
    }
}
