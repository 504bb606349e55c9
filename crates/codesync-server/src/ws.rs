//! The collaboration channel: `/ws/{room_id}`.
//!
//! Frames are opaque text — the hub relays the collaborative document
//! state without inspecting it. Each connection owns two halves: a writer
//! task draining the peer's broadcast channel into the socket, and the
//! read loop below, which feeds inbound frames to the hub. Both graceful
//! close and a mid-receive error funnel into exactly one `leave`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::hub::CollaborationHub;
use crate::{AppState, ExecutionHandler};

pub async fn collaboration_handler<T: ExecutionHandler>(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(state): State<AppState<T>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, state.hub))
}

async fn handle_socket(mut socket: WebSocket, room_id: String, hub: Arc<CollaborationHub>) {
    let (sender, mut outbound) = mpsc::unbounded_channel::<String>();
    let peer_id = match hub.join(&room_id, sender).await {
        Ok(id) => id,
        Err(e) => {
            log::warn!("rejecting connection: {}", e);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    log::info!("peer {} joined session '{}'", peer_id, room_id);

    let (mut sink, mut stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => hub.broadcast(&room_id, peer_id, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            // Axum answers pings itself; binary frames are not part of
            // the protocol.
            Ok(_) => {}
            Err(e) => {
                log::debug!("peer {} receive error: {}", peer_id, e);
                break;
            }
        }
    }

    hub.leave(&room_id, peer_id).await;
    writer.abort();
    log::info!("peer {} left session '{}'", peer_id, room_id);
}
