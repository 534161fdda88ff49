pub mod handlers;
pub mod host;
pub mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::engine::RoundEngine;
use crate::protocol::{ClientMessage, RoomView, ServerMessage};
use crate::types::{Role, Room};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(engine): State<Arc<RoundEngine>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: role={:?}", params.role);
    ws.on_upgrade(move |socket| handle_socket(socket, params, engine))
}

/// Room attachment of one connection: where updates come from and which
/// player (if any) the redacted view is rendered for.
struct Attachment {
    code: String,
    player_id: Option<String>,
    updates: broadcast::Receiver<Room>,
}

fn snapshot_for(role: &Role, room: &Room, player_id: Option<&str>) -> ServerMessage {
    let server_now = chrono::Utc::now().to_rfc3339();
    if *role == Role::Host {
        ServerMessage::HostRoomState {
            room: room.clone(),
            server_now,
        }
    } else {
        ServerMessage::RoomState {
            view: RoomView::redacted(room, player_id),
            server_now,
        }
    }
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, engine: Arc<RoundEngine>) {
    let (mut sender, mut receiver) = socket.split();

    let role = match params.role.as_deref() {
        Some("host") => Role::Host,
        Some("player") => Role::Player,
        _ => Role::Display,
    };

    tracing::info!("WebSocket connected with role: {:?}", role);

    let welcome = ServerMessage::Welcome {
        protocol: "1.0".to_string(),
        role,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    let mut attachment: Option<Attachment> = None;

    loop {
        tokio::select! {
            // Room updates fanned out from the store subscription
            update = async {
                match &mut attachment {
                    Some(a) => Some(a.updates.recv().await),
                    // Not attached to a room yet: wait forever
                    None => std::future::pending().await,
                }
            } => {
                match update {
                    Some(Ok(room)) => {
                        let viewer = attachment.as_ref().and_then(|a| a.player_id.as_deref());
                        let msg = snapshot_for(&role, &room, viewer);
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    // Fell behind the update stream; resync from the store.
                    Some(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        tracing::warn!("Connection lagged {} room updates, resyncing", skipped);
                        if let Some(a) = &attachment {
                            if let Ok(Some(room)) = engine.room(&a.code).await {
                                let msg = snapshot_for(&role, &room, a.player_id.as_deref());
                                if let Ok(json) = serde_json::to_string(&msg) {
                                    if sender.send(Message::Text(json.into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    }
                    Some(Err(broadcast::error::RecvError::Closed)) => {
                        attachment = None;
                    }
                    None => unreachable!("pending future never resolves"),
                }
            }

            // Client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                let response =
                                    handlers::handle_message(client_msg, &role, &engine).await;

                                // A successful create/join/watch pins this
                                // connection to that room's update stream.
                                let target = attach_target(&response).filter(|(code, player_id)| {
                                    attachment.as_ref().map(|a| (&a.code, &a.player_id))
                                        != Some((code, player_id))
                                });
                                if let Some((code, player_id)) = target {
                                    match engine.subscribe(&code).await {
                                        Ok(updates) => {
                                            attachment = Some(Attachment {
                                                code,
                                                player_id,
                                                updates,
                                            });
                                        }
                                        Err(e) => {
                                            tracing::error!("Failed to subscribe to {}: {}", code, e);
                                        }
                                    }
                                }

                                if let Some(response) = response {
                                    if let Ok(json) = serde_json::to_string(&response) {
                                        if sender.send(Message::Text(json.into())).await.is_err() {
                                            tracing::error!("Failed to send response");
                                            break;
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!("WebSocket connection closed for role: {:?}", role);
}

/// Which room (and viewer) a response implies this connection follows.
fn attach_target(response: &Option<ServerMessage>) -> Option<(String, Option<String>)> {
    match response {
        Some(ServerMessage::RoomCreated { room }) => Some((room.code.clone(), None)),
        Some(ServerMessage::Joined { code, player }) => {
            Some((code.clone(), Some(player.id.clone())))
        }
        Some(ServerMessage::HostRoomState { room, .. }) => Some((room.code.clone(), None)),
        Some(ServerMessage::RoomState { view, .. }) => Some((view.code.clone(), None)),
        _ => None,
    }
}
