//! Player and display message handlers

use crate::engine::RoundEngine;
use crate::money;
use crate::protocol::{RoomView, ServerMessage};
use crate::types::Role;
use std::sync::Arc;

pub async fn handle_join(
    engine: &Arc<RoundEngine>,
    code: String,
    player_id: Option<String>,
    name: String,
) -> Option<ServerMessage> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Some(ServerMessage::Error {
            code: "INVALID_NAME".to_string(),
            msg: "display name must not be empty".to_string(),
        });
    }
    let code = code.trim().to_uppercase();
    let player_id = player_id.unwrap_or_else(|| ulid::Ulid::new().to_string());

    match engine.join_room(&code, player_id, name).await {
        Ok(player) => {
            tracing::info!("{} joined room {}", player.name, code);
            Some(ServerMessage::Joined { code, player })
        }
        Err(e) => Some(ServerMessage::Error {
            code: "JOIN_FAILED".to_string(),
            msg: e.to_string(),
        }),
    }
}

pub async fn handle_watch(
    engine: &Arc<RoundEngine>,
    code: String,
    role: &Role,
) -> Option<ServerMessage> {
    let code = code.trim().to_uppercase();
    let server_now = chrono::Utc::now().to_rfc3339();
    match engine.room(&code).await {
        Ok(Some(room)) => Some(if *role == Role::Host {
            ServerMessage::HostRoomState { room, server_now }
        } else {
            ServerMessage::RoomState {
                view: RoomView::redacted(&room, None),
                server_now,
            }
        }),
        Ok(None) => Some(ServerMessage::Error {
            code: "ROOM_NOT_FOUND".to_string(),
            msg: format!("room {} not found", code),
        }),
        Err(e) => Some(ServerMessage::Error {
            code: "STORE_ERROR".to_string(),
            msg: e.to_string(),
        }),
    }
}

pub async fn handle_submit_guess(
    engine: &Arc<RoundEngine>,
    code: String,
    player_id: String,
    value: String,
) -> Option<ServerMessage> {
    let Some(value_cents) = money::parse_money(&value) else {
        return Some(ServerMessage::Error {
            code: "INVALID_BID".to_string(),
            msg: format!("not a number: {:?}", value),
        });
    };

    match engine.submit_guess(&code, &player_id, value_cents).await {
        Ok(Some(guess)) => Some(ServerMessage::GuessAck {
            accepted: true,
            value_cents: Some(guess.value_cents),
        }),
        // Duplicate bid or bidding closed; harmless, client resyncs.
        Ok(None) => Some(ServerMessage::GuessAck {
            accepted: false,
            value_cents: None,
        }),
        Err(e) => Some(ServerMessage::Error {
            code: "GUESS_FAILED".to_string(),
            msg: e.to_string(),
        }),
    }
}
