//! Host-only command handlers
//!
//! Authorization is checked in the dispatch layer before these run. Each
//! handler answers with a fresh full room document (hosts see prices).

use crate::engine::{EngineError, RoundEngine};
use crate::money;
use crate::protocol::ServerMessage;
use crate::types::Item;
use std::sync::Arc;

fn error(code: &str, e: impl std::fmt::Display) -> ServerMessage {
    ServerMessage::Error {
        code: code.to_string(),
        msg: e.to_string(),
    }
}

fn engine_error(e: EngineError) -> ServerMessage {
    let code = match &e {
        EngineError::RoomNotFound(_) => "ROOM_NOT_FOUND",
        EngineError::SetupLocked => "SETUP_LOCKED",
        EngineError::NoItems => "NO_ITEMS",
        EngineError::UnknownItem(_) => "UNKNOWN_ITEM",
        EngineError::Store(_) => "STORE_ERROR",
    };
    error(code, e)
}

/// Answer with the current full room document.
async fn room_state(engine: &Arc<RoundEngine>, code: &str) -> Option<ServerMessage> {
    match engine.room(code).await {
        Ok(Some(room)) => Some(ServerMessage::HostRoomState {
            room,
            server_now: chrono::Utc::now().to_rfc3339(),
        }),
        Ok(None) => Some(error("ROOM_NOT_FOUND", format!("room {} not found", code))),
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_create_room(
    engine: &Arc<RoundEngine>,
    host_id: Option<String>,
) -> Option<ServerMessage> {
    let host_id = host_id.unwrap_or_else(|| ulid::Ulid::new().to_string());
    match engine.create_room(host_id).await {
        Ok(room) => Some(ServerMessage::RoomCreated { room }),
        Err(e) => Some(engine_error(e)),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_add_item(
    engine: &Arc<RoundEngine>,
    code: String,
    name: String,
    price: String,
    image_url: Option<String>,
    note: Option<String>,
) -> Option<ServerMessage> {
    let name = name.trim().to_string();
    let Some(price_cents) = money::parse_money(&price) else {
        return Some(error("INVALID_PRICE", format!("not a price: {:?}", price)));
    };
    if name.is_empty() {
        return Some(error("INVALID_ITEM", "item name must not be empty"));
    }
    match engine
        .add_item(&code, name, price_cents, image_url, note)
        .await
    {
        Ok(_) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_edit_item(
    engine: &Arc<RoundEngine>,
    code: String,
    item_id: String,
    name: String,
    price: String,
    image_url: Option<String>,
    note: Option<String>,
) -> Option<ServerMessage> {
    let name = name.trim().to_string();
    let Some(price_cents) = money::parse_money(&price) else {
        return Some(error("INVALID_PRICE", format!("not a price: {:?}", price)));
    };
    if name.is_empty() {
        return Some(error("INVALID_ITEM", "item name must not be empty"));
    }
    let item = Item {
        id: item_id,
        name,
        price_cents,
        image_url,
        note,
    };
    match engine.edit_item(&code, item).await {
        Ok(()) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_remove_item(
    engine: &Arc<RoundEngine>,
    code: String,
    item_id: String,
) -> Option<ServerMessage> {
    match engine.remove_item(&code, &item_id).await {
        Ok(()) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_load_sample_items(
    engine: &Arc<RoundEngine>,
    code: String,
) -> Option<ServerMessage> {
    match engine.load_sample_items(&code).await {
        Ok(count) => {
            tracing::info!("Loaded {} sample items into room {}", count, code);
            room_state(engine, &code).await
        }
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_mark_practice_item(
    engine: &Arc<RoundEngine>,
    code: String,
    item_id: String,
) -> Option<ServerMessage> {
    match engine.mark_practice_item(&code, &item_id).await {
        Ok(()) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_set_rule(
    engine: &Arc<RoundEngine>,
    code: String,
    rule: crate::types::Rule,
) -> Option<ServerMessage> {
    match engine.set_rule(&code, rule).await {
        Ok(()) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_set_round_duration(
    engine: &Arc<RoundEngine>,
    code: String,
    seconds: u32,
) -> Option<ServerMessage> {
    if seconds == 0 {
        return Some(error("INVALID_DURATION", "round time must be positive"));
    }
    match engine.set_round_duration(&code, seconds).await {
        Ok(()) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_finish_setup(
    engine: &Arc<RoundEngine>,
    code: String,
) -> Option<ServerMessage> {
    match engine.finish_setup(&code).await {
        Ok(()) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_start_round(engine: &Arc<RoundEngine>, code: String) -> Option<ServerMessage> {
    match engine.start_round(&code).await {
        Ok(_) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_show_item(engine: &Arc<RoundEngine>, code: String) -> Option<ServerMessage> {
    match engine.show_item(&code).await {
        Ok(_) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_reveal(engine: &Arc<RoundEngine>, code: String) -> Option<ServerMessage> {
    match engine.reveal(&code).await {
        Ok(Some(summary)) => {
            tracing::info!(
                "Room {} revealed: {} winner(s), overbid fallback: {}",
                code,
                summary.winners.len(),
                summary.overbid_fallback
            );
            room_state(engine, &code).await
        }
        // Already revealed by a racing trigger; answer with current state.
        Ok(None) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}

pub async fn handle_next_round(engine: &Arc<RoundEngine>, code: String) -> Option<ServerMessage> {
    match engine.next_round(&code).await {
        Ok(_) => room_state(engine, &code).await,
        Err(e) => Some(engine_error(e)),
    }
}
