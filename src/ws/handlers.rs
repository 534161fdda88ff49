//! WebSocket message dispatch
//!
//! Entry point for all client messages. Host authorization is checked
//! here, then the message is passed to the role-specific handler module.

use crate::engine::RoundEngine;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::Role;
use std::sync::Arc;

use super::{host, player};

/// Macro to check host authorization and return early if unauthorized
macro_rules! check_host {
    ($role:expr, $action:expr) => {
        if *$role != Role::Host {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only the host can {}", $action),
            });
        }
    };
}

/// Handle a client message and return the direct response, if any. Room
/// state fan-out happens separately through the store subscription.
pub async fn handle_message(
    msg: ClientMessage,
    role: &Role,
    engine: &Arc<RoundEngine>,
) -> Option<ServerMessage> {
    match msg {
        // Player (and display) messages
        ClientMessage::Join {
            code,
            player_id,
            name,
        } => player::handle_join(engine, code, player_id, name).await,

        ClientMessage::Watch { code } => player::handle_watch(engine, code, role).await,

        ClientMessage::SubmitGuess {
            code,
            player_id,
            value,
        } => player::handle_submit_guess(engine, code, player_id, value).await,

        // Host-only messages (authorization checked before dispatch)
        ClientMessage::CreateRoom { host_id } => {
            check_host!(role, "create rooms");
            host::handle_create_room(engine, host_id).await
        }

        ClientMessage::HostAddItem {
            code,
            name,
            price,
            image_url,
            note,
        } => {
            check_host!(role, "add items");
            host::handle_add_item(engine, code, name, price, image_url, note).await
        }

        ClientMessage::HostEditItem {
            code,
            item_id,
            name,
            price,
            image_url,
            note,
        } => {
            check_host!(role, "edit items");
            host::handle_edit_item(engine, code, item_id, name, price, image_url, note).await
        }

        ClientMessage::HostRemoveItem { code, item_id } => {
            check_host!(role, "remove items");
            host::handle_remove_item(engine, code, item_id).await
        }

        ClientMessage::HostLoadSampleItems { code } => {
            check_host!(role, "load sample items");
            host::handle_load_sample_items(engine, code).await
        }

        ClientMessage::HostMarkPracticeItem { code, item_id } => {
            check_host!(role, "pick the practice item");
            host::handle_mark_practice_item(engine, code, item_id).await
        }

        ClientMessage::HostSetRule { code, rule } => {
            check_host!(role, "change the rule");
            host::handle_set_rule(engine, code, rule).await
        }

        ClientMessage::HostSetRoundDuration { code, seconds } => {
            check_host!(role, "change the round time");
            host::handle_set_round_duration(engine, code, seconds).await
        }

        ClientMessage::HostFinishSetup { code } => {
            check_host!(role, "finish setup");
            host::handle_finish_setup(engine, code).await
        }

        ClientMessage::HostStartRound { code } => {
            check_host!(role, "start rounds");
            host::handle_start_round(engine, code).await
        }

        ClientMessage::HostShowItem { code } => {
            check_host!(role, "show the item");
            host::handle_show_item(engine, code).await
        }

        ClientMessage::HostReveal { code } => {
            check_host!(role, "reveal the price");
            host::handle_reveal(engine, code).await
        }

        ClientMessage::HostNextRound { code } => {
            check_host!(role, "advance rounds");
            host::handle_next_round(engine, code).await
        }
    }
}
