use rand::Rng;
use std::collections::HashMap;

use super::{EngineError, RoundEngine};
use crate::store::StoreError;
use crate::types::*;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

const DEFAULT_ROUND_DURATION_SECS: u32 = 35;

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

impl RoundEngine {
    /// Create a room in setup under a fresh code, with the full prize pool.
    pub async fn create_room(&self, host_id: PlayerId) -> Result<Room, EngineError> {
        loop {
            let room = Room {
                code: generate_room_code(),
                version: 0,
                created_at: self.clock().now(),
                host_id: host_id.clone(),
                status: RoomStatus::Setup,
                rule: Rule::ClosestWithoutOver,
                round_index: 0,
                round_ends_at: None,
                round_duration_secs: DEFAULT_ROUND_DURATION_SECS,
                is_setup_done: false,
                practice_item: None,
                practice_active: false,
                items: Vec::new(),
                players: HashMap::new(),
                guesses: HashMap::new(),
                scores: HashMap::new(),
                prizes: HashMap::new(),
                prize_pool: super::prize::full_pool(),
                current_prize: None,
                last_winner_ids: None,
            };
            match self.store().create(room.clone()).await {
                Ok(()) => {
                    tracing::info!("Created room {}", room.code);
                    return Ok(room);
                }
                // Collision - try again (extremely rare with 28M combinations)
                Err(StoreError::AlreadyExists) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Add (or refresh) a player. Players can join in any phase and are
    /// never removed for the lifetime of the room.
    pub async fn join_room(
        &self,
        code: &str,
        player_id: PlayerId,
        name: String,
    ) -> Result<Player, EngineError> {
        let now = self.clock().now();
        let joined = self
            .mutate(code, |room| {
                let player = Player {
                    id: player_id.clone(),
                    name: name.clone(),
                    joined_at: now,
                };
                room.players.insert(player_id.clone(), player.clone());
                Ok(Some(player))
            })
            .await?;
        // The closure always writes, so this is always Some.
        Ok(joined.expect("join always applies"))
    }
}
