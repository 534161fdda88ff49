use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for type safety
pub type RoomCode = String;
pub type PlayerId = String;
pub type ItemId = String;

/// Round key for the practice round; real rounds key by their index.
pub const PRACTICE_ROUND_KEY: &str = "practice";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Setup,
    Lobby,
    ShowingPrize,
    InRound,
    Revealed,
    Finished,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    ClosestWithoutOver,
    ClosestOverall,
}

/// An item up for bids. `price_cents` is the actual retail price,
/// hidden from players until the round is revealed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub joined_at: DateTime<Utc>,
}

/// One locked-in bid. At most one per (player, round key).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Guess {
    pub player_id: PlayerId,
    pub player_name: String,
    pub value_cents: i64,
    pub ts: DateTime<Utc>,
}

/// The entire shared game session document, identified by a short code.
///
/// Every write bumps `version`; stores commit a write only when the
/// caller's expected version still matches (see `SharedStateStore`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub code: RoomCode,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub host_id: PlayerId,
    pub status: RoomStatus,
    pub rule: Rule,
    pub round_index: usize,
    pub round_ends_at: Option<DateTime<Utc>>,
    pub round_duration_secs: u32,
    #[serde(default)]
    pub is_setup_done: bool,
    /// Practice item pulled out of the lineup; its round is never scored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_item: Option<Item>,
    #[serde(default)]
    pub practice_active: bool,
    pub items: Vec<Item>,
    #[serde(default)]
    pub players: HashMap<PlayerId, Player>,
    /// round key -> player id -> guess
    #[serde(default)]
    pub guesses: HashMap<String, HashMap<PlayerId, Guess>>,
    #[serde(default)]
    pub scores: HashMap<PlayerId, u32>,
    /// player id -> prize tokens won
    #[serde(default)]
    pub prizes: HashMap<PlayerId, Vec<String>>,
    #[serde(default)]
    pub prize_pool: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_prize: Option<String>,
    /// Winners of the most recently revealed round; recomputed fresh at
    /// every reveal, never incrementally updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_winner_ids: Option<Vec<PlayerId>>,
}

impl Room {
    /// Key under which the current round's guesses live.
    pub fn round_key(&self) -> String {
        if self.practice_active {
            PRACTICE_ROUND_KEY.to_string()
        } else {
            self.round_index.to_string()
        }
    }

    /// Item currently on stage (practice item during a practice round).
    pub fn current_item(&self) -> Option<&Item> {
        if self.practice_active {
            self.practice_item.as_ref()
        } else {
            self.items.get(self.round_index)
        }
    }

    /// Guesses for the current round, sorted by submission time.
    pub fn current_guesses(&self) -> Vec<Guess> {
        let mut list: Vec<Guess> = self
            .guesses
            .get(&self.round_key())
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        list.sort_by_key(|g| g.ts);
        list
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Player,
    Display,
}
