use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::compute_winners;
use crate::types::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a room as host. A host id is minted when none is supplied.
    CreateRoom {
        host_id: Option<PlayerId>,
    },
    /// Join (or rejoin) a room as a player.
    Join {
        code: RoomCode,
        player_id: Option<PlayerId>,
        name: String,
    },
    /// Attach to a room read-only (display screens, reconnecting hosts).
    Watch {
        code: RoomCode,
    },
    /// Lock in a bid. `value` is a free-form money string ("24.99").
    SubmitGuess {
        code: RoomCode,
        player_id: PlayerId,
        value: String,
    },
    // Host-only messages
    HostAddItem {
        code: RoomCode,
        name: String,
        price: String,
        image_url: Option<String>,
        note: Option<String>,
    },
    HostEditItem {
        code: RoomCode,
        item_id: ItemId,
        name: String,
        price: String,
        image_url: Option<String>,
        note: Option<String>,
    },
    HostRemoveItem {
        code: RoomCode,
        item_id: ItemId,
    },
    HostLoadSampleItems {
        code: RoomCode,
    },
    HostMarkPracticeItem {
        code: RoomCode,
        item_id: ItemId,
    },
    HostSetRule {
        code: RoomCode,
        rule: Rule,
    },
    HostSetRoundDuration {
        code: RoomCode,
        seconds: u32,
    },
    HostFinishSetup {
        code: RoomCode,
    },
    HostStartRound {
        code: RoomCode,
    },
    HostShowItem {
        code: RoomCode,
    },
    HostReveal {
        code: RoomCode,
    },
    HostNextRound {
        code: RoomCode,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        server_now: String,
    },
    RoomCreated {
        room: Room,
    },
    Joined {
        code: RoomCode,
        player: Player,
    },
    /// Bid response. `accepted: false` covers both duplicate bids and
    /// bids outside the bidding window; neither is an error.
    GuessAck {
        accepted: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        value_cents: Option<i64>,
    },
    /// Full document, host connections only.
    HostRoomState {
        room: Room,
        server_now: String,
    },
    /// Redacted snapshot for players and displays.
    RoomState {
        view: RoomView,
        server_now: String,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Item as players see it: the price shows up only once its round is over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemView {
    pub id: ItemId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
}

impl ItemView {
    fn from_item(item: &Item, price_visible: bool) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            note: item.note.clone(),
            price_cents: price_visible.then_some(item.price_cents),
        }
    }
}

/// Scoreboard line. `has_bid` refers to the current round; bid values
/// stay hidden here even from the host until the reveal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub prizes: Vec<String>,
    pub has_bid: bool,
}

/// A concluded round with everything out in the open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealedRound {
    pub index: usize,
    pub item: ItemView,
    pub guesses: Vec<Guess>,
    pub winner_ids: Vec<PlayerId>,
    pub overbid_fallback: bool,
}

/// What a player or display client gets on every sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    pub code: RoomCode,
    pub status: RoomStatus,
    pub rule: Rule,
    pub round_index: usize,
    pub round_ends_at: Option<DateTime<Utc>>,
    pub round_duration_secs: u32,
    pub is_setup_done: bool,
    pub practice_active: bool,
    pub item_count: usize,
    pub current_item: Option<ItemView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_prize: Option<String>,
    pub players: Vec<PlayerSummary>,
    pub revealed_rounds: Vec<RevealedRound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_winner_ids: Option<Vec<PlayerId>>,
    /// The viewer's own locked-in bid for the current round, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_bid_cents: Option<i64>,
}

impl RoomView {
    /// Build the spoiler-free snapshot. The current item's price and the
    /// current round's bid values are held back until the round status
    /// reaches `REVEALED`; only the viewer's own bid is echoed.
    pub fn redacted(room: &Room, viewer: Option<&str>) -> Self {
        let round_concluded = matches!(room.status, RoomStatus::Revealed | RoomStatus::Finished);
        let current_item = room
            .current_item()
            .map(|item| ItemView::from_item(item, round_concluded));

        let round_key = room.round_key();
        let current_bidders = room.guesses.get(&round_key);
        let my_bid_cents = viewer.and_then(|id| {
            current_bidders
                .and_then(|m| m.get(id))
                .map(|g| g.value_cents)
        });

        let mut players: Vec<PlayerSummary> = room
            .players
            .values()
            .map(|p| PlayerSummary {
                id: p.id.clone(),
                name: p.name.clone(),
                score: room.scores.get(&p.id).copied().unwrap_or(0),
                prizes: room.prizes.get(&p.id).cloned().unwrap_or_default(),
                has_bid: current_bidders
                    .map(|m| m.contains_key(&p.id))
                    .unwrap_or(false),
            })
            .collect();
        players.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

        Self {
            code: room.code.clone(),
            status: room.status,
            rule: room.rule,
            round_index: room.round_index,
            round_ends_at: room.round_ends_at,
            round_duration_secs: room.round_duration_secs,
            is_setup_done: room.is_setup_done,
            practice_active: room.practice_active,
            item_count: room.items.len(),
            current_item,
            current_prize: room.current_prize.clone(),
            players,
            revealed_rounds: revealed_rounds(room),
            last_winner_ids: room.last_winner_ids.clone(),
            my_bid_cents,
        }
    }
}

/// All real rounds whose price is public, oldest first. Empty during the
/// practice round: nothing real has concluded yet.
fn revealed_rounds(room: &Room) -> Vec<RevealedRound> {
    if room.practice_active || room.items.is_empty() {
        return Vec::new();
    }
    let max_shown: i64 = match room.status {
        RoomStatus::Finished => room.items.len() as i64 - 1,
        RoomStatus::Revealed => room.round_index as i64,
        _ => room.round_index as i64 - 1,
    };
    if max_shown < 0 {
        return Vec::new();
    }
    let mut rounds = Vec::new();
    for index in 0..=max_shown as usize {
        let Some(item) = room.items.get(index) else {
            continue;
        };
        let mut guesses: Vec<Guess> = room
            .guesses
            .get(&index.to_string())
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        guesses.sort_by_key(|g| g.ts);

        let overbid = room.rule == Rule::ClosestWithoutOver
            && !guesses.is_empty()
            && !guesses.iter().any(|g| g.value_cents <= item.price_cents);
        let winners = compute_winners(&guesses, item.price_cents, room.rule);

        rounds.push(RevealedRound {
            index,
            item: ItemView::from_item(item, true),
            guesses,
            winner_ids: winners.into_iter().map(|w| w.player_id).collect(),
            overbid_fallback: overbid,
        });
    }
    rounds
}
