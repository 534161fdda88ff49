//! Shared room-state storage.
//!
//! The engine never talks to a concrete backend; it goes through
//! [`SharedStateStore`], which models a synced key/value store of room
//! documents. The one non-negotiable capability is the conditional write:
//! `put_if_version` commits only when the stored document still carries the
//! version the caller read. Plain merge-style patching cannot express the
//! guess-uniqueness and single-reveal guards, so it is not offered here; a
//! real backend has to map this onto its transaction primitive.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use crate::types::{Room, RoomCode};

/// Buffered updates per room subscription; slow subscribers lag and resync
/// from the next snapshot rather than blocking writers.
const SUBSCRIPTION_BUFFER: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Conditional write lost the race; re-read and retry.
    #[error("version conflict")]
    Conflict,
    /// `create` hit an already-taken room code.
    #[error("room code already taken")]
    AlreadyExists,
    /// Write or subscription against a room that does not exist.
    #[error("room not found")]
    NotFound,
}

#[async_trait]
pub trait SharedStateStore: Send + Sync {
    /// Fetch one room document.
    async fn get(&self, code: &str) -> Result<Option<Room>, StoreError>;

    /// Create a new room document under its code.
    async fn create(&self, room: Room) -> Result<(), StoreError>;

    /// Replace the document, but only if the stored version is still
    /// `expected`. The caller passes the document with the version already
    /// bumped past `expected`.
    async fn put_if_version(&self, room: Room, expected: u64) -> Result<(), StoreError>;

    /// Subscribe to committed writes of one room. The receiver sees every
    /// write made after the call; the current state must be fetched with
    /// [`get`](Self::get) separately.
    async fn subscribe(&self, code: &str) -> Result<broadcast::Receiver<Room>, StoreError>;

    /// Codes of all rooms currently in the store.
    async fn codes(&self) -> Result<Vec<RoomCode>, StoreError>;
}

struct RoomEntry {
    room: Room,
    updates: broadcast::Sender<Room>,
}

/// In-process store backing the server and all tests.
#[derive(Default)]
pub struct MemoryStore {
    rooms: RwLock<HashMap<RoomCode, RoomEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedStateStore for MemoryStore {
    async fn get(&self, code: &str) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.read().await.get(code).map(|e| e.room.clone()))
    }

    async fn create(&self, room: Room) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.code) {
            return Err(StoreError::AlreadyExists);
        }
        let (updates, _) = broadcast::channel(SUBSCRIPTION_BUFFER);
        rooms.insert(room.code.clone(), RoomEntry { room, updates });
        Ok(())
    }

    async fn put_if_version(&self, room: Room, expected: u64) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        let entry = rooms.get_mut(&room.code).ok_or(StoreError::NotFound)?;
        if entry.room.version != expected {
            return Err(StoreError::Conflict);
        }
        entry.room = room.clone();
        // No receivers connected is fine
        let _ = entry.updates.send(room);
        Ok(())
    }

    async fn subscribe(&self, code: &str) -> Result<broadcast::Receiver<Room>, StoreError> {
        let rooms = self.rooms.read().await;
        let entry = rooms.get(code).ok_or(StoreError::NotFound)?;
        Ok(entry.updates.subscribe())
    }

    async fn codes(&self) -> Result<Vec<RoomCode>, StoreError> {
        Ok(self.rooms.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RoomStatus, Rule};
    use chrono::Utc;

    fn room(code: &str) -> Room {
        Room {
            code: code.to_string(),
            version: 0,
            created_at: Utc::now(),
            host_id: "host".to_string(),
            status: RoomStatus::Setup,
            rule: Rule::ClosestWithoutOver,
            round_index: 0,
            round_ends_at: None,
            round_duration_secs: 35,
            is_setup_done: false,
            practice_item: None,
            practice_active: false,
            items: Vec::new(),
            players: HashMap::new(),
            guesses: HashMap::new(),
            scores: HashMap::new(),
            prizes: HashMap::new(),
            prize_pool: Vec::new(),
            current_prize: None,
            last_winner_ids: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_taken_code() {
        let store = MemoryStore::new();
        store.create(room("QQQQQ")).await.unwrap();
        assert!(matches!(
            store.create(room("QQQQQ")).await,
            Err(StoreError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_stale_write_conflicts_and_leaves_state_untouched() {
        let store = MemoryStore::new();
        store.create(room("ABCDE")).await.unwrap();

        let mut first = store.get("ABCDE").await.unwrap().unwrap();
        first.version = 1;
        first.round_index = 1;
        store.put_if_version(first, 0).await.unwrap();

        // A second writer still holding version 0 must lose.
        let mut stale = room("ABCDE");
        stale.version = 1;
        stale.round_index = 9;
        assert!(matches!(
            store.put_if_version(stale, 0).await,
            Err(StoreError::Conflict)
        ));

        let current = store.get("ABCDE").await.unwrap().unwrap();
        assert_eq!(current.version, 1);
        assert_eq!(current.round_index, 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_committed_writes() {
        let store = MemoryStore::new();
        store.create(room("WATCH")).await.unwrap();
        let mut rx = store.subscribe("WATCH").await.unwrap();

        let mut updated = store.get("WATCH").await.unwrap().unwrap();
        updated.version = 1;
        updated.status = RoomStatus::Lobby;
        store.put_if_version(updated, 0).await.unwrap();

        let seen = rx.recv().await.unwrap();
        assert_eq!(seen.version, 1);
        assert_eq!(seen.status, RoomStatus::Lobby);
    }
}
