mod guess;
mod prize;
mod reveal;
mod room;
mod round;
mod setup;

pub use reveal::{compute_winners, RevealSummary};

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::store::{SharedStateStore, StoreError};
use crate::types::{Room, RoomCode};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("setup is finished; items and rules are locked")]
    SetupLocked,
    #[error("no items to play")]
    NoItems,
    #[error("item {0} not found")]
    UnknownItem(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns the room state machine. All mutations are read, guard, mutate,
/// conditional-write loops against the shared store, so concurrent clients
/// (host timer, player submissions, the deadline watcher) can race without
/// double-applying anything.
pub struct RoundEngine {
    store: Arc<dyn SharedStateStore>,
    clock: Arc<dyn Clock>,
}

impl RoundEngine {
    pub fn new(store: Arc<dyn SharedStateStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Current state of a room.
    pub async fn room(&self, code: &str) -> Result<Option<Room>, EngineError> {
        Ok(self.store.get(code).await?)
    }

    /// Subscribe to committed writes of a room.
    pub async fn subscribe(
        &self,
        code: &str,
    ) -> Result<broadcast::Receiver<Room>, EngineError> {
        Ok(self.store.subscribe(code).await?)
    }

    /// Codes of all live rooms (used by the deadline watcher).
    pub async fn room_codes(&self) -> Result<Vec<RoomCode>, EngineError> {
        Ok(self.store.codes().await?)
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn store(&self) -> &dyn SharedStateStore {
        self.store.as_ref()
    }

    /// Run one mutation against a room document.
    ///
    /// The closure sees the freshly-read document. Returning `Ok(None)`
    /// means "precondition not met": nothing is written and the operation
    /// is a silent no-op. Returning `Ok(Some(out))` commits the mutated
    /// document with a conditional write; on a version conflict the whole
    /// closure re-runs against the new state, so its guards are re-checked
    /// and a racing duplicate collapses into a no-op.
    pub(crate) async fn mutate<T>(
        &self,
        code: &str,
        mut op: impl FnMut(&mut Room) -> Result<Option<T>, EngineError>,
    ) -> Result<Option<T>, EngineError> {
        loop {
            let Some(current) = self.store.get(code).await? else {
                return Err(EngineError::RoomNotFound(code.to_string()));
            };
            let expected = current.version;
            let mut room = current;
            match op(&mut room)? {
                None => return Ok(None),
                Some(out) => {
                    room.version = expected + 1;
                    match self.store.put_if_version(room, expected).await {
                        Ok(()) => return Ok(Some(out)),
                        Err(StoreError::Conflict) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
    }
}
