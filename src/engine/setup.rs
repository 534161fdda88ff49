use super::{EngineError, RoundEngine};
use crate::types::*;

/// Built-in starter lineup the host can load instead of typing items in.
const SAMPLE_ITEMS: &[(&str, i64)] = &[
    ("Anti-colic baby bottles, 9oz 2-pack", 999),
    ("Kick & play piano gym playmat", 5999),
    ("Soft building blocks set", 2199),
    ("Grandma Wishes board book", 999),
    ("Curved pacifier 2-pack", 899),
    ("Roly-poly stacking toy", 1399),
    ("4-in-1 convertible car seat", 17_999),
    ("Designer logo cotton gift set", 33_000),
];

fn ensure_unlocked(room: &Room) -> Result<(), EngineError> {
    if room.is_setup_done {
        Err(EngineError::SetupLocked)
    } else {
        Ok(())
    }
}

impl RoundEngine {
    /// Add an item to the lineup. Setup phase only.
    pub async fn add_item(
        &self,
        code: &str,
        name: String,
        price_cents: i64,
        image_url: Option<String>,
        note: Option<String>,
    ) -> Result<Item, EngineError> {
        let added = self
            .mutate(code, |room| {
                ensure_unlocked(room)?;
                let item = Item {
                    id: ulid::Ulid::new().to_string(),
                    name: name.clone(),
                    price_cents,
                    image_url: image_url.clone(),
                    note: note.clone(),
                };
                room.items.push(item.clone());
                Ok(Some(item))
            })
            .await?;
        Ok(added.expect("add_item always applies"))
    }

    /// Edit an existing item in place. Setup phase only.
    pub async fn edit_item(&self, code: &str, item: Item) -> Result<(), EngineError> {
        self.mutate(code, |room| {
            ensure_unlocked(room)?;
            let slot = room
                .items
                .iter_mut()
                .find(|i| i.id == item.id)
                .ok_or_else(|| EngineError::UnknownItem(item.id.clone()))?;
            *slot = item.clone();
            Ok(Some(()))
        })
        .await?;
        Ok(())
    }

    /// Remove an item from the lineup. Setup phase only.
    pub async fn remove_item(&self, code: &str, item_id: &str) -> Result<(), EngineError> {
        self.mutate(code, |room| {
            ensure_unlocked(room)?;
            let before = room.items.len();
            room.items.retain(|i| i.id != item_id);
            if room.items.len() == before {
                return Err(EngineError::UnknownItem(item_id.to_string()));
            }
            Ok(Some(()))
        })
        .await?;
        Ok(())
    }

    /// Append the built-in sample lineup. Setup phase only.
    pub async fn load_sample_items(&self, code: &str) -> Result<usize, EngineError> {
        let loaded = self
            .mutate(code, |room| {
                ensure_unlocked(room)?;
                for (name, price_cents) in SAMPLE_ITEMS {
                    room.items.push(Item {
                        id: ulid::Ulid::new().to_string(),
                        name: (*name).to_string(),
                        price_cents: *price_cents,
                        image_url: None,
                        note: None,
                    });
                }
                Ok(Some(SAMPLE_ITEMS.len()))
            })
            .await?;
        Ok(loaded.expect("load_sample_items always applies"))
    }

    /// Pull an item out of the lineup to use as the unscored practice
    /// round. Setup phase only.
    pub async fn mark_practice_item(&self, code: &str, item_id: &str) -> Result<(), EngineError> {
        self.mutate(code, |room| {
            ensure_unlocked(room)?;
            let pos = room
                .items
                .iter()
                .position(|i| i.id == item_id)
                .ok_or_else(|| EngineError::UnknownItem(item_id.to_string()))?;
            let item = room.items.remove(pos);
            // A previously marked practice item goes back into the lineup.
            if let Some(old) = room.practice_item.replace(item) {
                room.items.push(old);
            }
            Ok(Some(()))
        })
        .await?;
        Ok(())
    }

    /// Choose the scoring rule. Setup phase only; fixed once gameplay starts.
    pub async fn set_rule(&self, code: &str, rule: Rule) -> Result<(), EngineError> {
        self.mutate(code, |room| {
            ensure_unlocked(room)?;
            room.rule = rule;
            Ok(Some(()))
        })
        .await?;
        Ok(())
    }

    /// Set the bidding countdown length. Setup phase only.
    pub async fn set_round_duration(&self, code: &str, secs: u32) -> Result<(), EngineError> {
        self.mutate(code, |room| {
            ensure_unlocked(room)?;
            room.round_duration_secs = secs;
            Ok(Some(()))
        })
        .await?;
        Ok(())
    }

    /// Freeze the lineup and open the lobby. Needs at least one real item;
    /// the practice item does not count.
    pub async fn finish_setup(&self, code: &str) -> Result<(), EngineError> {
        self.mutate(code, |room| {
            if room.status != RoomStatus::Setup {
                return Ok(None);
            }
            if room.items.is_empty() {
                return Err(EngineError::NoItems);
            }
            room.is_setup_done = true;
            room.status = RoomStatus::Lobby;
            Ok(Some(()))
        })
        .await?;
        Ok(())
    }
}
