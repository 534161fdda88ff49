use std::sync::Arc;
use std::time::Duration;

use crate::engine::RoundEngine;

/// Spawn a background task that reveals rounds whose countdown has run out.
///
/// This is one of three reveal triggers (the host's button and the
/// all-bids-in check being the others); `reveal` itself arbitrates between
/// them, so sweeping a round that just got revealed elsewhere is a no-op.
pub fn spawn_deadline_watcher(engine: Arc<RoundEngine>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(500)).await;

            match engine.reveal_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Auto-revealed {} round(s) on deadline", n),
                Err(e) => tracing::error!("Deadline sweep failed: {}", e),
            }
        }
    });
}
