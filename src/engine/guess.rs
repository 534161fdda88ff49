use super::{EngineError, RoundEngine};
use crate::types::*;

impl RoundEngine {
    /// Lock in a bid for the current round. First write wins: a second
    /// attempt by the same player, or any attempt outside the bidding
    /// window, is silently dropped (`Ok(None)`).
    ///
    /// When the accepted bid was the last one outstanding, the round is
    /// revealed immediately rather than waiting out the countdown.
    pub async fn submit_guess(
        &self,
        code: &str,
        player_id: &str,
        value_cents: i64,
    ) -> Result<Option<Guess>, EngineError> {
        let now = self.clock().now();
        let accepted = self
            .mutate(code, |room| {
                if room.status != RoomStatus::InRound {
                    return Ok(None);
                }
                let Some(player) = room.players.get(player_id) else {
                    return Ok(None);
                };
                let key = room.round_key();
                let round_guesses = room.guesses.entry(key).or_default();
                if round_guesses.contains_key(player_id) {
                    return Ok(None);
                }
                let guess = Guess {
                    player_id: player.id.clone(),
                    player_name: player.name.clone(),
                    value_cents,
                    ts: now,
                };
                round_guesses.insert(player_id.to_string(), guess.clone());
                Ok(Some(guess))
            })
            .await?;

        if accepted.is_some() {
            self.reveal_if_all_bids_in(code).await?;
        }
        Ok(accepted)
    }

    /// Auto-advance trigger: once every joined player has a locked bid,
    /// reveal without waiting for the countdown. Rechecks state and relies
    /// on `reveal`'s own guard, so racing the deadline watcher or the
    /// host's button is harmless.
    async fn reveal_if_all_bids_in(&self, code: &str) -> Result<(), EngineError> {
        let Some(room) = self.room(code).await? else {
            return Ok(());
        };
        if room.status != RoomStatus::InRound || room.players.is_empty() {
            return Ok(());
        }
        let bids = room
            .guesses
            .get(&room.round_key())
            .map(|m| m.len())
            .unwrap_or(0);
        if bids >= room.players.len() {
            tracing::debug!("All bids in for room {}, revealing", code);
            self.reveal(code).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use crate::types::RoomStatus;
    use chrono::Duration;

    #[tokio::test]
    async fn test_first_bid_wins_repeat_attempts_dropped() {
        let fx = fixture();
        let code = ready_room(&fx, &[1000]).await;
        start_bidding(&fx, &code).await;

        let first = fx.engine.submit_guess(&code, "p-alice", 900).await.unwrap();
        assert!(first.is_some());

        fx.clock.advance(Duration::seconds(1));
        let second = fx.engine.submit_guess(&code, "p-alice", 950).await.unwrap();
        assert!(second.is_none());

        let room = fx.engine.room(&code).await.unwrap().unwrap();
        let round = &room.guesses[&room.round_key()];
        assert_eq!(round.len(), 1);
        assert_eq!(round["p-alice"].value_cents, 900);
    }

    #[tokio::test]
    async fn test_bids_only_accepted_while_round_is_open() {
        let fx = fixture();
        let code = ready_room(&fx, &[1000]).await;

        // Lobby and prize reveal: no bids.
        assert!(fx
            .engine
            .submit_guess(&code, "p-alice", 900)
            .await
            .unwrap()
            .is_none());
        fx.engine.start_round(&code).await.unwrap();
        assert!(fx
            .engine
            .submit_guess(&code, "p-alice", 900)
            .await
            .unwrap()
            .is_none());

        fx.engine.show_item(&code).await.unwrap();
        assert!(fx
            .engine
            .submit_guess(&code, "p-alice", 900)
            .await
            .unwrap()
            .is_some());

        // Unknown player ids are dropped too.
        assert!(fx
            .engine
            .submit_guess(&code, "p-stranger", 500)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_racing_submissions_keep_one_guess() {
        let fx = fixture();
        let code = ready_room(&fx, &[1000]).await;
        start_bidding(&fx, &code).await;

        // Two rapid submissions from the same player race through the
        // conditional write; exactly one may land.
        let (a, b) = tokio::join!(
            fx.engine.submit_guess(&code, "p-alice", 900),
            fx.engine.submit_guess(&code, "p-alice", 950),
        );
        let accepted = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|r| r.is_some())
            .count();
        assert_eq!(accepted, 1);

        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.guesses[&room.round_key()].len(), 1);
    }

    #[tokio::test]
    async fn test_last_outstanding_bid_triggers_reveal() {
        let fx = fixture();
        let code = ready_room(&fx, &[1000]).await;
        start_bidding(&fx, &code).await;

        fx.engine.submit_guess(&code, "p-alice", 900).await.unwrap();
        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::InRound);

        fx.clock.advance(Duration::seconds(1));
        fx.engine.submit_guess(&code, "p-bob", 1200).await.unwrap();

        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Revealed);
        assert_eq!(room.scores["p-alice"], 1);
        assert!(!room.scores.contains_key("p-bob"));
    }
}
