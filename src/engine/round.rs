use chrono::Duration;

use super::{prize, EngineError, RoundEngine};
use crate::types::*;

impl RoundEngine {
    /// Open bidding: draw a prize and put it on display for the round at
    /// `index`. Caller has already checked the lineup bounds.
    fn begin_round(room: &mut Room, index: usize) {
        let mut rng = rand::rng();
        room.status = RoomStatus::ShowingPrize;
        room.round_index = index;
        room.practice_active = false;
        room.round_ends_at = None;
        room.last_winner_ids = None;
        room.current_prize = Some(prize::draw(&mut room.prize_pool, &mut rng));
    }

    /// Start play from the lobby. Runs the practice round first when one
    /// is configured, otherwise goes straight to round 0's prize reveal.
    /// No-op outside the lobby.
    pub async fn start_round(&self, code: &str) -> Result<Option<RoomStatus>, EngineError> {
        let now = self.clock().now();
        self.mutate(code, |room| {
            if room.status != RoomStatus::Lobby {
                return Ok(None);
            }
            if room.items.is_empty() {
                return Err(EngineError::NoItems);
            }
            if room.practice_item.is_some() {
                // Practice skips the prize: straight into bidding, unscored.
                room.status = RoomStatus::InRound;
                room.practice_active = true;
                room.round_ends_at =
                    Some(now + Duration::seconds(room.round_duration_secs as i64));
                room.last_winner_ids = None;
                room.current_prize = None;
            } else {
                Self::begin_round(room, 0);
            }
            Ok(Some(room.status))
        })
        .await
    }

    /// Move from the prize reveal to the bidding window and start the
    /// countdown. No-op unless a prize is on display.
    pub async fn show_item(&self, code: &str) -> Result<Option<RoomStatus>, EngineError> {
        let now = self.clock().now();
        self.mutate(code, |room| {
            if room.status != RoomStatus::ShowingPrize {
                return Ok(None);
            }
            room.status = RoomStatus::InRound;
            room.round_ends_at = Some(now + Duration::seconds(room.round_duration_secs as i64));
            Ok(Some(room.status))
        })
        .await
    }

    /// Advance past a revealed round: after practice, real round 0 begins;
    /// after the last item, the game is finished; otherwise the next
    /// item's prize goes on display. No-op unless the round is revealed.
    pub async fn next_round(&self, code: &str) -> Result<Option<RoomStatus>, EngineError> {
        self.mutate(code, |room| {
            if room.status != RoomStatus::Revealed {
                return Ok(None);
            }
            if room.practice_active {
                Self::begin_round(room, 0);
                return Ok(Some(room.status));
            }
            let next_index = room.round_index + 1;
            if next_index >= room.items.len() {
                room.status = RoomStatus::Finished;
                room.round_ends_at = None;
            } else {
                Self::begin_round(room, next_index);
            }
            Ok(Some(room.status))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use crate::clock::Clock;
    use crate::types::RoomStatus;

    #[tokio::test]
    async fn test_round_index_walks_lineup_once_then_finishes() {
        let fx = fixture();
        let code = ready_room(&fx, &[1000, 2000, 3000]).await;

        start_bidding(&fx, &code).await;
        let mut seen_indices = Vec::new();
        let mut finishes = 0;

        for _ in 0..3 {
            let room = fx.engine.room(&code).await.unwrap().unwrap();
            assert_eq!(room.status, RoomStatus::InRound);
            seen_indices.push(room.round_index);

            fx.engine.reveal(&code).await.unwrap();
            let status = fx.engine.next_round(&code).await.unwrap().unwrap();
            if status == RoomStatus::Finished {
                finishes += 1;
            } else {
                fx.engine.show_item(&code).await.unwrap();
            }
        }

        assert_eq!(seen_indices, vec![0, 1, 2]);
        assert_eq!(finishes, 1);

        // The game is over; further advances change nothing.
        assert!(fx.engine.next_round(&code).await.unwrap().is_none());
        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Finished);
        assert_eq!(room.round_index, 2);
    }

    #[tokio::test]
    async fn test_each_round_draws_a_fresh_prize() {
        let fx = fixture();
        let code = ready_room(&fx, &[1000, 2000]).await;
        start_bidding(&fx, &code).await;

        let room = fx.engine.room(&code).await.unwrap().unwrap();
        let first_prize = room.current_prize.clone().unwrap();
        let pool_after_first = room.prize_pool.len();
        assert!(!room.prize_pool.contains(&first_prize));

        fx.engine.reveal(&code).await.unwrap();
        fx.engine.next_round(&code).await.unwrap();

        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::ShowingPrize);
        assert!(room.current_prize.is_some());
        assert_eq!(room.prize_pool.len(), pool_after_first - 1);
        assert!(room.last_winner_ids.is_none());
    }

    #[tokio::test]
    async fn test_practice_round_leads_into_round_one() {
        let fx = fixture();
        let room = fx.engine.create_room("host".to_string()).await.unwrap();
        let code = room.code;

        let trial = fx
            .engine
            .add_item(&code, "Trial".to_string(), 500, None, None)
            .await
            .unwrap();
        fx.engine
            .add_item(&code, "Real".to_string(), 1000, None, None)
            .await
            .unwrap();
        fx.engine.mark_practice_item(&code, &trial.id).await.unwrap();
        fx.engine.finish_setup(&code).await.unwrap();
        fx.engine
            .join_room(&code, "p1".to_string(), "Alice".to_string())
            .await
            .unwrap();

        // Practice goes straight into bidding, with nothing at stake.
        fx.engine.start_round(&code).await.unwrap();
        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::InRound);
        assert!(room.practice_active);
        assert!(room.current_prize.is_none());
        assert_eq!(room.round_key(), "practice");

        fx.engine.submit_guess(&code, "p1", 450).await.unwrap();
        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Revealed);
        assert!(room.scores.is_empty());
        assert_eq!(room.round_index, 0);

        // Advancing out of practice begins the real first round.
        fx.engine.next_round(&code).await.unwrap();
        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::ShowingPrize);
        assert!(!room.practice_active);
        assert_eq!(room.round_index, 0);
        assert!(room.current_prize.is_some());
        // The practice bid stays under its own key.
        assert!(room.guesses.contains_key("practice"));
        assert!(!room.guesses.contains_key("0"));
    }

    #[tokio::test]
    async fn test_countdown_is_set_only_while_bidding() {
        let fx = fixture();
        let code = ready_room(&fx, &[1000]).await;

        fx.engine.start_round(&code).await.unwrap();
        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert!(room.round_ends_at.is_none());

        fx.engine.show_item(&code).await.unwrap();
        let room = fx.engine.room(&code).await.unwrap().unwrap();
        let ends_at = room.round_ends_at.unwrap();
        assert_eq!(
            ends_at,
            fx.clock.now() + chrono::Duration::seconds(room.round_duration_secs as i64)
        );
    }
}
