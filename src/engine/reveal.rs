use serde::Serialize;

use super::{EngineError, RoundEngine};
use crate::types::*;

/// Outcome of one reveal, as applied to the room.
#[derive(Debug, Clone, Serialize)]
pub struct RevealSummary {
    pub winners: Vec<Guess>,
    /// True when everyone overbid under "closest without over" and the
    /// round fell back to pure closest-distance scoring.
    pub overbid_fallback: bool,
    pub price_cents: i64,
    pub prize: Option<String>,
}

/// Pick the winning guesses for a round.
///
/// Under `ClosestWithoutOver` the pool is restricted to bids at or below
/// the price; if everyone overbid, the full set is used instead. From the
/// pool, the guesses at minimum distance from the price are candidates:
/// when they all carry the same bid amount they all win, otherwise the
/// earliest-submitted candidate wins alone. Both rules share this
/// tie-break tail.
pub fn compute_winners(guesses: &[Guess], price_cents: i64, rule: Rule) -> Vec<Guess> {
    if guesses.is_empty() {
        return Vec::new();
    }

    let pool: Vec<&Guess> = match rule {
        Rule::ClosestWithoutOver => {
            let not_over: Vec<&Guess> = guesses
                .iter()
                .filter(|g| g.value_cents <= price_cents)
                .collect();
            if not_over.is_empty() {
                guesses.iter().collect()
            } else {
                not_over
            }
        }
        Rule::ClosestOverall => guesses.iter().collect(),
    };

    let best = pool
        .iter()
        .map(|g| (g.value_cents - price_cents).abs())
        .min()
        .expect("pool is non-empty");

    let candidates: Vec<&Guess> = pool
        .into_iter()
        .filter(|g| (g.value_cents - price_cents).abs() == best)
        .collect();

    // Same amount from several players: they all win.
    if candidates
        .iter()
        .all(|g| g.value_cents == candidates[0].value_cents)
    {
        return candidates.into_iter().cloned().collect();
    }

    // Equal distance, different amounts: earliest submission wins alone.
    let earliest = candidates
        .into_iter()
        .min_by_key(|g| g.ts)
        .expect("candidates are non-empty");
    vec![earliest.clone()]
}

fn overbid_fallback(guesses: &[Guess], price_cents: i64, rule: Rule) -> bool {
    rule == Rule::ClosestWithoutOver
        && !guesses.is_empty()
        && guesses.iter().all(|g| g.value_cents > price_cents)
}

impl RoundEngine {
    /// End the current round: determine winners, award score and prize,
    /// and publish the price.
    ///
    /// Reveals may fire concurrently from the host's button, the deadline
    /// watcher and the all-bids-in trigger; the bidding-phase guard runs
    /// inside the conditional write, so only one of them takes effect and
    /// the rest are silent no-ops.
    pub async fn reveal(&self, code: &str) -> Result<Option<RevealSummary>, EngineError> {
        self.mutate(code, |room| {
            if room.status != RoomStatus::InRound {
                return Ok(None);
            }
            let Some(item) = room.current_item().cloned() else {
                return Ok(None);
            };

            let guesses = room.current_guesses();
            let winners = compute_winners(&guesses, item.price_cents, room.rule);
            let prize = room.current_prize.clone();

            // Practice rounds show the machinery without touching the tally.
            if !room.practice_active {
                for winner in &winners {
                    *room.scores.entry(winner.player_id.clone()).or_insert(0) += 1;
                    if let Some(token) = &prize {
                        room.prizes
                            .entry(winner.player_id.clone())
                            .or_default()
                            .push(token.clone());
                    }
                }
            }

            room.last_winner_ids = Some(winners.iter().map(|w| w.player_id.clone()).collect());
            room.status = RoomStatus::Revealed;
            room.round_ends_at = None;

            Ok(Some(RevealSummary {
                overbid_fallback: overbid_fallback(&guesses, item.price_cents, room.rule),
                price_cents: item.price_cents,
                winners,
                prize,
            }))
        })
        .await
    }

    /// Reveal every room whose bidding countdown has elapsed. Returns how
    /// many rooms this swept. Driven by the deadline watcher.
    pub async fn reveal_expired(&self) -> Result<usize, EngineError> {
        let now = self.clock().now();
        let mut revealed = 0;
        for code in self.room_codes().await? {
            let Some(room) = self.room(&code).await? else {
                continue;
            };
            if room.status != RoomStatus::InRound {
                continue;
            }
            let Some(ends_at) = room.round_ends_at else {
                continue;
            };
            if ends_at > now {
                continue;
            }
            tracing::info!("Countdown elapsed in room {}, revealing", code);
            if self.reveal(&code).await?.is_some() {
                revealed += 1;
            }
        }
        Ok(revealed)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::*;
    use chrono::{DateTime, Utc};

    fn guess(player: &str, value_cents: i64, ts_secs: i64) -> Guess {
        Guess {
            player_id: player.to_lowercase(),
            player_name: player.to_string(),
            value_cents,
            ts: DateTime::<Utc>::from_timestamp(ts_secs, 0).unwrap(),
        }
    }

    fn winner_names(winners: &[Guess]) -> Vec<&str> {
        winners.iter().map(|g| g.player_name.as_str()).collect()
    }

    #[test]
    fn test_closest_without_going_over() {
        let guesses = [guess("A", 900, 1), guess("B", 1200, 2)];
        let winners = compute_winners(&guesses, 1000, Rule::ClosestWithoutOver);
        assert_eq!(winner_names(&winners), ["A"]);
    }

    #[test]
    fn test_everyone_over_falls_back_to_closest() {
        let guesses = [guess("A", 1200, 1), guess("B", 1500, 2)];
        let winners = compute_winners(&guesses, 1000, Rule::ClosestWithoutOver);
        assert_eq!(winner_names(&winners), ["A"]);
        assert!(overbid_fallback(&guesses, 1000, Rule::ClosestWithoutOver));
    }

    #[test]
    fn test_same_amount_means_shared_win() {
        let guesses = [guess("A", 1000, 1), guess("B", 1000, 2)];
        let winners = compute_winners(&guesses, 1000, Rule::ClosestWithoutOver);
        assert_eq!(winner_names(&winners), ["A", "B"]);
    }

    #[test]
    fn test_equal_distance_different_amounts_goes_to_earliest() {
        // B bid later in value order but earlier in time.
        let guesses = [guess("A", 900, 5), guess("B", 1100, 1)];
        let winners = compute_winners(&guesses, 1000, Rule::ClosestOverall);
        assert_eq!(winner_names(&winners), ["B"]);
    }

    #[test]
    fn test_no_guesses_no_winners() {
        assert!(compute_winners(&[], 1000, Rule::ClosestWithoutOver).is_empty());
        assert!(compute_winners(&[], 1000, Rule::ClosestOverall).is_empty());
    }

    #[test]
    fn test_three_way_same_amount_tie() {
        let guesses = [
            guess("A", 950, 3),
            guess("B", 950, 1),
            guess("C", 950, 2),
            guess("D", 800, 1),
        ];
        let winners = compute_winners(&guesses, 1000, Rule::ClosestWithoutOver);
        assert_eq!(winners.len(), 3);
        assert!(winner_names(&winners).iter().all(|n| *n != "D"));
    }

    #[tokio::test]
    async fn test_reveal_awards_score_and_prize_once() {
        let fx = fixture();
        let code = ready_room(&fx, &[1000]).await;
        start_bidding(&fx, &code).await;

        fx.engine
            .submit_guess(&code, "p-alice", 900)
            .await
            .unwrap();

        let summary = fx.engine.reveal(&code).await.unwrap().unwrap();
        assert_eq!(summary.winners.len(), 1);
        assert_eq!(summary.winners[0].player_id, "p-alice");
        assert_eq!(summary.price_cents, 1000);
        let token = summary.prize.unwrap();

        // A second reveal of the same round changes nothing.
        assert!(fx.engine.reveal(&code).await.unwrap().is_none());

        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.scores["p-alice"], 1);
        assert_eq!(room.prizes["p-alice"], vec![token]);
        assert_eq!(
            room.last_winner_ids.as_deref(),
            Some(&["p-alice".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_expired_countdowns_are_swept_once() {
        let fx = fixture();
        let code = ready_room(&fx, &[1000]).await;
        start_bidding(&fx, &code).await;

        // Countdown still running: nothing to sweep.
        assert_eq!(fx.engine.reveal_expired().await.unwrap(), 0);

        fx.clock.advance(chrono::Duration::seconds(36));
        assert_eq!(fx.engine.reveal_expired().await.unwrap(), 1);
        assert_eq!(fx.engine.reveal_expired().await.unwrap(), 0);

        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Revealed);
    }

    #[tokio::test]
    async fn test_reveal_with_no_guesses_awards_nothing() {
        let fx = fixture();
        let code = ready_room(&fx, &[1000]).await;
        start_bidding(&fx, &code).await;

        let summary = fx.engine.reveal(&code).await.unwrap().unwrap();
        assert!(summary.winners.is_empty());

        let room = fx.engine.room(&code).await.unwrap().unwrap();
        assert!(room.scores.is_empty());
        assert!(room.prizes.is_empty());
        assert_eq!(room.last_winner_ids.as_deref(), Some(&[][..]));
        assert_eq!(room.status, RoomStatus::Revealed);
    }
}
