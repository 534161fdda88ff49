//! Prize tokens, drawn without replacement.
//!
//! Each round gets one token pre-drawn from the room's pool while the
//! prize is on display; winners of the round each receive that token.

use rand::Rng;

/// The full token set a room starts with.
const PRIZE_TOKENS: &[&str] = &[
    "🏍️", "🗼", "🗽", "⛷️", "🏎️", "🏖️", "🌁", "🏯", "🚢", "🚗", "🛻", "⛵", "🚤", "📺", "💰",
    "💍", "🚐", "🛏️", "🍽️",
];

pub fn full_pool() -> Vec<String> {
    PRIZE_TOKENS.iter().map(|t| (*t).to_string()).collect()
}

/// Draw one token uniformly at random, removing it from the pool. An empty
/// pool is refilled with the full token set before drawing, so a draw
/// always succeeds.
pub fn draw(pool: &mut Vec<String>, rng: &mut impl Rng) -> String {
    if pool.is_empty() {
        *pool = full_pool();
    }
    let idx = rng.random_range(0..pool.len());
    pool.swap_remove(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_draws_exhaust_pool_without_repeats() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pool = full_pool();
        let n = pool.len();

        let mut seen = HashSet::new();
        for _ in 0..n {
            let token = draw(&mut pool, &mut rng);
            assert!(seen.insert(token), "token drawn twice before exhaustion");
        }
        assert!(pool.is_empty());
    }

    #[test]
    fn test_exhausted_pool_refills_on_next_draw() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pool = Vec::new();

        let token = draw(&mut pool, &mut rng);
        assert!(full_pool().contains(&token));
        assert_eq!(pool.len(), full_pool().len() - 1);
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let mut pool_a = full_pool();
        let mut pool_b = full_pool();

        for _ in 0..5 {
            assert_eq!(draw(&mut pool_a, &mut a), draw(&mut pool_b, &mut b));
        }
    }
}
