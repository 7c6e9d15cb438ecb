//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ algorithm for fast, deterministic randomness.
//! Given the same seed, produces identical fruit placement on all platforms,
//! which is what lets a round be replayed from its seed.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use super::position::Position;

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use snake_arena::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(42);
/// let value = rng.next_u64();
/// assert_eq!(value, 16629283624882167704); // Always the same!
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Simple modulo - bias is negligible for board-sized ranges
        (self.next_u64() % max as u64) as u32
    }

    /// Generate a random integer in range [min, max].
    #[inline]
    pub fn next_int_range(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        let range = max.abs_diff(min) + 1;
        min + self.next_int(range) as i32
    }

    /// Uniformly random cell in the inclusive rectangle `[min, max]`.
    #[inline]
    pub fn random_cell(&mut self, min: Position, max: Position) -> Position {
        let x = self.next_int_range(min.x, max.x);
        let y = self.next_int_range(min.y, max.y);
        Position::new(x, y)
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(slice.len() as u32) as usize;
            Some(&slice[idx])
        }
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive the RNG seed for one round.
///
/// Mixes the server's base seed, the round number and the ids of the players
/// taking part (in roster order), so consecutive rounds with the same base
/// seed still get different fruit sequences.
pub fn derive_round_seed(base_seed: u64, round: u32, player_ids: &[[u8; 16]]) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"SNAKE_ARENA_ROUND_V1");
    hasher.update(base_seed.to_le_bytes());
    hasher.update(round.to_le_bytes());
    for pid in player_ids {
        hasher.update(pid);
    }

    let hash = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================
