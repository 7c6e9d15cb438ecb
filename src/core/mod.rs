//! Core deterministic primitives.
//!
//! Grid geometry and seeded randomness. Nothing in here touches the clock,
//! the network or global state, so the simulation built on top of it can be
//! replayed from a seed.

pub mod position;
pub mod rng;

// Re-export core types
pub use position::{Direction, Position};
pub use rng::{derive_round_seed, DeterministicRng};
