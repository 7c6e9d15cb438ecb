//! Collision Classification
//!
//! Decides what a snake's next head cell means before the snake moves.

use crate::core::position::Position;
use crate::game::board::Board;
use crate::game::state::PlayerId;

/// What the candidate head cell holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// The fruit: grow and relocate it
    Fruit,
    /// Outside the playable area
    Wall,
    /// A segment of some snake (possibly the mover's own)
    Body {
        /// Owner of the segment that was hit
        owner: PlayerId,
    },
    /// Empty cell
    Free,
}

impl CollisionOutcome {
    /// Check if this outcome eliminates the mover.
    #[inline]
    pub fn is_fatal(self) -> bool {
        matches!(self, CollisionOutcome::Wall | CollisionOutcome::Body { .. })
    }
}

/// Classify `candidate` as the next head of `mover`'s snake.
///
/// Checked in priority order: fruit, wall, body, free. The body check sees
/// every snake as it stands right now (dead snakes included) except for the
/// mover's own tail, which moves away on a non-growing step.
pub fn classify(board: &Board, mover: PlayerId, candidate: Position) -> CollisionOutcome {
    if board.fruit == Some(candidate) {
        return CollisionOutcome::Fruit;
    }

    if !board.is_interior(candidate) {
        return CollisionOutcome::Wall;
    }

    for (owner, snake) in &board.snakes {
        let vacated = if *owner == mover { Some(snake.tail()) } else { None };
        let hit = snake
            .segments()
            .take(if vacated.is_some() { snake.len() - 1 } else { snake.len() })
            .any(|cell| cell == candidate);
        if hit {
            return CollisionOutcome::Body { owner: *owner };
        }
    }

    CollisionOutcome::Free
}
