//! Input Buffer
//!
//! Latest validated direction per player, plus the direction each snake
//! actually moved on its last step.

use std::collections::BTreeMap;

use crate::core::position::Direction;
use crate::game::state::PlayerId;

/// Pending and committed directions for every player in a round.
///
/// A pending entry is overwritten by later submissions and cleared when the
/// tick commits it. Committed entries persist, so a snake with no fresh input
/// keeps going straight.
#[derive(Clone, Debug, Default)]
pub struct InputBuffer {
    pending: BTreeMap<PlayerId, Direction>,
    committed: BTreeMap<PlayerId, Direction>,
}

impl InputBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a new direction.
    ///
    /// Dropped (returns `false`) when the player has no committed direction,
    /// when it repeats or reverses the committed direction, or when it
    /// reverses the pending one. Otherwise it replaces the pending slot.
    pub fn submit(&mut self, id: PlayerId, direction: Direction) -> bool {
        let Some(committed) = self.committed.get(&id).copied() else {
            return false;
        };
        if direction == committed || direction.is_opposite(committed) {
            return false;
        }
        if let Some(pending) = self.pending.get(&id) {
            if direction.is_opposite(*pending) {
                return false;
            }
        }
        self.pending.insert(id, direction);
        true
    }

    /// Direction to apply on the next tick.
    pub fn direction_for(&self, id: PlayerId) -> Option<Direction> {
        self.pending
            .get(&id)
            .or_else(|| self.committed.get(&id))
            .copied()
    }

    /// Record the direction just applied and clear the pending slot.
    pub fn commit(&mut self, id: PlayerId, direction: Direction) {
        self.pending.remove(&id);
        self.committed.insert(id, direction);
    }

    /// Forget a player (eliminated or left).
    pub fn remove(&mut self, id: PlayerId) {
        self.pending.remove(&id);
        self.committed.remove(&id);
    }

    /// Pending direction, if any.
    pub fn pending(&self, id: PlayerId) -> Option<Direction> {
        self.pending.get(&id).copied()
    }

    /// Last committed direction, if any.
    pub fn committed(&self, id: PlayerId) -> Option<Direction> {
        self.committed.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const P: PlayerId = PlayerId::from_u128(7);

    fn buffer_heading(direction: Direction) -> InputBuffer {
        let mut buffer = InputBuffer::new();
        buffer.commit(P, direction);
        buffer
    }

    #[test]
    fn test_unknown_player_is_ignored() {
        let mut buffer = InputBuffer::new();
        assert!(!buffer.submit(P, Direction::Left));
        assert_eq!(buffer.direction_for(P), None);
    }

    #[test]
    fn test_no_input_keeps_heading() {
        let buffer = buffer_heading(Direction::Up);
        assert_eq!(buffer.direction_for(P), Some(Direction::Up));
    }

    #[test]
    fn test_rejects_same_and_reverse() {
        let mut buffer = buffer_heading(Direction::Up);
        assert!(!buffer.submit(P, Direction::Up));
        assert!(!buffer.submit(P, Direction::Down));
        assert_eq!(buffer.pending(P), None);
    }

    #[test]
    fn test_last_write_wins() {
        let mut buffer = buffer_heading(Direction::Up);
        assert!(buffer.submit(P, Direction::Left));
        assert!(buffer.submit(P, Direction::Left));
        assert_eq!(buffer.direction_for(P), Some(Direction::Left));
    }

    #[test]
    fn test_reverse_of_pending_is_dropped() {
        // left then right before the tick: keep left
        let mut buffer = buffer_heading(Direction::Up);
        assert!(buffer.submit(P, Direction::Left));
        assert!(!buffer.submit(P, Direction::Right));
        assert_eq!(buffer.direction_for(P), Some(Direction::Left));
    }

    #[test]
    fn test_commit_clears_pending() {
        let mut buffer = buffer_heading(Direction::Up);
        buffer.submit(P, Direction::Right);
        buffer.commit(P, Direction::Right);
        assert_eq!(buffer.pending(P), None);
        assert_eq!(buffer.committed(P), Some(Direction::Right));

        // Reverse of the new heading is now illegal
        assert!(!buffer.submit(P, Direction::Left));
    }

    #[test]
    fn test_remove() {
        let mut buffer = buffer_heading(Direction::Up);
        buffer.submit(P, Direction::Left);
        buffer.remove(P);
        assert_eq!(buffer.direction_for(P), None);
        assert!(!buffer.submit(P, Direction::Right));
    }

    fn any_direction() -> impl Strategy<Value = Direction> {
        prop::sample::select(Direction::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_never_reverses_committed(
            start in any_direction(),
            inputs in prop::collection::vec(any_direction(), 0..16),
        ) {
            let mut buffer = buffer_heading(start);
            for d in inputs {
                buffer.submit(P, d);
            }
            let next = buffer.direction_for(P).unwrap();
            prop_assert!(!next.is_opposite(start));
        }

        #[test]
        fn prop_duplicate_submission_changes_nothing(
            start in any_direction(),
            first in any_direction(),
        ) {
            let mut once = buffer_heading(start);
            once.submit(P, first);

            let mut twice = buffer_heading(start);
            twice.submit(P, first);
            twice.submit(P, first);

            prop_assert_eq!(once.direction_for(P), twice.direction_for(P));
        }
    }
}
