//! Board Geometry and Fruit Placement
//!
//! The grid is `width x height` cells. Row/column 0 and the last row/column
//! are wall; everything in `[1, width-2] x [1, height-2]` is playable.

use std::collections::BTreeMap;

use crate::core::position::{Direction, Position};
use crate::core::rng::DeterministicRng;
use crate::game::config::GameConfig;
use crate::game::state::{PlayerId, Snake};

/// Grid, snakes and the current fruit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    /// Width in cells, walls included
    pub width: i32,
    /// Height in cells, walls included
    pub height: i32,
    /// One snake per round participant
    pub snakes: BTreeMap<PlayerId, Snake>,
    /// Current fruit, `None` only when no free cell was left
    pub fruit: Option<Position>,
}

/// Heading of the player at `index` in the seeding order.
///
/// Even indices start at the bottom going up, odd ones at the top going down.
#[inline]
pub fn starting_direction(index: usize) -> Direction {
    if index % 2 == 0 {
        Direction::Up
    } else {
        Direction::Down
    }
}

impl Board {
    /// Empty board.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            snakes: BTreeMap::new(),
            fruit: None,
        }
    }

    /// Lay out one snake per participant.
    ///
    /// The width is split into `n + 1` equal segments and player `i` takes
    /// column `(i + 1) * width / (n + 1)`. Each snake is a vertical run of
    /// `snake_length` cells whose tail sits `start_margin` rows from its wall
    /// and whose head points at the vertical center.
    pub fn seed(participants: &[PlayerId], config: &GameConfig) -> Self {
        let mut board = Board::new(config.board_width, config.board_height);
        let n = participants.len() as i64;
        let length = config.snake_length as i32;

        for (index, id) in participants.iter().enumerate() {
            let x = ((index as i64 + 1) * config.board_width as i64 / (n + 1)) as i32;
            let direction = starting_direction(index);

            let tail_y = match direction {
                Direction::Up => config.board_height - 1 - config.start_margin,
                _ => config.start_margin,
            };
            let (_, dy) = direction.delta();
            let head_y = tail_y + dy * (length - 1);

            // Head first: walk back from the head towards the tail
            let segments = (0..length).map(|k| Position::new(x, head_y - dy * k));
            if let Some(snake) = Snake::from_segments(segments) {
                board.snakes.insert(*id, snake);
            }
        }

        board
    }

    /// Check if a cell is inside the playable area.
    #[inline]
    pub fn is_interior(&self, cell: Position) -> bool {
        cell.x >= 1 && cell.x <= self.width - 2 && cell.y >= 1 && cell.y <= self.height - 2
    }

    /// Check if any snake (alive or dead) covers a cell.
    pub fn is_occupied(&self, cell: Position) -> bool {
        self.snakes.values().any(|snake| snake.contains(cell))
    }

    /// Owner of the snake covering a cell.
    pub fn occupant(&self, cell: Position) -> Option<PlayerId> {
        self.snakes
            .iter()
            .find(|(_, snake)| snake.contains(cell))
            .map(|(id, _)| *id)
    }

    /// Snake of a player.
    pub fn snake(&self, id: PlayerId) -> Option<&Snake> {
        self.snakes.get(&id)
    }

    /// Every playable cell, row by row.
    pub fn interior_cells(&self) -> impl Iterator<Item = Position> + '_ {
        (1..self.height - 1).flat_map(move |y| (1..self.width - 1).map(move |x| Position::new(x, y)))
    }

    fn is_free_for_fruit(&self, cell: Position) -> bool {
        self.fruit != Some(cell) && !self.is_occupied(cell)
    }

    /// Pick a cell for the next fruit.
    ///
    /// Draws up to `attempts` uniform interior cells and keeps the first one
    /// that is neither a snake segment nor the current fruit. If every draw
    /// hits, falls back to a uniform pick among all free cells. Returns
    /// `None` when the board is full.
    pub fn place_fruit(&self, rng: &mut DeterministicRng, attempts: u32) -> Option<Position> {
        if self.width < 3 || self.height < 3 {
            return None;
        }

        let min = Position::new(1, 1);
        let max = Position::new(self.width - 2, self.height - 2);
        for _ in 0..attempts {
            let cell = rng.random_cell(min, max);
            if self.is_free_for_fruit(cell) {
                return Some(cell);
            }
        }

        let free: Vec<Position> = self
            .interior_cells()
            .filter(|cell| self.is_free_for_fruit(*cell))
            .collect();
        rng.choose(&free).copied()
    }
}
