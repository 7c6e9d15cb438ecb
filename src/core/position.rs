//! Grid Geometry
//!
//! Integer cell positions and the four axis-aligned headings.
//! Bounds are a board concern; nothing here clamps or checks walls.

use std::fmt;
use serde::{Serialize, Deserialize};

/// Heading of a snake on a given tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards row 0 (y - 1)
    Up,
    /// Towards the last row (y + 1)
    Down,
    /// Towards column 0 (x - 1)
    Left,
    /// Towards the last column (x + 1)
    Right,
}

impl Direction {
    /// All four directions, in declaration order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// The heading pointing the other way.
    #[inline]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Check whether `other` is the exact reversal of this heading.
    #[inline]
    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// Unit offset `(dx, dy)` for one step.
    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// A cell on the board grid.
///
/// Row 0 is the top wall, so moving `Up` decreases `y`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl Position {
    /// Create a new position.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step in `direction`.
    ///
    /// Pure: `self` is left untouched.
    #[inline]
    pub fn advance(self, direction: Direction) -> Position {
        let (dx, dy) = direction.delta();
        Position {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
        }
    }

    /// Manhattan distance to another cell.
    #[inline]
    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_each_direction() {
        let origin = Position::new(10, 10);
        assert_eq!(origin.advance(Direction::Up), Position::new(10, 9));
        assert_eq!(origin.advance(Direction::Down), Position::new(10, 11));
        assert_eq!(origin.advance(Direction::Left), Position::new(9, 10));
        assert_eq!(origin.advance(Direction::Right), Position::new(11, 10));
    }

    #[test]
    fn test_advance_is_pure() {
        let origin = Position::new(3, 4);
        let moved = origin.advance(Direction::Right);
        assert_eq!(origin, Position::new(3, 4));
        assert_ne!(origin, moved);
    }

    #[test]
    fn test_advance_does_not_clamp() {
        // Walls are the board's business
        let corner = Position::new(0, 0);
        assert_eq!(corner.advance(Direction::Left), Position::new(-1, 0));
        assert_eq!(corner.advance(Direction::Up), Position::new(0, -1));
    }

    #[test]
    fn test_opposites() {
        assert_eq!(Direction::Up.opposite(), Direction::Down);
        assert_eq!(Direction::Left.opposite(), Direction::Right);
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert!(d.is_opposite(d.opposite()));
            assert!(!d.is_opposite(d));
        }
        assert!(!Direction::Up.is_opposite(Direction::Left));
    }

    #[test]
    fn test_step_and_back() {
        let p = Position::new(7, 7);
        for d in Direction::ALL {
            assert_eq!(p.advance(d).advance(d.opposite()), p);
            assert_eq!(p.manhattan(p.advance(d)), 1);
        }
    }

    #[test]
    fn test_direction_json() {
        let json = serde_json::to_string(&Direction::Left).unwrap();
        assert_eq!(json, "\"left\"");
        let parsed: Direction = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(parsed, Direction::Down);
        assert!(serde_json::from_str::<Direction>("\"sideways\"").is_err());
    }
}
