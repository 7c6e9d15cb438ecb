//! Game Configuration
//!
//! Tunables for board size, seeding layout, pacing and roster limits.

use std::time::Duration;

/// Reference board width.
pub const DEFAULT_BOARD_WIDTH: i32 = 130;

/// Reference board height.
pub const DEFAULT_BOARD_HEIGHT: i32 = 35;

/// Segments per snake at round start.
pub const DEFAULT_SNAKE_LENGTH: usize = 5;

/// Rows between the wall and a snake's starting tail.
pub const DEFAULT_START_MARGIN: i32 = 2;

/// Tick period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(150);

/// Grace period between round start and the first tick.
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(3);

/// Random draws before fruit placement falls back to a full scan.
pub const DEFAULT_FRUIT_ATTEMPTS: u32 = 1024;

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Board width in cells, walls included
    pub board_width: i32,
    /// Board height in cells, walls included
    pub board_height: i32,
    /// Initial snake length
    pub snake_length: usize,
    /// Distance from the wall to the starting row
    pub start_margin: i32,
    /// Fixed simulation period
    pub tick_interval: Duration,
    /// Delay between `round_start` and the first tick
    pub start_delay: Duration,
    /// Minimum players for a round
    pub min_players: usize,
    /// Maximum players in the session
    pub max_players: usize,
    /// Random draws per fruit placement
    pub fruit_attempts: u32,
    /// Base RNG seed (random when `None`)
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_width: DEFAULT_BOARD_WIDTH,
            board_height: DEFAULT_BOARD_HEIGHT,
            snake_length: DEFAULT_SNAKE_LENGTH,
            start_margin: DEFAULT_START_MARGIN,
            tick_interval: DEFAULT_TICK_INTERVAL,
            start_delay: DEFAULT_START_DELAY,
            min_players: 2,
            max_players: 8,
            fruit_attempts: DEFAULT_FRUIT_ATTEMPTS,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Check that the seeding layout fits the board.
    ///
    /// Snakes start in two bands (top and bottom) and each player needs a
    /// column of its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snake_length == 0 {
            return Err(ConfigError::ZeroSnakeLength);
        }
        if self.min_players < 2 {
            return Err(ConfigError::TooFewPlayers(self.min_players));
        }
        if self.max_players < self.min_players {
            return Err(ConfigError::PlayerLimits {
                min: self.min_players,
                max: self.max_players,
            });
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.start_margin < 1 {
            return Err(ConfigError::StartMargin(self.start_margin));
        }

        // Both bands (margin + body) must fit without touching each other
        let band = self.start_margin as i64 + self.snake_length as i64;
        let min_height = 2 * band + 1;
        if (self.board_height as i64) < min_height {
            return Err(ConfigError::BoardTooSmall {
                width: self.board_width,
                height: self.board_height,
                reason: format!("height must be at least {}", min_height),
            });
        }

        // Interior columns must give every player a distinct column
        let interior_width = self.board_width as i64 - 2;
        if interior_width < self.max_players as i64 + 1 {
            return Err(ConfigError::BoardTooSmall {
                width: self.board_width,
                height: self.board_height,
                reason: format!("width must be at least {}", self.max_players + 3),
            });
        }

        Ok(())
    }

    /// Number of playable (non-wall) cells.
    pub fn interior_cells(&self) -> usize {
        let w = (self.board_width - 2).max(0) as usize;
        let h = (self.board_height - 2).max(0) as usize;
        w * h
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Snakes need at least one segment.
    #[error("Snake length must be at least 1")]
    ZeroSnakeLength,

    /// A round needs two players to have a winner.
    #[error("Minimum players must be at least 2, got {0}")]
    TooFewPlayers(usize),

    /// Max below min.
    #[error("Maximum players ({max}) is below minimum players ({min})")]
    PlayerLimits { min: usize, max: usize },

    /// Tick period of zero.
    #[error("Tick interval must be non-zero")]
    ZeroTickInterval,

    /// Starting rows would sit on or outside the wall.
    #[error("Start margin must be at least 1, got {0}")]
    StartMargin(i32),

    /// Board can't hold the seeding layout.
    #[error("Board {width}x{height} is too small: {reason}")]
    BoardTooSmall {
        width: i32,
        height: i32,
        reason: String,
    },
}
