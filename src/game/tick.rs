//! Authoritative Simulation Tick
//!
//! One fixed step of a round. Pure with respect to its inputs: given the same
//! round state, roster and config it always produces the same result.

use tracing::debug;

use crate::core::position::Position;
use crate::game::collision::{classify, CollisionOutcome};
use crate::game::config::GameConfig;
use crate::game::events::{EliminationCause, GameEvent};
use crate::game::state::{Player, PlayerId, PlayerStatus, RoundState};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the round ended this tick
    pub round_ended: bool,
    /// Winner (if the round ended with one)
    pub winner: Option<PlayerId>,
}

/// Run one simulation tick.
///
/// Every `Playing` player moves once, in roster order. A later mover sees the
/// bodies of earlier movers as they are after this tick's step.
///
/// Per player:
/// 1. Take the pending direction, or the committed one if nothing new arrived
/// 2. Classify the next head cell (fruit, wall, body, free)
/// 3. Grow, die or slide
/// 4. Commit the direction used
///
/// The round ends when at most one player is still `Playing`.
pub fn tick(round: &mut RoundState, players: &mut [Player], config: &GameConfig) -> TickResult {
    let mut result = TickResult::default();

    round.tick += 1;
    let now = round.tick;

    for player in players.iter_mut() {
        if !player.is_playing() {
            continue;
        }
        let id = player.id;

        let Some(direction) = round.inputs.direction_for(id) else {
            continue;
        };
        let Some(head) = round.board.snake(id).map(|s| s.head()) else {
            continue;
        };
        let candidate = head.advance(direction);

        match classify(&round.board, id, candidate) {
            CollisionOutcome::Fruit => {
                let length = grow(round, id, candidate);
                round.inputs.commit(id, direction);
                round.push_event(GameEvent::FruitEaten {
                    tick: now,
                    player_id: id,
                    position: candidate,
                    length,
                });

                round.board.fruit = round.board.place_fruit(&mut round.rng, config.fruit_attempts);
                match round.board.fruit {
                    Some(position) => round.push_event(GameEvent::FruitSpawned { tick: now, position }),
                    None => debug!(tick = now, "No free cell left for fruit"),
                }
            }
            CollisionOutcome::Wall => {
                eliminate(round, player, EliminationCause::Wall);
            }
            CollisionOutcome::Body { owner } => {
                eliminate(round, player, EliminationCause::Body { owner });
            }
            CollisionOutcome::Free => {
                if let Some(snake) = round.board.snakes.get_mut(&id) {
                    snake.advance(candidate, false);
                }
                round.inputs.commit(id, direction);
            }
        }
    }

    let mut alive = players.iter().filter(|p| p.is_playing());
    let first = alive.next();
    let more = alive.next().is_some();

    if !more {
        result.round_ended = true;
        result.winner = first.map(|p| p.id);
        round.push_event(GameEvent::RoundEnded {
            tick: now,
            winner_id: result.winner,
        });
    }

    result.events = round.take_events();
    result
}

fn grow(round: &mut RoundState, id: PlayerId, head: Position) -> usize {
    match round.board.snakes.get_mut(&id) {
        Some(snake) => {
            snake.advance(head, true);
            snake.len()
        }
        None => 0,
    }
}

/// Mark a player dead; their snake stays on the board as an obstacle.
fn eliminate(round: &mut RoundState, player: &mut Player, cause: EliminationCause) {
    player.status = PlayerStatus::Dead;
    round.inputs.remove(player.id);
    debug!(
        player = %player.id.short(),
        tick = round.tick,
        ?cause,
        "Player eliminated"
    );
    round.push_event(GameEvent::PlayerEliminated {
        tick: round.tick,
        player_id: player.id,
        cause,
    });
}

// =============================================================================
// TESTS
// =============================================================================
