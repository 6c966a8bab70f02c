//! Occupancy invariant: the board is exactly the replayed move log.

use super::Invariant;
use crate::{Board, Game};

/// Invariant: occupied cells equal the move count and every logged move's
/// cell holds that move's color.
pub struct OccupancyMatchesHistory;

impl Invariant<Game> for OccupancyMatchesHistory {
    fn holds(game: &Game) -> bool {
        let mut replayed = Board::new();
        for mv in game.history() {
            if !replayed.is_empty(*mv.at()) {
                return false;
            }
            replayed.apply(*mv.at(), *mv.color());
        }
        replayed == *game.board() && game.board().stone_count() == game.move_count()
    }

    fn description() -> &'static str {
        "Occupied cells match the move log"
    }
}
