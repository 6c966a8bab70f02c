//! Outcome invariant: a recorded win is backed by five stones on the board.

use super::Invariant;
use crate::rules::Axis;
use crate::{Cell, Game};
use strum::IntoEnumIterator;

/// Invariant: a won outcome has a contiguous, board-ordered line of five of
/// the winner's stones, and no other outcome carries a line.
pub struct OutcomeBackedByLine;

impl Invariant<Game> for OutcomeBackedByLine {
    fn holds(game: &Game) -> bool {
        match (game.outcome().winner(), game.winning_line()) {
            (None, None) => true,
            (Some(color), Some(line)) => {
                let stones_match = line
                    .iter()
                    .all(|c| game.board().get(*c) == Cell::Stone(color));
                let contiguous = Axis::iter().any(|axis| {
                    let (dr, dc) = axis.step();
                    line.windows(2)
                        .all(|pair| pair[0].offset(dr, dc, 1) == Some(pair[1]))
                });
                stones_match && contiguous
            }
            _ => false,
        }
    }

    fn description() -> &'static str {
        "Winning outcome is backed by five in a row"
    }
}
