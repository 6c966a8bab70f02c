//! Heuristic opponent: a fixed priority list over the empty cells.
//!
//! 1. complete our own five
//! 2. block the opponent's five
//! 3. break an opponent run that would reach four
//! 4. extend our own run to four
//! 5. positional score (neighbours plus center pull)
//! 6. random empty cell
//!
//! Every scan is row-major, so the choice is deterministic for a given board
//! except for the last-resort random pick.

use crate::rules::{Axis, check_win, run_through};
use crate::{Board, Cell, Color, Coord};
use rand::Rng;
use rand::seq::SliceRandom;
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

/// Run length (including the candidate cell) treated as a threat.
pub const THREAT_RUN: usize = 4;

/// Neighbourhood radius, in Manhattan distance, for positional scoring.
pub const INFLUENCE_RADIUS: usize = 3;

/// Which rule produced the chosen cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Reason {
    /// Completes our five.
    Win,
    /// Stops the opponent's five.
    Block,
    /// Breaks an opponent four.
    Neutralize,
    /// Builds our own four.
    Threaten,
    /// Best positional score.
    Positional,
    /// Random fallback.
    Random,
}

/// Picks a move for `own`, or `None` when the board is full.
#[instrument(skip(board, rng))]
pub fn select_move<R: Rng + ?Sized>(board: &Board, own: Color, rng: &mut R) -> Option<Coord> {
    select_move_with_reason(board, own, rng).map(|(at, _)| at)
}

/// Like [`select_move`], also reporting which rule fired.
pub fn select_move_with_reason<R: Rng + ?Sized>(
    board: &Board,
    own: Color,
    rng: &mut R,
) -> Option<(Coord, Reason)> {
    let opponent = own.opponent();
    let empty = board.empty_cells();
    if empty.is_empty() {
        return None;
    }

    let choice = completing_cell(board, &empty, own)
        .map(|at| (at, Reason::Win))
        .or_else(|| completing_cell(board, &empty, opponent).map(|at| (at, Reason::Block)))
        .or_else(|| run_cell(board, &empty, opponent).map(|at| (at, Reason::Neutralize)))
        .or_else(|| run_cell(board, &empty, own).map(|at| (at, Reason::Threaten)))
        .or_else(|| best_positional(board, &empty, own).map(|at| (at, Reason::Positional)))
        .or_else(|| empty.choose(rng).map(|at| (*at, Reason::Random)));

    if let Some((at, reason)) = choice {
        debug!(%own, %at, %reason, "Heuristic move chosen");
    }
    choice
}

fn completing_cell(board: &Board, empty: &[Coord], color: Color) -> Option<Coord> {
    empty
        .iter()
        .copied()
        .find(|at| check_win(board, *at, color).is_some())
}

fn run_cell(board: &Board, empty: &[Coord], color: Color) -> Option<Coord> {
    empty.iter().copied().find(|at| {
        Axis::iter().any(|axis| run_through(board, *at, color, axis).len() >= THREAT_RUN)
    })
}

/// Positional score of an empty cell.
///
/// Each stone within [`INFLUENCE_RADIUS`] adds `(4 - distance)`, doubled for
/// our own stones, and the cell gets `(18 - distance_to_center) * 0.5`.
pub fn positional_score(board: &Board, at: Coord, own: Color) -> f64 {
    let radius = INFLUENCE_RADIUS as isize;
    let mut score = 0.0;
    for dr in -radius..=radius {
        let span = radius - dr.abs();
        for dc in -span..=span {
            if dr == 0 && dc == 0 {
                continue;
            }
            let Some(other) = at.offset(dr, dc, 1) else {
                continue;
            };
            let Cell::Stone(color) = board.get(other) else {
                continue;
            };
            let distance = (dr.abs() + dc.abs()) as f64;
            let weight = if color == own { 2.0 } else { 1.0 };
            score += (4.0 - distance) * weight;
        }
    }
    let center_distance = at.manhattan(Coord::center()) as f64;
    score + (18.0 - center_distance) * 0.5
}

fn best_positional(board: &Board, empty: &[Coord], own: Color) -> Option<Coord> {
    let mut best: Option<(Coord, f64)> = None;
    for &at in empty {
        let score = positional_score(board, at, own);
        // Strictly greater keeps the first-found cell on ties.
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((at, score));
        }
    }
    best.map(|(at, _)| at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn at(row: usize, col: usize) -> Coord {
        Coord { row, col }
    }

    #[test]
    fn test_empty_board_takes_center() {
        let mut rng = StdRng::seed_from_u64(7);
        let chosen = select_move_with_reason(&Board::new(), Color::Black, &mut rng);
        assert_eq!(chosen, Some((Coord::center(), Reason::Positional)));
    }

    #[test]
    fn test_positional_prefers_own_neighbourhood() {
        let mut board = Board::new();
        board.apply(at(9, 9), Color::White);
        let mut rng = StdRng::seed_from_u64(7);
        let chosen = select_move(&board, Color::White, &mut rng).expect("move");
        assert_eq!(chosen.manhattan(at(9, 9)), 1);
    }

    #[test]
    fn test_positional_score_weights() {
        let mut board = Board::new();
        board.apply(at(9, 10), Color::Black);
        // Distance 1 own stone: 3 * 2 = 6, center bonus 9.
        assert_eq!(positional_score(&board, Coord::center(), Color::Black), 15.0);
        // Same stone as opponent: 3 * 1 = 3.
        assert_eq!(positional_score(&board, Coord::center(), Color::White), 12.0);
    }

    #[test]
    fn test_full_board_returns_none() {
        let mut board = Board::new();
        for c in crate::all_coords() {
            let color = if (c.row + c.col) % 2 == 0 { Color::Black } else { Color::White };
            board.apply(c, color);
        }
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_move(&board, Color::Black, &mut rng), None);
    }
}
