//! Win detection around a single pivot stone.
//!
//! Only lines through the last stone can have changed, so every check is
//! bounded by the four axes through that cell instead of a full board scan.

use crate::{Board, Cell, Color, Coord, WIN_LENGTH};
use strum::IntoEnumIterator;

/// Five coordinates of a winning line, in board (row-major) order.
pub type WinningLine = [Coord; WIN_LENGTH];

/// One of the four line directions through a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
pub enum Axis {
    /// Left to right.
    Horizontal,
    /// Top to bottom.
    Vertical,
    /// Top-left to bottom-right.
    Diagonal,
    /// Top-right to bottom-left.
    AntiDiagonal,
}

impl Axis {
    /// Row and column step in the forward direction.
    ///
    /// Forward always increases the row-major index, so walking backward
    /// then forward visits cells in board order.
    pub fn step(self) -> (isize, isize) {
        match self {
            Axis::Horizontal => (0, 1),
            Axis::Vertical => (1, 0),
            Axis::Diagonal => (1, 1),
            Axis::AntiDiagonal => (1, -1),
        }
    }
}

/// Contiguous same-color stones on either side of a pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// Stones behind the pivot.
    pub backward: usize,
    /// Stones ahead of the pivot.
    pub forward: usize,
}

impl Run {
    /// Length of the run including the pivot itself.
    pub fn len(&self) -> usize {
        self.backward + self.forward + 1
    }
}

fn count_from(board: &Board, at: Coord, color: Color, dr: isize, dc: isize) -> usize {
    (1..)
        .map_while(|n| at.offset(dr, dc, n))
        .take_while(|c| board.get(*c) == Cell::Stone(color))
        .count()
}

/// Measures the run of `color` through `at` along `axis`.
///
/// The pivot is treated as holding `color` whatever is actually there, so
/// this answers "how long would the line be if `color` played here".
pub fn run_through(board: &Board, at: Coord, color: Color, axis: Axis) -> Run {
    let (dr, dc) = axis.step();
    Run {
        backward: count_from(board, at, color, -dr, -dc),
        forward: count_from(board, at, color, dr, dc),
    }
}

/// Checks whether `color` at `at` completes five or more in a row.
///
/// Longer runs also win. The returned line always contains the pivot and is
/// in board order. Like [`run_through`], the pivot cell itself is not read, so
/// the same call validates a stone just played and probes an empty cell.
pub fn check_win(board: &Board, at: Coord, color: Color) -> Option<WinningLine> {
    Axis::iter().find_map(|axis| {
        let run = run_through(board, at, color, axis);
        if run.len() < WIN_LENGTH {
            return None;
        }
        let (dr, dc) = axis.step();
        let back = run.backward.min(WIN_LENGTH - 1);
        let start = at.offset(-dr, -dc, back)?;
        let mut line = [start; WIN_LENGTH];
        for (n, slot) in line.iter_mut().enumerate() {
            *slot = start.offset(dr, dc, n)?;
        }
        Some(line)
    })
}
