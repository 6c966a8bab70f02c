//! Move legality.

use crate::{Board, Color, Coord, GameStatus};
use derive_more::{Display, Error};
use tracing::instrument;

/// Why a move was refused. The display text is sent to clients verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Error)]
pub enum IllegalMove {
    /// Row or column outside `[0, 19)`.
    #[display("Position out of bounds")]
    OutOfBounds,
    /// A stone is already there.
    #[display("Position already occupied")]
    Occupied,
    /// The mover's color is not the color to play.
    #[display("Not your turn")]
    WrongTurn,
    /// The game is over.
    #[display("Game is not active")]
    NotActive,
}

/// Checks a proposed move, returning the validated coordinate.
///
/// Checks run in a fixed order: bounds, occupancy, turn, status.
#[instrument(skip(board))]
pub fn is_legal(
    board: &Board,
    row: i64,
    col: i64,
    color: Color,
    turn: Color,
    status: GameStatus,
) -> Result<Coord, IllegalMove> {
    let at = Coord::checked(row, col).ok_or(IllegalMove::OutOfBounds)?;
    if !board.is_empty(at) {
        return Err(IllegalMove::Occupied);
    }
    if color != turn {
        return Err(IllegalMove::WrongTurn);
    }
    if status != GameStatus::Active {
        return Err(IllegalMove::NotActive);
    }
    Ok(at)
}
