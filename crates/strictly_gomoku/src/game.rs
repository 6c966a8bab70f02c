//! Single-game state machine: board, turn, status, outcome and move log.

use crate::invariants::{
    InvariantSet, InvariantViolation, OccupancyMatchesHistory, OutcomeBackedByLine,
};
use crate::rules::{IllegalMove, WinningLine, check_win, is_draw, is_legal};
use crate::{Board, Color, Coord, GameStatus, Move, Outcome};
use tracing::{debug, instrument};

/// What a successful placement did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Play continues with the other color.
    Continue,
    /// The mover completed five in a row.
    Won(WinningLine),
    /// The last empty cell was filled without a win.
    Draw,
}

/// Five-in-a-row game engine.
#[derive(Debug, Clone)]
pub struct Game {
    pub(crate) board: Board,
    pub(crate) turn: Color,
    pub(crate) status: GameStatus,
    pub(crate) outcome: Outcome,
    pub(crate) history: Vec<Move>,
    pub(crate) winning_line: Option<WinningLine>,
}

impl Game {
    /// Creates a fresh game with black to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn: Color::Black,
            status: GameStatus::Active,
            outcome: Outcome::None,
            history: Vec::new(),
            winning_line: None,
        }
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Color to move.
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Lifecycle status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Outcome so far.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Ordered move log.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Number of moves played.
    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    /// Most recent move.
    pub fn last_move(&self) -> Option<&Move> {
        self.history.last()
    }

    /// The line that decided the game, if it was won.
    pub fn winning_line(&self) -> Option<&WinningLine> {
        self.winning_line.as_ref()
    }

    /// Checks whether moves are still accepted.
    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    /// Empty cells in row-major order.
    pub fn empty_cells(&self) -> Vec<Coord> {
        self.board.empty_cells()
    }

    /// Validates and plays `color` at `(row, col)`.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalMove`] and leaves the game untouched if the move is
    /// off the board, onto a stone, out of turn, or after the game ended.
    #[instrument(skip(self), fields(turn = %self.turn, moves = self.history.len()))]
    pub fn place(&mut self, row: i64, col: i64, color: Color) -> Result<Placement, IllegalMove> {
        let at = is_legal(&self.board, row, col, color, self.turn, self.status)?;

        self.board.apply(at, color);
        let sequence = u32::try_from(self.history.len() + 1).unwrap_or(u32::MAX);
        self.history.push(Move::new(at, color, sequence));

        if let Some(line) = check_win(&self.board, at, color) {
            debug!(%color, ?line, "Five in a row");
            self.status = GameStatus::Finished;
            self.outcome = Outcome::won_by(color);
            self.winning_line = Some(line);
            return Ok(Placement::Won(line));
        }

        if is_draw(self.history.len()) {
            debug!("Board full, draw");
            self.status = GameStatus::Finished;
            self.outcome = Outcome::Draw;
            return Ok(Placement::Draw);
        }

        self.turn = color.opponent();
        Ok(Placement::Continue)
    }

    /// Restores the initial empty position with black to move.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Stops play. An undecided game becomes abandoned; a decided result
    /// and its winning line stand.
    pub fn abandon(&mut self) {
        self.status = GameStatus::Finished;
        if self.outcome == Outcome::None {
            self.outcome = Outcome::Abandoned;
        }
    }

    /// Runs every game invariant.
    ///
    /// # Errors
    ///
    /// Returns all violated invariants. A violation means the engine itself is
    /// broken; it is never caused by client input.
    pub fn check_invariants(&self) -> Result<(), Vec<InvariantViolation>> {
        <(OccupancyMatchesHistory, OutcomeBackedByLine)>::check_all(self)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
