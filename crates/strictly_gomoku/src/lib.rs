//! Strictly Gomoku - authoritative five-in-a-row rules.
//!
//! Pure game logic with no I/O and no async: the board engine, the
//! single-game state machine, first-class invariants and the heuristic
//! opponent. The server crate builds sessions on top of this.
//!
//! # Example
//!
//! ```
//! use strictly_gomoku::{Color, Game, Placement};
//!
//! let mut game = Game::new();
//! assert_eq!(game.place(9, 9, Color::Black), Ok(Placement::Continue));
//! assert_eq!(game.turn(), Color::White);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod game;
pub mod heuristic;
pub mod invariants;
pub mod rules;
mod types;

pub use game::{Game, Placement};
pub use heuristic::{Reason, select_move};
pub use invariants::InvariantViolation;
pub use rules::{IllegalMove, WinningLine, check_win, is_draw, is_legal};
pub use types::{
    BOARD_SIZE, Board, CELL_COUNT, Cell, Color, Coord, GameStatus, Move, Outcome, WIN_LENGTH,
    all_coords,
};
