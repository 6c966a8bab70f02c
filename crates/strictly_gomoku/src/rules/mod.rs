//! Game rules for five-in-a-row.
//!
//! Pure functions over a [`Board`](crate::Board). Rules are kept apart from
//! the game state so the heuristic opponent can probe hypothetical moves with
//! the exact same checks the referee uses.

pub mod draw;
pub mod legality;
pub mod win;

pub use draw::is_draw;
pub use legality::{IllegalMove, is_legal};
pub use win::{Axis, Run, WinningLine, check_win, run_through};
