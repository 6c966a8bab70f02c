//! Core domain types for five-in-a-row.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Side length of the square board.
pub const BOARD_SIZE: usize = 19;

/// Number of cells on the board.
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// Stones in an unbroken line needed to win.
pub const WIN_LENGTH: usize = 5;

/// Stone color. Black always moves first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Color {
    /// First mover.
    Black,
    /// Second mover.
    White,
}

impl Color {
    /// Returns the other color.
    pub fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}

/// A single intersection on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// No stone.
    Empty,
    /// Holds a stone of the given color.
    Stone(Color),
}

impl Cell {
    /// Returns the stone color, if any.
    pub fn color(self) -> Option<Color> {
        match self {
            Cell::Empty => None,
            Cell::Stone(color) => Some(color),
        }
    }
}

/// An in-bounds board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// Row, 0 at the top.
    pub row: usize,
    /// Column, 0 at the left.
    pub col: usize,
}

impl Coord {
    /// Creates a coordinate, returning `None` when it falls off the board.
    pub fn new(row: usize, col: usize) -> Option<Self> {
        (row < BOARD_SIZE && col < BOARD_SIZE).then_some(Self { row, col })
    }

    /// Creates a coordinate from untrusted signed input.
    pub fn checked(row: i64, col: i64) -> Option<Self> {
        let row = usize::try_from(row).ok()?;
        let col = usize::try_from(col).ok()?;
        Self::new(row, col)
    }

    /// Steps `n` times by `(dr, dc)`, returning `None` past the edge.
    pub fn offset(self, dr: isize, dc: isize, n: usize) -> Option<Self> {
        let n = isize::try_from(n).ok()?;
        let row = self.row.checked_add_signed(dr * n)?;
        let col = self.col.checked_add_signed(dc * n)?;
        Self::new(row, col)
    }

    /// Manhattan distance to another coordinate.
    pub fn manhattan(self, other: Coord) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The center intersection.
    pub fn center() -> Self {
        Self {
            row: BOARD_SIZE / 2,
            col: BOARD_SIZE / 2,
        }
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// 19x19 board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Returns the cell at `at`.
    pub fn get(&self, at: Coord) -> Cell {
        self.cells[at.row][at.col]
    }

    /// Checks whether `at` holds no stone.
    pub fn is_empty(&self, at: Coord) -> bool {
        self.get(at) == Cell::Empty
    }

    /// Places a stone. Legality is the caller's concern.
    pub fn apply(&mut self, at: Coord, color: Color) {
        self.cells[at.row][at.col] = Cell::Stone(color);
    }

    /// Returns a copy of this board with one more stone.
    pub fn with_stone(&self, at: Coord, color: Color) -> Self {
        let mut next = self.clone();
        next.apply(at, color);
        next
    }

    /// Number of occupied cells.
    pub fn stone_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| **cell != Cell::Empty)
            .count()
    }

    /// Empty coordinates in row-major order.
    pub fn empty_cells(&self) -> Vec<Coord> {
        all_coords().filter(|c| self.is_empty(*c)).collect()
    }

    /// Rows of the board, top to bottom.
    pub fn rows(&self) -> &[[Cell; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    /// Formats the board as a human-readable grid.
    ///
    /// `X` is black, `O` is white, `.` is empty.
    pub fn display(&self) -> String {
        let mut out = String::from("   ");
        for col in 0..BOARD_SIZE {
            out.push_str(&format!("{:>2}", col));
        }
        out.push('\n');
        for (row, cells) in self.cells.iter().enumerate() {
            out.push_str(&format!("{:>2} ", row));
            for cell in cells {
                let symbol = match cell {
                    Cell::Empty => '.',
                    Cell::Stone(Color::Black) => 'X',
                    Cell::Stone(Color::White) => 'O',
                };
                out.push(' ');
                out.push(symbol);
            }
            out.push('\n');
        }
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterates over every coordinate in row-major order.
pub fn all_coords() -> impl Iterator<Item = Coord> {
    (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Coord { row, col }))
}

/// Lifecycle status of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Moves are accepted.
    Active,
    /// Won, drawn or abandoned.
    Finished,
}

/// How a game ended, if it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Outcome {
    /// Still being played.
    None,
    /// Black made five in a row.
    BlackWon,
    /// White made five in a row.
    WhiteWon,
    /// Board filled with no winner.
    Draw,
    /// A participant quit or never came back.
    Abandoned,
}

impl Outcome {
    /// Outcome for a win by `color`.
    pub fn won_by(color: Color) -> Self {
        match color {
            Color::Black => Outcome::BlackWon,
            Color::White => Outcome::WhiteWon,
        }
    }

    /// Returns the winning color, if any.
    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::BlackWon => Some(Color::Black),
            Outcome::WhiteWon => Some(Color::White),
            _ => None,
        }
    }
}

/// One recorded move. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Move {
    at: Coord,
    color: Color,
    sequence: u32,
    played_at: DateTime<Utc>,
}

impl Move {
    /// Records a move now.
    pub fn new(at: Coord, color: Color, sequence: u32) -> Self {
        Self {
            at,
            color,
            sequence,
            played_at: Utc::now(),
        }
    }
}
