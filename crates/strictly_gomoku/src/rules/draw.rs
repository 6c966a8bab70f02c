//! Draw detection.

use crate::CELL_COUNT;

/// True once every cell is filled.
///
/// Only meaningful when the move that filled the last cell did not win;
/// callers check for a win first.
pub fn is_draw(move_count: usize) -> bool {
    move_count == CELL_COUNT
}
