//! Grid positions, cardinal directions, and Manhattan distance.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// A cell coordinate on the dungeon grid.
///
/// Positions are plain values: every read is by copy, so no caller can
/// alias another entity's location. Row 0 is the top edge, column 0 the
/// left edge; coordinates are signed so that off-grid neighbours can be
/// represented and rejected by bounds checks rather than by underflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Row index (0 at the top edge).
    pub row: i32,
    /// Column index (0 at the left edge).
    pub col: i32,
}

impl Position {
    /// Create a position from row/column indices.
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to `other`: `|Δrow| + |Δcol|`.
    ///
    /// Distance 1 defines melee adjacency; distance ≤ 2 defines the
    /// fog-of-war reveal radius.
    pub fn manhattan_distance(&self, other: &Position) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The cell one step in `direction`. May be out of bounds; callers
    /// validate against their grid.
    pub fn step(&self, direction: Direction) -> Position {
        let (dr, dc) = direction.offset();
        Position::new(self.row + dr, self.col + dc)
    }

    /// The four cardinal neighbours of this cell, unvalidated.
    pub fn neighbours(&self) -> SmallVec<[Position; 4]> {
        Direction::ALL.iter().map(|d| self.step(*d)).collect()
    }

    /// The cardinal direction from this cell to an adjacent `target`,
    /// or `None` if `target` is not exactly one step away.
    pub fn direction_to(&self, target: &Position) -> Option<Direction> {
        Direction::ALL
            .iter()
            .copied()
            .find(|d| self.step(*d) == *target)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Cardinal direction for movement on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// One row up (row - 1).
    North,
    /// One row down (row + 1).
    South,
    /// One column right (col + 1).
    East,
    /// One column left (col - 1).
    West,
}

impl Direction {
    /// All four directions, in a fixed order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Returns the `(row_offset, col_offset)` for this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        };
        write!(f, "{name}")
    }
}
