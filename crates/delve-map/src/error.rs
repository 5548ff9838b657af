//! Error types for map construction and mutation.

use delve_core::{EntityId, Position};
use delve_entity::EntityKind;
use std::error::Error;
use std::fmt;

/// Errors from [`TileMap`](crate::TileMap) operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapError {
    /// The grid is smaller than the 10×10 minimum.
    TooSmall {
        /// Requested row count.
        rows: u32,
        /// Requested column count.
        cols: u32,
    },
    /// The map lock could not be acquired within its bounded timeout.
    /// Recoverable: the caller should treat the operation as "try
    /// again", not as fatal.
    LockTimeout,
    /// The position lies outside the grid.
    OutOfBounds {
        /// The offending position.
        pos: Position,
    },
    /// The target cell contains an occupant that blocks movement.
    Blocked {
        /// The cell that was refused.
        pos: Position,
        /// What blocked it.
        by: EntityKind,
    },
    /// The entity is not placed on this map.
    NotPlaced {
        /// The missing entity.
        id: EntityId,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSmall { rows, cols } => {
                write!(f, "map must be at least 10x10, got {rows}x{cols}")
            }
            Self::LockTimeout => write!(f, "map lock not acquired within timeout"),
            Self::OutOfBounds { pos } => write!(f, "position {pos} is outside the map"),
            Self::Blocked { pos, by } => write!(f, "cell {pos} is blocked by {by:?}"),
            Self::NotPlaced { id } => write!(f, "entity {id} is not on the map"),
        }
    }
}

impl Error for MapError {}
