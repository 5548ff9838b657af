//! Position-indexed entity storage and movement for the Delve engine.
//!
//! [`TileMap`] is the spatial half of the shared world state: a fixed
//! rows×cols grid mapping each position to the ordered list of
//! entities occupying that cell, plus the fog-of-war visibility flag
//! for each placed entity. Stat-bearing entity structs stay in the
//! world's lists; the map deals purely in IDs and kinds.
//!
//! All mutation is serialized by a single internal lock acquired with a
//! bounded deadline — a stalled caller surfaces as
//! [`MapError::LockTimeout`] instead of deadlocking concurrent enemy
//! ticks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod error;
mod grid;

pub use error::MapError;
pub use grid::{Occupant, TileMap, DEFAULT_LOCK_TIMEOUT, MIN_DIMENSION, REVEAL_RADIUS};
