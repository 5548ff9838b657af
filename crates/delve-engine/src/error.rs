//! Engine error taxonomy: usage errors, abandoned actions, and
//! restore failures.

use delve_core::EntityId;
use delve_entity::FactoryError;
use delve_map::MapError;
use std::error::Error;
use std::fmt;

/// Lifecycle usage errors. These indicate programming mistakes, not
/// runtime conditions, and are surfaced immediately at the call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldError {
    /// `initialize` was called twice.
    AlreadyInitialized,
    /// `attach_map` was called twice.
    MapAlreadyAttached,
    /// An operation needed the map before `attach_map`.
    MapNotAttached,
    /// An operation needed entities before `initialize`.
    NotInitialized,
    /// `start` was called while the world was already running.
    AlreadyRunning,
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "world already initialized"),
            Self::MapAlreadyAttached => write!(f, "map already attached"),
            Self::MapNotAttached => write!(f, "no map attached"),
            Self::NotInitialized => write!(f, "world not initialized"),
            Self::AlreadyRunning => write!(f, "world already running"),
        }
    }
}

impl Error for WorldError {}

/// Why a player action did not happen.
///
/// Every variant except `Usage` is recoverable: the action is simply
/// reported as not-performed, with no state change, and the caller may
/// retry on the next input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionError {
    /// The world lock was unavailable; the action was abandoned.
    /// Drop the input and try again rather than queueing.
    Contended,
    /// A lifecycle precondition was violated.
    Usage(WorldError),
    /// The referenced enemy is not alive on the board.
    NoSuchEnemy {
        /// The referenced ID.
        id: EntityId,
    },
    /// The referenced item is not available.
    NoSuchItem {
        /// The referenced ID.
        id: EntityId,
    },
    /// The requested move target is not adjacent to the player.
    NotAdjacent,
    /// The map refused the mutation (blocked cell, bounds, or its own
    /// lock timeout).
    Map(MapError),
    /// The item has no usable effect.
    NoEffect,
    /// The player is dead; the game is over.
    PlayerDead,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contended => write!(f, "world lock unavailable, action abandoned"),
            Self::Usage(e) => write!(f, "{e}"),
            Self::NoSuchEnemy { id } => write!(f, "no living enemy {id}"),
            Self::NoSuchItem { id } => write!(f, "no such item {id}"),
            Self::NotAdjacent => write!(f, "target cell is not adjacent"),
            Self::Map(e) => write!(f, "map: {e}"),
            Self::NoEffect => write!(f, "item has no usable effect"),
            Self::PlayerDead => write!(f, "the player is dead"),
        }
    }
}

impl Error for ActionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Usage(e) => Some(e),
            Self::Map(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WorldError> for ActionError {
    fn from(e: WorldError) -> Self {
        Self::Usage(e)
    }
}

impl From<MapError> for ActionError {
    fn from(e: MapError) -> Self {
        Self::Map(e)
    }
}

/// Errors while rebuilding the world from a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestoreError {
    /// A lifecycle precondition was violated.
    Usage(WorldError),
    /// A stored type name is not registered with its factory.
    Factory(FactoryError),
    /// The map refused a placement.
    Map(MapError),
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(e) => write!(f, "{e}"),
            Self::Factory(e) => write!(f, "factory: {e}"),
            Self::Map(e) => write!(f, "map: {e}"),
        }
    }
}

impl Error for RestoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Usage(e) => Some(e),
            Self::Factory(e) => Some(e),
            Self::Map(e) => Some(e),
        }
    }
}

impl From<WorldError> for RestoreError {
    fn from(e: WorldError) -> Self {
        Self::Usage(e)
    }
}

impl From<FactoryError> for RestoreError {
    fn from(e: FactoryError) -> Self {
        Self::Factory(e)
    }
}

impl From<MapError> for RestoreError {
    fn from(e: MapError) -> Self {
        Self::Map(e)
    }
}
