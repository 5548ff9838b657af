//! Factory error types.

use std::error::Error;
use std::fmt;

/// Errors from the name-keyed entity factories.
///
/// An unknown type name is a usage error: snapshots and saved games
/// only ever contain names the factories themselves produced, so a
/// miss indicates a programming mistake, not a runtime condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FactoryError {
    /// No enemy kind is registered under this name.
    UnknownEnemyKind {
        /// The unrecognized name.
        name: String,
    },
    /// No player class is registered under this name.
    UnknownPlayerClass {
        /// The unrecognized name.
        name: String,
    },
    /// No item kind is registered under this name.
    UnknownItemKind {
        /// The unrecognized name.
        name: String,
    },
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEnemyKind { name } => write!(f, "unknown enemy kind '{name}'"),
            Self::UnknownPlayerClass { name } => write!(f, "unknown player class '{name}'"),
            Self::UnknownItemKind { name } => write!(f, "unknown item kind '{name}'"),
        }
    }
}

impl Error for FactoryError {}
