//! Entity, character, and item model for the Delve simulation engine.
//!
//! Defines the stat-bearing structs that live in the world's entity
//! lists — [`Player`], [`Enemy`], [`Item`] — the [`Combatant`]
//! capability trait that combat resolution operates on, and the
//! name-keyed factories used by snapshot restore and enemy respawn.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod attributes;
pub mod combatant;
pub mod enemy;
pub mod error;
pub mod item;
pub mod player;

pub use attributes::Attributes;
pub use combatant::{CombatStyle, Combatant, MagicElement, Role};
pub use enemy::{Enemy, EnemyKind, ENEMY_BASE_POWER, ENEMY_MAX_HEALTH};
pub use error::FactoryError;
pub use item::{Item, ItemKind, HEALTH_POTION_HEAL, POWER_POTION_BOOST};
pub use player::{
    Player, PlayerBuilder, PlayerClass, PLAYER_BASE_EVASION, PLAYER_BASE_POWER, PLAYER_MAX_HEALTH,
};

/// What kind of thing occupies a map cell.
///
/// The map stores this alongside each placed entity ID so that
/// movement blocking can be decided without reaching back into the
/// world's entity lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// The player character.
    Player,
    /// An autonomous enemy.
    Enemy,
    /// An impassable wall.
    Wall,
    /// A pickup (potion or treasure).
    Item,
}

impl EntityKind {
    /// Whether this occupant blocks movement into its cell.
    pub fn blocks_movement(self) -> bool {
        matches!(self, EntityKind::Wall | EntityKind::Enemy)
    }
}
