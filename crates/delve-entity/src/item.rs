//! Item kinds and the item factory registry.

use crate::error::FactoryError;
use delve_core::{EntityId, Position};
use std::fmt;

/// Health restored by a health potion.
pub const HEALTH_POTION_HEAL: i32 = 30;

/// Base-power increase granted by a power potion.
pub const POWER_POTION_BOOST: i32 = 5;

/// The item catalogue; doubles as the item factory registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    /// Restores [`HEALTH_POTION_HEAL`] health when drunk.
    HealthPotion,
    /// Permanently raises base power by [`POWER_POTION_BOOST`].
    PowerPotion,
    /// Loot dropped by a defeated enemy; adds to the treasure counter
    /// on pickup.
    Treasure {
        /// Treasure-point value credited on pickup.
        value: u32,
    },
    /// Impassable terrain. Never picked up.
    Wall,
}

impl ItemKind {
    /// The registry name for this kind, as stored in snapshots.
    pub fn name(self) -> &'static str {
        match self {
            ItemKind::HealthPotion => "HealthPotion",
            ItemKind::PowerPotion => "PowerPotion",
            ItemKind::Treasure { .. } => "Treasure",
            ItemKind::Wall => "Wall",
        }
    }

    /// Look up a kind by its registry name.
    ///
    /// A restored treasure carries no value — the snapshot record does
    /// not preserve it.
    pub fn from_name(name: &str) -> Result<Self, FactoryError> {
        match name {
            "HealthPotion" => Ok(ItemKind::HealthPotion),
            "PowerPotion" => Ok(ItemKind::PowerPotion),
            "Treasure" => Ok(ItemKind::Treasure { value: 0 }),
            "Wall" => Ok(ItemKind::Wall),
            other => Err(FactoryError::UnknownItemKind {
                name: other.to_string(),
            }),
        }
    }

    /// Map display glyph.
    pub fn symbol(self) -> char {
        match self {
            ItemKind::HealthPotion => '!',
            ItemKind::PowerPotion => '+',
            ItemKind::Treasure { .. } => '$',
            ItemKind::Wall => '#',
        }
    }

    /// Whether this item can enter a player inventory.
    pub fn is_carriable(self) -> bool {
        matches!(self, ItemKind::HealthPotion | ItemKind::PowerPotion)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An item placed on the map or carried in an inventory.
#[derive(Clone, Debug)]
pub struct Item {
    id: EntityId,
    kind: ItemKind,
    pos: Position,
}

impl Item {
    /// New item of `kind` at `pos`.
    pub fn new(kind: ItemKind, pos: Position) -> Self {
        Self {
            id: EntityId::next(),
            kind,
            pos,
        }
    }

    /// Stable identifier.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// This item's kind.
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Where the item sits on the map. Meaningless once carried.
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Relocate the item (snapshot restore).
    pub fn set_position(&mut self, pos: Position) {
        self.pos = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_round_trips() {
        for kind in [
            ItemKind::HealthPotion,
            ItemKind::PowerPotion,
            ItemKind::Treasure { value: 150 },
            ItemKind::Wall,
        ] {
            let restored = ItemKind::from_name(kind.name()).unwrap();
            assert_eq!(restored.name(), kind.name());
        }
    }

    #[test]
    fn from_name_rejects_unknown() {
        assert!(matches!(
            ItemKind::from_name("Scroll"),
            Err(FactoryError::UnknownItemKind { .. })
        ));
    }

    #[test]
    fn only_potions_are_carriable() {
        assert!(ItemKind::HealthPotion.is_carriable());
        assert!(ItemKind::PowerPotion.is_carriable());
        assert!(!ItemKind::Treasure { value: 10 }.is_carriable());
        assert!(!ItemKind::Wall.is_carriable());
    }
}
