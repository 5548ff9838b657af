//! Player classes, the player character, and the validating builder.

use crate::attributes::Attributes;
use crate::combatant::{CombatStyle, Combatant, MagicElement, Role};
use crate::error::FactoryError;
use crate::item::Item;
use delve_core::{EntityId, Position};
use std::fmt;

/// Default player health ceiling.
pub const PLAYER_MAX_HEALTH: i32 = 100;

/// Default player base power.
pub const PLAYER_BASE_POWER: i32 = 10;

/// Default player evasion chance.
pub const PLAYER_BASE_EVASION: f64 = 0.25;

/// The player class catalogue; doubles as the player factory registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerClass {
    /// Melee fighter with a modest critical chance.
    Warrior,
    /// Ranged caster with a fire affinity.
    Mage,
    /// Long-reach ranged attacker.
    Archer,
}

impl PlayerClass {
    /// Every registered class.
    pub const ALL: [PlayerClass; 3] = [PlayerClass::Warrior, PlayerClass::Mage, PlayerClass::Archer];

    /// The registry name for this class, as stored in snapshots.
    pub fn name(self) -> &'static str {
        match self {
            PlayerClass::Warrior => "Warrior",
            PlayerClass::Mage => "Mage",
            PlayerClass::Archer => "Archer",
        }
    }

    /// Look up a class by its registry name.
    pub fn from_name(name: &str) -> Result<Self, FactoryError> {
        match name {
            "Warrior" => Ok(PlayerClass::Warrior),
            "Mage" => Ok(PlayerClass::Mage),
            "Archer" => Ok(PlayerClass::Archer),
            other => Err(FactoryError::UnknownPlayerClass {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PlayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The player character.
///
/// Exactly one is active per game. Carries an inventory of picked-up
/// items and a running treasure-point counter.
#[derive(Clone, Debug)]
pub struct Player {
    id: EntityId,
    name: String,
    class: PlayerClass,
    pos: Position,
    stats: Attributes,
    treasure_points: u32,
    inventory: Vec<Item>,
}

impl Player {
    /// New player with default attributes at the given position.
    pub fn new(name: impl Into<String>, class: PlayerClass, pos: Position) -> Self {
        PlayerBuilder::new(name, class).build(pos)
    }

    /// This player's class.
    pub fn class(&self) -> PlayerClass {
        self.class
    }

    /// Accumulated treasure points.
    pub fn treasure_points(&self) -> u32 {
        self.treasure_points
    }

    /// Add to the treasure-point counter.
    pub fn add_treasure_points(&mut self, value: u32) {
        self.treasure_points += value;
    }

    /// The items currently carried.
    pub fn inventory(&self) -> &[Item] {
        &self.inventory
    }

    /// Put an item into the inventory.
    pub fn add_to_inventory(&mut self, item: Item) {
        self.inventory.push(item);
    }

    /// Remove and return the carried item with the given ID, if any.
    pub fn take_from_inventory(&mut self, id: EntityId) -> Option<Item> {
        let idx = self.inventory.iter().position(|i| i.id() == id)?;
        Some(self.inventory.remove(idx))
    }

    /// Move this player's recorded position. The map placement is
    /// updated separately by the orchestrator.
    pub fn set_position(&mut self, pos: Position) {
        self.pos = pos;
    }

    /// Overwrite base power (power waves, power potions, restore).
    pub fn set_power(&mut self, power: i32) {
        self.stats.set_power(power);
    }

    /// Overwrite health, clamped into range (snapshot restore).
    pub fn set_health(&mut self, health: i32) {
        self.stats.set_health(health);
    }

    /// Overwrite evasion chance (snapshot restore).
    pub fn set_evasion_chance(&mut self, chance: f64) {
        self.stats.set_evasion_chance(chance);
    }
}

impl Combatant for Player {
    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Player
    }

    fn position(&self) -> Position {
        self.pos
    }

    fn health(&self) -> i32 {
        self.stats.health()
    }

    fn max_health(&self) -> i32 {
        self.stats.max_health()
    }

    fn power(&self) -> i32 {
        self.stats.power()
    }

    fn evasion_chance(&self) -> f64 {
        self.stats.evasion_chance()
    }

    fn style(&self) -> CombatStyle {
        match self.class {
            PlayerClass::Warrior => CombatStyle::Melee,
            PlayerClass::Mage => CombatStyle::Ranged { radius: 3 },
            PlayerClass::Archer => CombatStyle::Ranged { radius: 4 },
        }
    }

    fn critical_chance(&self) -> f64 {
        match self.class {
            PlayerClass::Warrior => 0.10,
            PlayerClass::Archer => 0.15,
            PlayerClass::Mage => 0.0,
        }
    }

    fn element(&self) -> Option<MagicElement> {
        match self.class {
            PlayerClass::Mage => Some(MagicElement::Fire),
            _ => None,
        }
    }

    fn apply_damage(&mut self, amount: i32) {
        self.stats.apply_damage(amount);
    }

    fn heal(&mut self, amount: i32) {
        self.stats.heal(amount);
    }
}

/// Validating builder for player characters.
///
/// Attribute tweaks are bounded relative to the class defaults: each
/// attribute may be raised by at most 3 points or lowered by at most 2
/// (evasion counts in whole percentage points). Out-of-bounds tweaks
/// are ignored and the previous value kept, so a build always succeeds.
#[derive(Clone, Debug)]
pub struct PlayerBuilder {
    name: String,
    class: PlayerClass,
    health: i32,
    power: i32,
    evasion_chance: f64,
}

impl PlayerBuilder {
    /// Start from the class defaults.
    pub fn new(name: impl Into<String>, class: PlayerClass) -> Self {
        Self {
            name: name.into(),
            class,
            health: PLAYER_MAX_HEALTH,
            power: PLAYER_BASE_POWER,
            evasion_chance: PLAYER_BASE_EVASION,
        }
    }

    /// Request a health ceiling. Accepted iff within `-2..=+3` of the
    /// default.
    pub fn health(mut self, health: i32) -> Self {
        if (-2..=3).contains(&(health - PLAYER_MAX_HEALTH)) {
            self.health = health;
        }
        self
    }

    /// Request a base power. Accepted iff within `-2..=+3` of the
    /// default.
    pub fn power(mut self, power: i32) -> Self {
        if (-2..=3).contains(&(power - PLAYER_BASE_POWER)) {
            self.power = power;
        }
        self
    }

    /// Request an evasion chance. Accepted iff within −2..+3
    /// percentage points of the default.
    pub fn evasion_chance(mut self, chance: f64) -> Self {
        let delta_points = (chance - PLAYER_BASE_EVASION) * 100.0;
        if (-2.0..=3.0).contains(&delta_points) {
            self.evasion_chance = chance;
        }
        self
    }

    /// Build the player at the given position.
    pub fn build(self, pos: Position) -> Player {
        Player {
            id: EntityId::next(),
            name: self.name,
            class: self.class,
            pos,
            stats: Attributes::new(self.health, self.power, self.evasion_chance),
            treasure_points: 0,
            inventory: Vec::new(),
        }
    }
}
