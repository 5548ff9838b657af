//! The [`Combatant`] capability trait and combat-style types.
//!
//! Combat participation is a capability, not a base class: anything
//! that exposes health, power, evasion, a position, and a combat style
//! can stand on either side of an exchange. [`Player`](crate::Player)
//! and [`Enemy`](crate::Enemy) both implement it; combat resolution
//! only ever sees `&mut dyn Combatant`.

use delve_core::{EntityId, Position};
use std::fmt;

/// How a combatant projects force.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatStyle {
    /// Fights only at Manhattan distance exactly 1.
    Melee,
    /// Fights at any Manhattan distance up to `radius` (inclusive).
    Ranged {
        /// Maximum reach in Manhattan distance.
        radius: u32,
    },
}

impl CombatStyle {
    /// Whether an attack can land at the given Manhattan distance.
    pub fn reaches(self, distance: u32) -> bool {
        match self {
            CombatStyle::Melee => distance == 1,
            CombatStyle::Ranged { radius } => distance >= 1 && distance <= radius,
        }
    }
}

/// Elemental affinity carried by magic-capable characters.
///
/// Characters without an affinity report `None` from
/// [`Combatant::element`]; the magic-amplifier effect only applies to
/// characters that report one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MagicElement {
    /// Fire affinity.
    Fire,
    /// Ice affinity.
    Ice,
    /// Lightning affinity.
    Lightning,
}

impl fmt::Display for MagicElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MagicElement::Fire => "fire",
            MagicElement::Ice => "ice",
            MagicElement::Lightning => "lightning",
        };
        write!(f, "{name}")
    }
}

/// Which side of the board a character belongs to.
///
/// Effects are role-gated: player effects cannot be applied to enemies
/// and vice versa.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The player character.
    Player,
    /// An autonomous enemy.
    Enemy,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player => write!(f, "player"),
            Role::Enemy => write!(f, "enemy"),
        }
    }
}

/// Capability for participating in combat.
pub trait Combatant {
    /// Stable identifier, used to look up effects for this character.
    fn id(&self) -> EntityId;

    /// Display name ("Aria", "Goblin").
    fn display_name(&self) -> &str;

    /// Which role this combatant plays.
    fn role(&self) -> Role;

    /// Current cell.
    fn position(&self) -> Position;

    /// Current health.
    fn health(&self) -> i32;

    /// Health ceiling.
    fn max_health(&self) -> i32;

    /// Base attack power, before effect multipliers.
    fn power(&self) -> i32;

    /// Chance in `[0, 1]` to evade an incoming attack.
    fn evasion_chance(&self) -> f64;

    /// How this combatant projects force.
    fn style(&self) -> CombatStyle;

    /// Chance in `[0, 1]` that a landed attack deals double damage.
    fn critical_chance(&self) -> f64 {
        0.0
    }

    /// Elemental affinity, if any.
    fn element(&self) -> Option<MagicElement> {
        None
    }

    /// Whether this combatant is dead.
    fn is_dead(&self) -> bool {
        self.health() <= 0
    }

    /// Apply damage, clamped at zero health.
    fn apply_damage(&mut self, amount: i32);

    /// Heal, clamped at max health.
    fn heal(&mut self, amount: i32);
}
