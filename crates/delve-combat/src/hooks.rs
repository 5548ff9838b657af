//! The [`CombatHooks`] extension seam and deferred reactions.

use delve_core::{EntityId, Position};
use delve_entity::Combatant;

/// A world-level consequence computed during combat but applied by the
/// orchestrator afterwards.
///
/// Combat itself mutates nothing beyond the two combatants' health;
/// anything that needs the map or the entity lists (relocation, splash
/// damage) is returned as data instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CombatReaction {
    /// Relocate the target to a random free cell.
    Teleport {
        /// The character to relocate.
        target: EntityId,
    },
    /// Deal area damage around a death site.
    Explode {
        /// Center of the blast.
        at: Position,
        /// Damage applied to each player in range.
        damage: i32,
        /// Blast radius in Manhattan distance.
        range: u32,
    },
}

/// Effect-system hooks consulted at fixed points of every attack.
///
/// The default implementation of every method is a pass-through, so a
/// hookless exchange (see [`NoHooks`]) behaves exactly like the bare
/// attribute model. Implementations use interior mutability — hooks
/// are invoked through `&self` from within the combat loop.
pub trait CombatHooks {
    /// The attacker's power after folding in active effects.
    fn effective_power(&self, attacker: &dyn Combatant) -> i32 {
        attacker.power()
    }

    /// Give active effects the chance to absorb incoming damage.
    /// Returns the damage that still applies (0 for a full block).
    fn absorb_damage(&self, target: &dyn Combatant, amount: i32) -> i32 {
        let _ = target;
        amount
    }

    /// Called after the attacker lands a hit for `damage_dealt` actual
    /// health. Returns the health the attacker steals back.
    fn after_attack(&self, attacker: &dyn Combatant, damage_dealt: i32) -> i32 {
        let _ = (attacker, damage_dealt);
        0
    }

    /// Reactions triggered by the target's new health after damage
    /// (e.g. a low-health teleport).
    fn after_damage(&self, target: &dyn Combatant) -> Vec<CombatReaction> {
        let _ = target;
        Vec::new()
    }

    /// Reactions triggered by a combatant's death (e.g. an explosion).
    fn death_reactions(&self, fallen: &dyn Combatant) -> Vec<CombatReaction> {
        let _ = fallen;
        Vec::new()
    }
}

/// Hook implementation with no effects: every method passes through.
#[derive(Debug, Default)]
pub struct NoHooks;

impl CombatHooks for NoHooks {}
