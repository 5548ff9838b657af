//! Time-boxed stat and behaviour modifiers for the Delve engine.
//!
//! An effect is a tagged record — kind, activation window, and a small
//! amount of per-kind runtime state — tracked *beside* the character it
//! modifies, never replacing it. The [`EffectRegistry`] owns all
//! records in a concurrency-safe table whose lock is independent of the
//! world lock, folds active effects into effective power, intercepts
//! incoming damage, and hands world-level consequences (teleports,
//! explosions) back to the orchestrator as data.
//!
//! Expiry is a pure function of wall-clock time; the
//! [`EffectSweeper`] thread detaches expired records once per second so
//! the registry does not grow without bound.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod effect;
mod error;
mod registry;
mod sweep;

pub use effect::{
    Effect, EffectKind, BOOSTED_ATTACK_MULTIPLIER, ENEMY_EFFECTS, ENRAGE_MAX_BONUS,
    EXPLOSION_DAMAGE_FRACTION, EXPLOSION_RANGE, LIFE_STEAL_FRACTION, MAGIC_AMPLIFIER_MULTIPLIER,
    PLAYER_EFFECTS, REGEN_HEAL_FRACTION, REGEN_INTERVAL, SHIELD_BLOCK_RESET,
    SHIELD_DAMAGE_REDUCTION, SPEED_BOOST_TURN, TELEPORT_HEALTH_THRESHOLD,
};
pub use error::EffectError;
pub use registry::EffectRegistry;
pub use sweep::{EffectSweeper, SWEEP_INTERVAL};
