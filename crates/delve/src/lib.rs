//! Delve: a concurrent tile-based dungeon-crawler simulation engine.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Delve sub-crates. For most users, adding `delve` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use delve::prelude::*;
//! use std::sync::Arc;
//!
//! // A 10x10 world with one warrior and one goblin, built by hand.
//! let config = WorldConfig::default();
//! let world = Arc::new(World::new(
//!     config.clone(),
//!     Arc::new(NullSink),
//!     Arc::new(NullSink),
//! )?);
//! world.attach_map(TileMap::new(config.rows, config.cols)?)?;
//!
//! let player = Player::new("Aria", PlayerClass::Warrior, Position::new(5, 5));
//! let map = world.map()?;
//! map.place(player.position(), player.id(), EntityKind::Player)?;
//!
//! let mut rng = rand::thread_rng();
//! let goblin = Enemy::spawn(EnemyKind::Goblin, Position::new(5, 6), &mut rng);
//! map.place(goblin.position(), goblin.id(), EntityKind::Enemy)?;
//! let goblin_id = goblin.id();
//!
//! world.initialize(player, vec![goblin], vec![])?;
//!
//! // Fight the adjacent goblin and inspect the battle history.
//! world.attack(goblin_id)?;
//! assert_eq!(world.battle_history().len(), 1);
//!
//! // Capture a restorable snapshot.
//! let snapshot = world.capture_snapshot()?;
//! assert_eq!(snapshot.player.name, "Aria");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`core`] | `delve-core` | Positions, directions, IDs, collaborator traits |
//! | [`entity`] | `delve-entity` | Characters, items, combat capabilities, factories |
//! | [`combat`] | `delve-combat` | Combat resolution and battle results |
//! | [`map`] | `delve-map` | The tile grid and its bounded lock |
//! | [`effects`] | `delve-effects` | Time-boxed effects, registry, expiry sweep |
//! | [`engine`] | `delve-engine` | The world orchestrator and snapshots |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Positions, directions, IDs, and collaborator traits (`delve-core`).
pub use delve_core as core;

/// The entity, character, and item model (`delve-entity`).
pub use delve_entity as entity;

/// Combat resolution (`delve-combat`).
pub use delve_combat as combat;

/// The tile grid and its bounded lock (`delve-map`).
pub use delve_map as map;

/// Time-boxed effects and their registry (`delve-effects`).
pub use delve_effects as effects;

/// The world orchestrator, scheduling, and snapshots (`delve-engine`).
pub use delve_engine as engine;

/// Common imports for typical Delve usage.
///
/// ```rust
/// use delve::prelude::*;
/// ```
pub mod prelude {
    // Core types and collaborator traits.
    pub use delve_core::{
        AudioSink, Direction, EntityId, EventSink, NullSink, Position, WorldObserver,
    };

    // Entities and capabilities.
    pub use delve_entity::{
        CombatStyle, Combatant, Enemy, EnemyKind, EntityKind, Item, ItemKind, MagicElement,
        Player, PlayerBuilder, PlayerClass, Role,
    };

    // Combat.
    pub use delve_combat::{resolve_combat, BattleResult, CombatHooks, CombatReaction, NoHooks};

    // Map.
    pub use delve_map::{MapError, Occupant, TileMap};

    // Effects.
    pub use delve_effects::{EffectKind, EffectRegistry, EffectSweeper};

    // Engine.
    pub use delve_engine::{
        Action, ActionError, ActionMarker, ConfigError, RestoreError, World, WorldConfig,
        WorldError, WorldSnapshot,
    };
}
