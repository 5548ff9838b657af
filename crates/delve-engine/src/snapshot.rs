//! Point-in-time capture and reconstruction of world state.
//!
//! A snapshot is an immutable deep copy: the player's attributes and
//! inventory *type names*, every living enemy's `(type, position,
//! health, power)`, every ground item's `(type, position, visibility)`,
//! and the last-action marker. Restore is a full-state replace driven
//! by the name-keyed factories — never a merge. The byte encoding is
//! deliberately not defined here; the types derive `serde` and callers
//! encode them however they wish.

use crate::error::{ActionError, RestoreError, WorldError};
use crate::world::{ActionMarker, World};
use delve_core::Position;
use delve_entity::{Combatant, Enemy, EnemyKind, EntityKind, Item, ItemKind, Player, PlayerClass};
use serde::{Deserialize, Serialize};

/// The player's captured attributes and inventory item types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Class registry name.
    pub class_name: String,
    /// The player's chosen name.
    pub name: String,
    /// Cell at capture time.
    pub pos: Position,
    /// Health at capture time.
    pub health: i32,
    /// Base power at capture time.
    pub power: i32,
    /// Treasure points at capture time.
    pub treasure_points: u32,
    /// Evasion chance at capture time.
    pub evasion_chance: f64,
    /// Registry names of the carried items.
    pub inventory_item_kinds: Vec<String>,
}

/// One living enemy's captured state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    /// Kind registry name.
    pub kind_name: String,
    /// Cell at capture time.
    pub pos: Position,
    /// Health at capture time.
    pub health: i32,
    /// Base power at capture time.
    pub power: i32,
}

/// One ground item's captured state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// Kind registry name.
    pub kind_name: String,
    /// Cell at capture time.
    pub pos: Position,
    /// Fog-of-war visibility at capture time.
    pub visible: bool,
}

/// An immutable capture of the whole world, sufficient to rebuild it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// The sole active player.
    pub player: PlayerSnapshot,
    /// Every enemy that was alive at capture time.
    pub enemies: Vec<EnemySnapshot>,
    /// Every item on the ground at capture time.
    pub items: Vec<ItemSnapshot>,
    /// The last-action marker.
    pub last_action: Option<ActionMarker>,
}

impl World {
    /// Capture a deep-copied snapshot of the current world.
    ///
    /// Takes the world lock for the duration of the capture — the
    /// entity lists mutate under concurrent ticks, so iteration
    /// without the lock could observe a torn world.
    pub fn capture_snapshot(&self) -> Result<WorldSnapshot, ActionError> {
        let map = self.map()?;
        let guard = self.lock_state();
        let state = guard.as_ref().ok_or(WorldError::NotInitialized)?;

        let player = &state.player;
        let player_snap = PlayerSnapshot {
            class_name: player.class().name().to_string(),
            name: player.display_name().to_string(),
            pos: player.position(),
            health: player.health(),
            power: player.power(),
            treasure_points: player.treasure_points(),
            evasion_chance: player.evasion_chance(),
            inventory_item_kinds: player
                .inventory()
                .iter()
                .map(|i| i.kind().name().to_string())
                .collect(),
        };

        let enemies = state
            .enemies
            .iter()
            .filter(|e| !e.is_dead())
            .map(|e| EnemySnapshot {
                kind_name: e.kind().name().to_string(),
                pos: e.position(),
                health: e.health(),
                power: e.power(),
            })
            .collect();

        let mut items = Vec::with_capacity(state.items.len());
        for item in &state.items {
            items.push(ItemSnapshot {
                kind_name: item.kind().name().to_string(),
                pos: item.position(),
                visible: map.is_visible(item.id())?,
            });
        }

        Ok(WorldSnapshot {
            player: player_snap,
            enemies,
            items,
            last_action: state.last_action,
        })
    }

    /// Replace all live state with the snapshot's contents.
    ///
    /// Clears the map, entity lists, and effect registry, then
    /// reconstructs the player, enemies, and items through their
    /// name-keyed factories. The caller must stop scheduling first —
    /// restoring a world mid-tick is a usage error this method cannot
    /// detect.
    pub fn restore(&self, snapshot: &WorldSnapshot) -> Result<(), RestoreError> {
        let map = self.map()?;
        let mut guard = self.lock_state();
        let state = guard.as_mut().ok_or(WorldError::NotInitialized)?;

        map.clear()?;
        self.effects.clear();
        state.enemies.clear();
        state.items.clear();

        // Player first: class from the registry, attributes overlaid,
        // inventory rebuilt from stored type names.
        let ps = &snapshot.player;
        let class = PlayerClass::from_name(&ps.class_name)?;
        let mut player = Player::new(ps.name.clone(), class, ps.pos);
        player.set_health(ps.health);
        player.set_power(ps.power);
        player.add_treasure_points(ps.treasure_points);
        player.set_evasion_chance(ps.evasion_chance);
        for kind_name in &ps.inventory_item_kinds {
            let kind = ItemKind::from_name(kind_name)?;
            player.add_to_inventory(Item::new(kind, ps.pos));
        }
        map.place(ps.pos, player.id(), EntityKind::Player)?;
        map.set_visible(player.id())?;
        state.player = player;

        // Enemies exactly where they were saved.
        let mut rng = self.rng();
        for es in &snapshot.enemies {
            let kind = EnemyKind::from_name(&es.kind_name)?;
            let enemy = Enemy::restore(kind, es.pos, es.health, es.power, &mut *rng);
            map.place(es.pos, enemy.id(), EntityKind::Enemy)?;
            state.enemies.push(enemy);
        }

        // Items, walls included, with their saved visibility.
        for is in &snapshot.items {
            let kind = ItemKind::from_name(&is.kind_name)?;
            let item = Item::new(kind, is.pos);
            let map_kind = match kind {
                ItemKind::Wall => EntityKind::Wall,
                _ => EntityKind::Item,
            };
            map.place(is.pos, item.id(), map_kind)?;
            if is.visible {
                map.set_visible(item.id())?;
            }
            state.items.push(item);
        }

        state.last_action = snapshot.last_action;
        drop(rng);
        drop(guard);

        self.sink.log("world restored from snapshot");
        self.notify_observers();
        Ok(())
    }
}
