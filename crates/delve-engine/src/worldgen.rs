//! Random initial population of a fresh map.

use crate::config::WorldConfig;
use delve_core::Position;
use delve_entity::{Combatant, Enemy, EnemyKind, EntityKind, Item, ItemKind, Player, PlayerClass};
use delve_map::{MapError, TileMap};
use rand::Rng;

/// Per-cell terrain roll thresholds (cumulative probabilities).
const EMPTY_BELOW: f64 = 0.70;
const ENEMY_BELOW: f64 = 0.76;
const WALL_BELOW: f64 = 0.88;

/// Share of potion rolls that are health potions (the rest are power).
const HEALTH_POTION_SHARE: f64 = 0.75;

/// Populate `map` with a random scatter of enemies, walls, and
/// potions, then drop the player onto a free cell and reveal its
/// surroundings.
///
/// Enemy count is capped at the configured capacity. Returns the
/// entities for [`World::initialize`](crate::World::initialize); they
/// are already placed on the map.
pub fn populate<R: Rng + ?Sized>(
    map: &TileMap,
    config: &WorldConfig,
    player_name: &str,
    player_class: PlayerClass,
    rng: &mut R,
) -> Result<(Player, Vec<Enemy>, Vec<Item>), MapError> {
    let mut enemies = Vec::new();
    let mut items = Vec::new();
    let capacity = config.enemy_capacity();

    for row in 0..map.rows() as i32 {
        for col in 0..map.cols() as i32 {
            let pos = Position::new(row, col);
            let roll: f64 = rng.gen();

            if roll < EMPTY_BELOW {
                continue;
            } else if roll < ENEMY_BELOW {
                if enemies.len() >= capacity {
                    continue;
                }
                let kind = EnemyKind::ALL[rng.gen_range(0..EnemyKind::ALL.len())];
                let enemy = Enemy::spawn(kind, pos, rng);
                map.place(pos, enemy.id(), EntityKind::Enemy)?;
                enemies.push(enemy);
            } else if roll < WALL_BELOW {
                let wall = Item::new(ItemKind::Wall, pos);
                map.place(pos, wall.id(), EntityKind::Wall)?;
                items.push(wall);
            } else {
                let kind = if rng.gen::<f64>() < HEALTH_POTION_SHARE {
                    ItemKind::HealthPotion
                } else {
                    ItemKind::PowerPotion
                };
                let potion = Item::new(kind, pos);
                map.place(pos, potion.id(), EntityKind::Item)?;
                items.push(potion);
            }
        }
    }

    // The player lands on a free cell; the board always has one at
    // these densities, but bound the search anyway.
    let player_pos = map
        .random_free_position(rng, 1000)?
        .unwrap_or(Position::new(0, 0));
    let player = Player::new(player_name, player_class, player_pos);
    map.place(player_pos, player.id(), EntityKind::Player)?;
    map.set_visible(player.id())?;
    map.reveal_nearby(player_pos)?;

    Ok((player, enemies, items))
}
