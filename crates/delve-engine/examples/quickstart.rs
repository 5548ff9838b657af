//! Minimal headless run: build a world, let the enemies tick for a
//! few seconds, poke at it, snapshot, and shut down.
//!
//! ```sh
//! cargo run -p delve-engine --example quickstart
//! ```

use delve_core::{EventSink, NullSink};
use delve_engine::{worldgen, World, WorldConfig};
use delve_entity::PlayerClass;
use delve_map::TileMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;

/// Event sink that prints to stdout.
struct StdoutSink;

impl EventSink for StdoutSink {
    fn log(&self, message: &str) {
        println!("[event] {message}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = WorldConfig {
        rows: 12,
        cols: 12,
        seed: 42,
        ..WorldConfig::default()
    };
    let world = Arc::new(World::new(
        config.clone(),
        Arc::new(StdoutSink),
        Arc::new(NullSink),
    )?);

    // Map, then population, then the one-time initialize.
    let map = TileMap::new(config.rows, config.cols)?;
    world.attach_map(map)?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let (player, enemies, items) = worldgen::populate(
        world.map()?,
        &config,
        "Aria",
        PlayerClass::Warrior,
        &mut rng,
    )?;
    println!(
        "generated {} enemies and {} items",
        enemies.len(),
        items.len()
    );
    world.initialize(player, enemies, items)?;
    world.apply_random_enemy_effects()?;

    World::start(&world)?;
    std::thread::sleep(Duration::from_secs(3));

    // Attack the first enemy we can see.
    if let Some(enemy) = world.enemy_views().first() {
        use delve_entity::Combatant;
        match world.attack(enemy.id()) {
            Ok(()) => println!("battle log: {:?}", world.battle_history().last()),
            Err(e) => println!("attack did not happen: {e}"),
        }
    }

    let snapshot = world.capture_snapshot()?;
    println!(
        "snapshot: {} enemies, {} items, player at {}",
        snapshot.enemies.len(),
        snapshot.items.len(),
        snapshot.player.pos
    );

    world.stop();
    Ok(())
}
