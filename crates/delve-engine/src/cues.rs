//! Audio cue names handed to the [`AudioSink`](delve_core::AudioSink).

use delve_entity::{EnemyKind, PlayerClass};

/// Looping background track started with the game.
pub const BACKGROUND: &str = "background_game_sound.wav";

/// Player footsteps on a successful move.
pub const FOOTSTEPS: &str = "footsteps.wav";

/// Treasure pickup.
pub const TREASURE: &str = "treasure-sound.wav";

/// Drinking any potion.
pub const DRINK_POTION: &str = "drink_potion.wav";

/// An enemy dying.
pub const ENEMY_DIE: &str = "enemy_die.wav";

/// The player dying.
pub const GAME_OVER: &str = "game_over.wav";

/// The cue for a player class opening an attack.
pub fn player_attack(class: PlayerClass) -> &'static str {
    match class {
        PlayerClass::Warrior => "warrior_attack.wav",
        PlayerClass::Mage => "mage_attack.wav",
        PlayerClass::Archer => "archer_attack.wav",
    }
}

/// The cue for an enemy kind striking back.
pub fn enemy_attack(kind: EnemyKind) -> &'static str {
    match kind {
        EnemyKind::Goblin => "goblin_attack.wav",
        EnemyKind::Orc => "orc_attack.wav",
        EnemyKind::Dragon => "dragon_attack.wav",
    }
}
