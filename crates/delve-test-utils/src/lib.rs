//! Test fixtures and recording sinks for Delve development.
//!
//! Provides deterministic character constructors and sink
//! implementations that capture output for assertions.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use delve_core::{AudioSink, EventSink, Position};
use delve_entity::{Enemy, EnemyKind, Player, PlayerClass};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::{Mutex, PoisonError};

/// Event sink that records every line for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything logged so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl EventSink for RecordingSink {
    fn log(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Audio sink that records cue names instead of playing them.
#[derive(Debug, Default)]
pub struct RecordingAudio {
    cues: Mutex<Vec<String>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<String> {
        self.cues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AudioSink for RecordingAudio {
    fn play(&self, cue: &str) {
        self.cues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cue.to_string());
    }
}

/// A warrior at `pos` with default attributes.
pub fn test_player(pos: Position) -> Player {
    Player::new("Tester", PlayerClass::Warrior, pos)
}

/// An enemy of `kind` at `pos`, rolled from a fixed seed so its loot
/// and agility are stable across runs.
pub fn test_enemy(kind: EnemyKind, pos: Position) -> Enemy {
    let mut rng = ChaCha8Rng::seed_from_u64(0xDE15EED);
    Enemy::spawn(kind, pos, &mut rng)
}
