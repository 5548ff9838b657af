//! Effect kinds, activation windows, and per-kind runtime state.

use delve_entity::Role;
use std::fmt;
use std::time::{Duration, Instant};

/// Power multiplier granted by a boosted attack.
pub const BOOSTED_ATTACK_MULTIPLIER: f64 = 1.5;

/// Power multiplier granted by an amplifier to magic-capable characters.
pub const MAGIC_AMPLIFIER_MULTIPLIER: f64 = 1.4;

/// Maximum enrage bonus, reached at zero health.
pub const ENRAGE_MAX_BONUS: f64 = 0.5;

/// Fraction of damage that leaks through a shield after the first
/// blocked hit.
pub const SHIELD_DAMAGE_REDUCTION: f64 = 0.5;

/// Interval after which a shield's first-hit block re-arms.
pub const SHIELD_BLOCK_RESET: Duration = Duration::from_secs(10);

/// Fraction of max health regenerated per heal tick.
pub const REGEN_HEAL_FRACTION: f64 = 0.02;

/// Interval between regeneration heal ticks.
pub const REGEN_INTERVAL: Duration = Duration::from_secs(3);

/// Fraction of dealt damage a vampiric attacker steals back.
pub const LIFE_STEAL_FRACTION: f64 = 0.1;

/// Fraction of max health dealt to each player caught in an explosion.
pub const EXPLOSION_DAMAGE_FRACTION: f64 = 0.2;

/// Explosion blast radius in Manhattan distance.
pub const EXPLOSION_RANGE: u32 = 2;

/// Health fraction below which a teleporting enemy relocates.
pub const TELEPORT_HEALTH_THRESHOLD: f64 = 0.3;

/// Length of one speed-boost "turn" — one extra action per turn.
pub const SPEED_BOOST_TURN: Duration = Duration::from_secs(5);

/// The effect catalogue.
///
/// Each variant is a pure tag; numeric parameters live in the module
/// constants and per-instance bookkeeping in the effect's runtime
/// state. Kinds are role-gated: applying a player effect to an enemy
/// (or vice versa) is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Player: ×1.5 effective power.
    BoostedAttack,
    /// Player: blocks the first hit per reset interval, halves the rest.
    Shield,
    /// Player: one extra action per turn window.
    SpeedBoost,
    /// Player: heals a fraction of max health every few seconds.
    Regeneration,
    /// Player: ×1.4 effective power, magic-capable characters only.
    MagicAmplifier,
    /// Enemy: explodes on death, damaging nearby players.
    Exploding,
    /// Enemy: immune to damage until it first attacks.
    Camouflaged,
    /// Enemy: power scales up as health drops.
    Enraged,
    /// Enemy: steals a fraction of dealt damage as health.
    Vampire,
    /// Enemy: relocates once when health falls below a threshold.
    Teleporting,
}

/// Player-applicable kinds, for random selection.
pub const PLAYER_EFFECTS: [EffectKind; 5] = [
    EffectKind::BoostedAttack,
    EffectKind::Shield,
    EffectKind::SpeedBoost,
    EffectKind::Regeneration,
    EffectKind::MagicAmplifier,
];

/// Enemy-applicable kinds, for random selection.
pub const ENEMY_EFFECTS: [EffectKind; 5] = [
    EffectKind::Exploding,
    EffectKind::Camouflaged,
    EffectKind::Enraged,
    EffectKind::Vampire,
    EffectKind::Teleporting,
];

impl EffectKind {
    /// The role this kind may be applied to.
    pub fn target_role(self) -> Role {
        match self {
            EffectKind::BoostedAttack
            | EffectKind::Shield
            | EffectKind::SpeedBoost
            | EffectKind::Regeneration
            | EffectKind::MagicAmplifier => Role::Player,
            EffectKind::Exploding
            | EffectKind::Camouflaged
            | EffectKind::Enraged
            | EffectKind::Vampire
            | EffectKind::Teleporting => Role::Enemy,
        }
    }

    /// Human-readable name, used in event logs and status panels.
    pub fn display_name(self) -> &'static str {
        match self {
            EffectKind::BoostedAttack => "Boosted Attack",
            EffectKind::Shield => "Shield",
            EffectKind::SpeedBoost => "Speed Boost",
            EffectKind::Regeneration => "Regeneration",
            EffectKind::MagicAmplifier => "Magic Amplifier",
            EffectKind::Exploding => "Exploding",
            EffectKind::Camouflaged => "Camouflaged",
            EffectKind::Enraged => "Enraged",
            EffectKind::Vampire => "Vampire",
            EffectKind::Teleporting => "Teleporting",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Per-kind mutable bookkeeping carried by an effect instance.
#[derive(Clone, Debug)]
pub(crate) enum RuntimeState {
    /// Kinds with no per-instance state.
    None,
    /// Shield: whether the current window's free block was spent, and
    /// when the window began.
    Shield {
        first_hit_blocked: bool,
        window_started: Instant,
    },
    /// Camouflage: broken forever once the owner attacks.
    Camouflage { has_attacked: bool },
    /// Teleport: fires at most once per effect.
    Teleport { has_teleported: bool },
    /// Regeneration: last heal tick and the per-tick amount (computed
    /// from the owner's max health at application time).
    Regen {
        last_heal: Instant,
        heal_per_tick: i32,
    },
    /// Speed boost: current turn window and whether its extra action
    /// was spent.
    SpeedBoost {
        window_started: Instant,
        extra_used: bool,
    },
}

/// One tracked effect instance.
///
/// `is_active` is a pure function of wall-clock time against the
/// activation window; once inactive every override degrades to
/// pass-through. Instances never outlive the sweep that follows their
/// expiry.
#[derive(Clone, Debug)]
pub struct Effect {
    kind: EffectKind,
    applied_at: Instant,
    duration: Duration,
    pub(crate) state: RuntimeState,
}

impl Effect {
    /// New effect starting at `start`. `owner_max_health` seeds
    /// health-derived parameters (regeneration tick size).
    pub fn starting_at(
        kind: EffectKind,
        start: Instant,
        duration: Duration,
        owner_max_health: i32,
    ) -> Self {
        let state = match kind {
            EffectKind::Shield => RuntimeState::Shield {
                first_hit_blocked: false,
                window_started: start,
            },
            EffectKind::Camouflaged => RuntimeState::Camouflage {
                has_attacked: false,
            },
            EffectKind::Teleporting => RuntimeState::Teleport {
                has_teleported: false,
            },
            EffectKind::Regeneration => RuntimeState::Regen {
                last_heal: start,
                heal_per_tick: (f64::from(owner_max_health) * REGEN_HEAL_FRACTION).round() as i32,
            },
            EffectKind::SpeedBoost => RuntimeState::SpeedBoost {
                window_started: start,
                extra_used: false,
            },
            _ => RuntimeState::None,
        };
        Self {
            kind,
            applied_at: start,
            duration,
            state,
        }
    }

    /// New effect starting now.
    pub fn new(kind: EffectKind, duration: Duration, owner_max_health: i32) -> Self {
        Self::starting_at(kind, Instant::now(), duration, owner_max_health)
    }

    /// This effect's kind.
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Whether the activation window contains `now`.
    pub fn is_active(&self, now: Instant) -> bool {
        now.duration_since(self.applied_at) < self.duration
    }

    /// Time left in the activation window (zero once expired).
    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.duration_since(self.applied_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_window_is_half_open() {
        let start = Instant::now();
        let e = Effect::starting_at(EffectKind::BoostedAttack, start, Duration::from_secs(10), 100);
        assert!(e.is_active(start));
        assert!(e.is_active(start + Duration::from_secs(9)));
        assert!(!e.is_active(start + Duration::from_secs(10)));
        assert!(!e.is_active(start + Duration::from_secs(60)));
    }

    #[test]
    fn remaining_counts_down_to_zero() {
        let start = Instant::now();
        let e = Effect::starting_at(EffectKind::Shield, start, Duration::from_secs(10), 100);
        assert_eq!(e.remaining(start), Duration::from_secs(10));
        assert_eq!(e.remaining(start + Duration::from_secs(4)), Duration::from_secs(6));
        assert_eq!(e.remaining(start + Duration::from_secs(30)), Duration::ZERO);
    }

    #[test]
    fn regen_tick_size_derives_from_max_health() {
        let e = Effect::new(EffectKind::Regeneration, Duration::from_secs(10), 100);
        match e.state {
            RuntimeState::Regen { heal_per_tick, .. } => assert_eq!(heal_per_tick, 2),
            ref other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn every_kind_has_a_role() {
        for kind in PLAYER_EFFECTS {
            assert_eq!(kind.target_role(), Role::Player);
        }
        for kind in ENEMY_EFFECTS {
            assert_eq!(kind.target_role(), Role::Enemy);
        }
    }
}
