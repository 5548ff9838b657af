//! The concurrency-safe effect registry and its combat hooks.

use crate::effect::{
    Effect, EffectKind, RuntimeState, BOOSTED_ATTACK_MULTIPLIER, ENEMY_EFFECTS, ENRAGE_MAX_BONUS,
    EXPLOSION_DAMAGE_FRACTION, EXPLOSION_RANGE, LIFE_STEAL_FRACTION, MAGIC_AMPLIFIER_MULTIPLIER,
    PLAYER_EFFECTS, REGEN_INTERVAL, SHIELD_BLOCK_RESET, SHIELD_DAMAGE_REDUCTION, SPEED_BOOST_TURN,
    TELEPORT_HEALTH_THRESHOLD,
};
use crate::error::EffectError;
use delve_combat::{CombatHooks, CombatReaction};
use delve_core::{EntityId, EventSink};
use delve_entity::Combatant;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Registry of every tracked effect, keyed by the decorated character.
///
/// Effects are additive: a character may accumulate several, and
/// queries fold over all *active* ones. The interior `RwLock` is never
/// held together with the world lock, so the background sweep and
/// gameplay queries cannot deadlock against world mutation.
pub struct EffectRegistry {
    entries: RwLock<HashMap<EntityId, Vec<Effect>>>,
    sink: Arc<dyn EventSink>,
}

impl EffectRegistry {
    /// New empty registry logging through `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sink,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<EntityId, Vec<Effect>>> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<EntityId, Vec<Effect>>> {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Apply `kind` to `target` for `duration`, starting now.
    ///
    /// Role-mismatched applications are rejected and logged; the
    /// character is untouched either way — effects are tracked beside
    /// characters, never wrapped around them.
    pub fn apply(
        &self,
        target: &dyn Combatant,
        kind: EffectKind,
        duration: Duration,
    ) -> Result<(), EffectError> {
        self.apply_starting_at(target, kind, duration, Instant::now())
    }

    /// [`apply`](Self::apply) with an explicit start instant, for
    /// deterministic tests and replay.
    pub fn apply_starting_at(
        &self,
        target: &dyn Combatant,
        kind: EffectKind,
        duration: Duration,
        start: Instant,
    ) -> Result<(), EffectError> {
        if kind.target_role() != target.role() {
            self.sink.log(&format!(
                "cannot apply {} to {}: wrong role",
                kind,
                target.display_name()
            ));
            return Err(EffectError::RoleMismatch {
                kind,
                target_role: target.role(),
            });
        }

        let effect = Effect::starting_at(kind, start, duration, target.max_health());
        self.write().entry(target.id()).or_default().push(effect);
        self.sink.log(&format!(
            "{} gained {} for {}s",
            target.display_name(),
            kind,
            duration.as_secs()
        ));
        Ok(())
    }

    /// Apply a uniformly random effect from the catalogue matching the
    /// target's role. Returns the kind applied.
    pub fn apply_random<R: Rng + ?Sized>(
        &self,
        target: &dyn Combatant,
        duration: Duration,
        rng: &mut R,
    ) -> EffectKind {
        let catalogue: &[EffectKind] = match target.role() {
            delve_entity::Role::Player => &PLAYER_EFFECTS,
            delve_entity::Role::Enemy => &ENEMY_EFFECTS,
        };
        let kind = catalogue[rng.gen_range(0..catalogue.len())];
        // Role is matched by construction.
        let _ = self.apply(target, kind, duration);
        kind
    }

    /// Whether `id` currently has an active effect of `kind`.
    pub fn has_effect(&self, id: EntityId, kind: EffectKind) -> bool {
        let now = Instant::now();
        self.read().get(&id).is_some_and(|effects| {
            effects
                .iter()
                .any(|e| e.kind() == kind && e.is_active(now))
        })
    }

    /// The active effects on `id` with their remaining durations, for
    /// status display.
    pub fn active_effects(&self, id: EntityId) -> Vec<(EffectKind, Duration)> {
        let now = Instant::now();
        self.read()
            .get(&id)
            .map(|effects| {
                effects
                    .iter()
                    .filter(|e| e.is_active(now))
                    .map(|e| (e.kind(), e.remaining(now)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of characters with tracked (not necessarily active)
    /// effects.
    pub fn tracked_characters(&self) -> usize {
        self.read().len()
    }

    /// Drop every effect tracked for `id`.
    pub fn remove_all(&self, id: EntityId) {
        self.write().remove(&id);
    }

    /// Drop every tracked effect (world restore).
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Detach expired effects and drop characters whose lists became
    /// empty. Returns the number of effects removed. Called by the
    /// background sweeper; never touches the world lock.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let mut entries = self.write();
        let mut removed = 0;
        entries.retain(|id, effects| {
            let before = effects.len();
            effects.retain(|e| e.is_active(now));
            removed += before - effects.len();
            if effects.is_empty() {
                debug!(%id, "all effects expired");
                false
            } else {
                true
            }
        });
        removed
    }

    /// Heals due from active regeneration effects: `(character, amount)`
    /// pairs. Marks each due effect as healed at `now`; the caller
    /// applies the heals under the world lock.
    pub fn regen_heals_due(&self, now: Instant) -> Vec<(EntityId, i32)> {
        let mut entries = self.write();
        let mut due = Vec::new();
        for (id, effects) in entries.iter_mut() {
            for effect in effects.iter_mut() {
                if !effect.is_active(now) {
                    continue;
                }
                if let RuntimeState::Regen {
                    last_heal,
                    heal_per_tick,
                } = &mut effect.state
                {
                    if now.duration_since(*last_heal) >= REGEN_INTERVAL {
                        *last_heal = now;
                        due.push((*id, *heal_per_tick));
                    }
                }
            }
        }
        due
    }

    /// Whether `id` has an unspent speed-boost action in the current
    /// turn window. Re-arms the window lazily.
    pub fn has_extra_action(&self, id: EntityId) -> bool {
        let now = Instant::now();
        let mut entries = self.write();
        let Some(effects) = entries.get_mut(&id) else {
            return false;
        };
        for effect in effects.iter_mut() {
            if !effect.is_active(now) {
                continue;
            }
            if let RuntimeState::SpeedBoost {
                window_started,
                extra_used,
            } = &mut effect.state
            {
                if now.duration_since(*window_started) > SPEED_BOOST_TURN {
                    *window_started = now;
                    *extra_used = false;
                }
                if !*extra_used {
                    return true;
                }
            }
        }
        false
    }

    /// Spend the current turn window's extra action, if available.
    /// Returns whether one was spent.
    pub fn use_extra_action(&self, id: EntityId) -> bool {
        let now = Instant::now();
        let mut entries = self.write();
        let Some(effects) = entries.get_mut(&id) else {
            return false;
        };
        for effect in effects.iter_mut() {
            if !effect.is_active(now) {
                continue;
            }
            if let RuntimeState::SpeedBoost {
                window_started,
                extra_used,
            } = &mut effect.state
            {
                if now.duration_since(*window_started) > SPEED_BOOST_TURN {
                    *window_started = now;
                    *extra_used = false;
                }
                if !*extra_used {
                    *extra_used = true;
                    self.sink.log("extra action used");
                    return true;
                }
            }
        }
        false
    }
}

impl EffectRegistry {
    /// [`CombatHooks::absorb_damage`] against an explicit instant.
    /// Shield windows re-arm relative to `now`.
    fn absorb_damage_at(&self, target: &dyn Combatant, amount: i32, now: Instant) -> i32 {
        let mut entries = self.write();
        let Some(effects) = entries.get_mut(&target.id()) else {
            return amount;
        };

        let mut remaining = amount;
        for effect in effects.iter_mut() {
            if !effect.is_active(now) {
                continue;
            }
            match &mut effect.state {
                RuntimeState::Shield {
                    first_hit_blocked,
                    window_started,
                } => {
                    if now.duration_since(*window_started) > SHIELD_BLOCK_RESET {
                        *first_hit_blocked = false;
                        *window_started = now;
                    }
                    if !*first_hit_blocked {
                        *first_hit_blocked = true;
                        self.sink.log("shield blocked all damage");
                        return 0;
                    }
                    let reduced = (f64::from(remaining) * SHIELD_DAMAGE_REDUCTION) as i32;
                    self.sink
                        .log(&format!("shield reduced damage from {remaining} to {reduced}"));
                    remaining = reduced;
                }
                RuntimeState::Camouflage { has_attacked } => {
                    if !*has_attacked {
                        self.sink.log("attack missed: target is camouflaged");
                        return 0;
                    }
                }
                _ => {}
            }
        }
        remaining
    }
}

impl CombatHooks for EffectRegistry {
    /// Fold every active multiplier into the attacker's base power.
    /// Multipliers commute, so application order is irrelevant.
    fn effective_power(&self, attacker: &dyn Combatant) -> i32 {
        let now = Instant::now();
        let entries = self.read();
        let Some(effects) = entries.get(&attacker.id()) else {
            return attacker.power();
        };

        let mut multiplier = 1.0;
        for effect in effects.iter().filter(|e| e.is_active(now)) {
            match effect.kind() {
                EffectKind::BoostedAttack => multiplier *= BOOSTED_ATTACK_MULTIPLIER,
                EffectKind::MagicAmplifier => {
                    if attacker.element().is_some() {
                        multiplier *= MAGIC_AMPLIFIER_MULTIPLIER;
                    }
                }
                EffectKind::Enraged => {
                    let missing = 1.0 - health_fraction(attacker);
                    multiplier *= 1.0 + ENRAGE_MAX_BONUS * missing;
                }
                _ => {}
            }
        }
        (f64::from(attacker.power()) * multiplier) as i32
    }

    /// Give shields and camouflage the chance to absorb the hit.
    /// Additive first-hit blocks apply before percentage reduction.
    fn absorb_damage(&self, target: &dyn Combatant, amount: i32) -> i32 {
        self.absorb_damage_at(target, amount, Instant::now())
    }

    /// Break the attacker's camouflage and compute vampiric life-steal.
    fn after_attack(&self, attacker: &dyn Combatant, damage_dealt: i32) -> i32 {
        let now = Instant::now();
        let mut entries = self.write();
        let Some(effects) = entries.get_mut(&attacker.id()) else {
            return 0;
        };

        let mut steal = 0;
        for effect in effects.iter_mut() {
            if !effect.is_active(now) {
                continue;
            }
            let kind = effect.kind();
            match &mut effect.state {
                RuntimeState::Camouflage { has_attacked } => {
                    if !*has_attacked {
                        *has_attacked = true;
                        self.sink.log("camouflage broken");
                    }
                }
                RuntimeState::None if kind == EffectKind::Vampire => {
                    if damage_dealt > 0 {
                        steal += (f64::from(damage_dealt) * LIFE_STEAL_FRACTION) as i32;
                    }
                }
                _ => {}
            }
        }
        if steal > 0 {
            self.sink
                .log(&format!("{} drained {steal} health", attacker.display_name()));
        }
        steal
    }

    /// Fire the one-shot low-health teleport if the threshold was
    /// crossed.
    fn after_damage(&self, target: &dyn Combatant) -> Vec<CombatReaction> {
        if target.is_dead() {
            return Vec::new();
        }
        let now = Instant::now();
        let mut entries = self.write();
        let Some(effects) = entries.get_mut(&target.id()) else {
            return Vec::new();
        };

        let mut reactions = Vec::new();
        for effect in effects.iter_mut() {
            if !effect.is_active(now) {
                continue;
            }
            if let RuntimeState::Teleport { has_teleported } = &mut effect.state {
                if !*has_teleported && health_fraction(target) < TELEPORT_HEALTH_THRESHOLD {
                    *has_teleported = true;
                    reactions.push(CombatReaction::Teleport { target: target.id() });
                }
            }
        }
        reactions
    }

    /// An exploding death damages every player in blast range.
    fn death_reactions(&self, fallen: &dyn Combatant) -> Vec<CombatReaction> {
        let now = Instant::now();
        let entries = self.read();
        let Some(effects) = entries.get(&fallen.id()) else {
            return Vec::new();
        };

        effects
            .iter()
            .filter(|e| e.is_active(now) && e.kind() == EffectKind::Exploding)
            .map(|_| CombatReaction::Explode {
                at: fallen.position(),
                damage: (f64::from(fallen.max_health()) * EXPLOSION_DAMAGE_FRACTION) as i32,
                range: EXPLOSION_RANGE,
            })
            .collect()
    }
}

/// Health fraction shared by the enrage and teleport paths.
fn health_fraction(c: &dyn Combatant) -> f64 {
    if c.max_health() <= 0 {
        return 0.0;
    }
    f64::from(c.health()) / f64::from(c.max_health())
}
