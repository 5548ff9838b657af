//! Enemy kinds, the enemy factory registry, and spawn-kind selection.

use crate::attributes::Attributes;
use crate::combatant::{CombatStyle, Combatant, MagicElement, Role};
use crate::error::FactoryError;
use delve_core::{EntityId, Position};
use rand::Rng;
use std::collections::HashSet;
use std::fmt;

/// Default enemy health ceiling.
pub const ENEMY_MAX_HEALTH: i32 = 50;

/// Default enemy base power.
pub const ENEMY_BASE_POWER: i32 = 10;

/// The catalogue of enemy kinds.
///
/// This enum is the factory registry: [`EnemyKind::from_name`] maps a
/// saved type name back to a kind, [`EnemyKind::ALL`] enumerates the
/// catalogue for spawn selection, and [`Enemy::spawn`] constructs a
/// default-initialized instance. Unknown names are a declared error,
/// never a fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnemyKind {
    /// Agile melee skirmisher with a high, agility-scaled dodge.
    Goblin,
    /// Slow melee bruiser; hits harder on a crit, rarely dodges.
    Orc,
    /// Fire-breathing ranged attacker.
    Dragon,
}

impl EnemyKind {
    /// Every registered enemy kind, in a fixed order.
    pub const ALL: [EnemyKind; 3] = [EnemyKind::Goblin, EnemyKind::Orc, EnemyKind::Dragon];

    /// The registry name for this kind, as stored in snapshots.
    pub fn name(self) -> &'static str {
        match self {
            EnemyKind::Goblin => "Goblin",
            EnemyKind::Orc => "Orc",
            EnemyKind::Dragon => "Dragon",
        }
    }

    /// Look up a kind by its registry name.
    pub fn from_name(name: &str) -> Result<Self, FactoryError> {
        match name {
            "Goblin" => Ok(EnemyKind::Goblin),
            "Orc" => Ok(EnemyKind::Orc),
            "Dragon" => Ok(EnemyKind::Dragon),
            other => Err(FactoryError::UnknownEnemyKind {
                name: other.to_string(),
            }),
        }
    }

    /// Map display glyph.
    pub fn symbol(self) -> char {
        match self {
            EnemyKind::Goblin => 'G',
            EnemyKind::Orc => 'O',
            EnemyKind::Dragon => 'D',
        }
    }

    /// Pick a kind for a respawn, biased toward kinds not currently on
    /// the board: if any registered kind is absent from `present`, the
    /// choice is uniform over the absent ones; otherwise uniform over
    /// the whole catalogue.
    pub fn choose_biased<R: Rng + ?Sized>(present: &HashSet<EnemyKind>, rng: &mut R) -> EnemyKind {
        let missing: Vec<EnemyKind> = Self::ALL
            .iter()
            .copied()
            .filter(|k| !present.contains(k))
            .collect();
        if missing.is_empty() {
            Self::ALL[rng.gen_range(0..Self::ALL.len())]
        } else {
            missing[rng.gen_range(0..missing.len())]
        }
    }
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An autonomous enemy.
///
/// Owned by the world's enemy list; the map indexes it by ID. Carries a
/// loot value randomized at creation that becomes a Treasure item when
/// the enemy dies.
#[derive(Clone, Debug)]
pub struct Enemy {
    id: EntityId,
    kind: EnemyKind,
    pos: Position,
    stats: Attributes,
    loot: u32,
    /// Goblin dodge stat, 0–80. Unused by the other kinds.
    agility: u8,
}

impl Enemy {
    /// Spawn a default-initialized enemy of `kind` at `pos`.
    ///
    /// Loot is randomized in 100–300; a goblin additionally rolls its
    /// agility in 0–80.
    pub fn spawn<R: Rng + ?Sized>(kind: EnemyKind, pos: Position, rng: &mut R) -> Self {
        Self {
            id: EntityId::next(),
            kind,
            pos,
            stats: Attributes::new(ENEMY_MAX_HEALTH, ENEMY_BASE_POWER, 0.0),
            loot: rng.gen_range(100..=300),
            agility: rng.gen_range(0..=80),
        }
    }

    /// Rebuild an enemy from snapshot fields. Loot and agility are
    /// re-rolled — they are not part of the snapshot record.
    pub fn restore<R: Rng + ?Sized>(
        kind: EnemyKind,
        pos: Position,
        health: i32,
        power: i32,
        rng: &mut R,
    ) -> Self {
        let mut enemy = Self::spawn(kind, pos, rng);
        enemy.stats.set_health(health);
        enemy.stats.set_power(power);
        enemy
    }

    /// This enemy's kind.
    pub fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// The loot value this enemy carries.
    pub fn loot(&self) -> u32 {
        self.loot
    }

    /// Goblin agility stat (0 for other kinds' purposes).
    pub fn agility(&self) -> u8 {
        self.agility
    }

    /// Move this enemy's recorded position. The map placement is
    /// updated separately by the orchestrator.
    pub fn set_position(&mut self, pos: Position) {
        self.pos = pos;
    }

    /// Overwrite base power (power waves, snapshot restore).
    pub fn set_power(&mut self, power: i32) {
        self.stats.set_power(power);
    }

    /// Fraction of health remaining, in `[0, 1]`.
    pub fn health_fraction(&self) -> f64 {
        self.stats.health_fraction()
    }
}

impl Combatant for Enemy {
    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> &str {
        self.kind.name()
    }

    fn role(&self) -> Role {
        Role::Enemy
    }

    fn position(&self) -> Position {
        self.pos
    }

    fn health(&self) -> i32 {
        self.stats.health()
    }

    fn max_health(&self) -> i32 {
        self.stats.max_health()
    }

    fn power(&self) -> i32 {
        self.stats.power()
    }

    fn evasion_chance(&self) -> f64 {
        match self.kind {
            // Nimble, but capped: even the luckiest goblin gets hit.
            EnemyKind::Goblin => (f64::from(self.agility) / 100.0).min(0.8),
            EnemyKind::Orc => 0.05,
            // Wounded dragons fly lower.
            EnemyKind::Dragon => 0.25 * self.stats.health_fraction(),
        }
    }

    fn style(&self) -> CombatStyle {
        match self.kind {
            EnemyKind::Goblin | EnemyKind::Orc => CombatStyle::Melee,
            EnemyKind::Dragon => CombatStyle::Ranged { radius: 3 },
        }
    }

    fn critical_chance(&self) -> f64 {
        match self.kind {
            EnemyKind::Goblin => 0.10,
            EnemyKind::Orc => 0.20,
            EnemyKind::Dragon => 0.0,
        }
    }

    fn element(&self) -> Option<MagicElement> {
        match self.kind {
            EnemyKind::Dragon => Some(MagicElement::Fire),
            _ => None,
        }
    }

    fn apply_damage(&mut self, amount: i32) {
        self.stats.apply_damage(amount);
    }

    fn heal(&mut self, amount: i32) {
        self.stats.heal(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn spawn_randomizes_loot_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..64 {
            let e = Enemy::spawn(EnemyKind::Orc, Position::new(0, 0), &mut rng);
            assert!((100..=300).contains(&e.loot()));
            assert_eq!(e.health(), ENEMY_MAX_HEALTH);
        }
    }

    #[test]
    fn from_name_round_trips() {
        for kind in EnemyKind::ALL {
            assert_eq!(EnemyKind::from_name(kind.name()).unwrap(), kind);
        }
    }

    #[test]
    fn from_name_rejects_unknown() {
        let err = EnemyKind::from_name("Basilisk").unwrap_err();
        assert_eq!(
            err,
            FactoryError::UnknownEnemyKind {
                name: "Basilisk".to_string()
            }
        );
    }

    #[test]
    fn choose_biased_prefers_missing_kinds() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut present = HashSet::new();
        present.insert(EnemyKind::Goblin);
        present.insert(EnemyKind::Dragon);
        for _ in 0..32 {
            assert_eq!(
                EnemyKind::choose_biased(&present, &mut rng),
                EnemyKind::Orc
            );
        }
    }

    #[test]
    fn choose_biased_falls_back_to_uniform() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let present: HashSet<EnemyKind> = EnemyKind::ALL.into_iter().collect();
        let mut seen = HashSet::new();
        for _ in 0..128 {
            seen.insert(EnemyKind::choose_biased(&present, &mut rng));
        }
        assert_eq!(seen.len(), EnemyKind::ALL.len());
    }

    #[test]
    fn goblin_evasion_is_capped() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let e = Enemy::spawn(EnemyKind::Goblin, Position::new(0, 0), &mut rng);
        assert!(e.evasion_chance() <= 0.8);
    }

    #[test]
    fn dragon_evasion_drops_with_health() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut e = Enemy::spawn(EnemyKind::Dragon, Position::new(0, 0), &mut rng);
        let fresh = e.evasion_chance();
        e.apply_damage(40);
        assert!(e.evasion_chance() < fresh);
    }

    #[test]
    fn restore_applies_snapshot_fields() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let e = Enemy::restore(EnemyKind::Dragon, Position::new(4, 4), 17, 23, &mut rng);
        assert_eq!(e.health(), 17);
        assert_eq!(e.power(), 23);
        assert_eq!(e.position(), Position::new(4, 4));
    }
}
