//! The combat resolution loop.

use crate::hooks::{CombatHooks, CombatReaction};
use crate::result::BattleResult;
use delve_entity::Combatant;
use rand::Rng;

/// Hard ceiling on exchanges per encounter. Guards against two
/// high-evasion combatants stalling an exchange that neither can end.
pub const MAX_ROUNDS: u32 = 512;

/// Everything a single combat encounter produced.
#[derive(Clone, Debug)]
pub struct CombatOutcome {
    /// The summary record, appended to the world's battle history.
    pub result: BattleResult,
    /// Deferred world-level consequences, applied by the orchestrator.
    pub reactions: Vec<CombatReaction>,
}

/// Resolve combat between `attacker` and `defender`.
///
/// Alternates single attacks, attacker first, until one side dies, the
/// round cap is hit, or neither side's combat style can reach the other
/// (positions do not change mid-encounter, so such an exchange could
/// never end). Mutates only the two combatants' health; removal of the
/// dead from world and map is the caller's responsibility.
pub fn resolve_combat<R: Rng + ?Sized>(
    attacker: &mut dyn Combatant,
    defender: &mut dyn Combatant,
    hooks: &dyn CombatHooks,
    rng: &mut R,
) -> CombatOutcome {
    let mut rounds = 0u32;
    let mut damage_by_attacker = 0i32;
    let mut damage_by_defender = 0i32;
    let mut reactions = Vec::new();

    let distance = attacker
        .position()
        .manhattan_distance(&defender.position());
    let anyone_reaches =
        attacker.style().reaches(distance) || defender.style().reaches(distance);

    while anyone_reaches && !attacker.is_dead() && !defender.is_dead() && rounds < MAX_ROUNDS {
        rounds += 1;

        // Attacker strikes first.
        let pre = defender.health();
        single_attack(attacker, defender, distance, hooks, rng, &mut reactions);
        damage_by_attacker += (pre - defender.health()).max(0);
        if defender.is_dead() {
            reactions.extend(hooks.death_reactions(defender));
            break;
        }

        // Defender strikes back.
        let pre = attacker.health();
        single_attack(defender, attacker, distance, hooks, rng, &mut reactions);
        damage_by_defender += (pre - attacker.health()).max(0);
        if attacker.is_dead() {
            reactions.extend(hooks.death_reactions(attacker));
            break;
        }
    }

    CombatOutcome {
        result: BattleResult {
            defender_name: defender.display_name().to_string(),
            rounds,
            damage_by_attacker,
            damage_by_defender,
        },
        reactions,
    }
}

/// One attack from `striker` against `target`.
///
/// Lands only if the striker's style reaches the current distance and
/// the target fails its evasion roll. The damage pipeline is:
/// effective power (hooks fold) → critical doubling → evasion →
/// hook absorption → clamped application → life-steal → post-damage
/// reactions.
fn single_attack<R: Rng + ?Sized>(
    striker: &mut dyn Combatant,
    target: &mut dyn Combatant,
    distance: u32,
    hooks: &dyn CombatHooks,
    rng: &mut R,
    reactions: &mut Vec<CombatReaction>,
) {
    if !striker.style().reaches(distance) {
        return;
    }

    let mut damage = hooks.effective_power(striker);
    let crit = striker.critical_chance().clamp(0.0, 1.0);
    if crit > 0.0 && rng.gen_bool(crit) {
        damage *= 2;
    }

    if rng.gen_bool(target.evasion_chance().clamp(0.0, 1.0)) {
        return;
    }

    let damage = hooks.absorb_damage(target, damage);
    let pre = target.health();
    if damage > 0 {
        target.apply_damage(damage);
    }
    let dealt = (pre - target.health()).max(0);

    let steal = hooks.after_attack(striker, dealt);
    if steal > 0 {
        striker.heal(steal);
    }

    reactions.extend(hooks.after_damage(target));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoHooks;
    use delve_core::Position;
    use delve_entity::{Combatant, Enemy, EnemyKind, Player, PlayerClass};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn adjacent_pair() -> (Player, Enemy) {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut player = Player::new("Aria", PlayerClass::Warrior, Position::new(5, 5));
        player.set_evasion_chance(0.0);
        let enemy = Enemy::spawn(EnemyKind::Orc, Position::new(5, 6), &mut rng);
        (player, enemy)
    }

    #[test]
    fn melee_exchange_at_distance_one_deals_damage() {
        let (mut player, mut enemy) = adjacent_pair();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = resolve_combat(&mut player, &mut enemy, &NoHooks, &mut rng);
        let result = outcome.result;

        assert!(result.rounds >= 1);
        assert!(result.damage_by_attacker > 0);
        // Player evasion is zero, so every orc swing before the kill
        // landed for full power.
        assert!(player.is_dead() || enemy.is_dead());
        if player.is_dead() {
            assert!(result.damage_by_defender > 0);
        }
    }

    #[test]
    fn out_of_reach_exchange_ends_immediately() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut player = Player::new("Aria", PlayerClass::Warrior, Position::new(0, 0));
        let mut enemy = Enemy::spawn(EnemyKind::Orc, Position::new(9, 9), &mut rng);

        let outcome = resolve_combat(&mut player, &mut enemy, &NoHooks, &mut rng);

        assert_eq!(outcome.result.rounds, 0);
        assert_eq!(outcome.result.damage_by_attacker, 0);
        assert_eq!(outcome.result.damage_by_defender, 0);
        assert!(!player.is_dead());
        assert!(!enemy.is_dead());
    }

    #[test]
    fn ranged_attacker_hits_a_melee_defender_that_cannot_reply() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut player = Player::new("Lyra", PlayerClass::Mage, Position::new(0, 0));
        player.set_evasion_chance(0.0);
        let mut enemy = Enemy::spawn(EnemyKind::Goblin, Position::new(0, 3), &mut rng);

        let outcome = resolve_combat(&mut player, &mut enemy, &NoHooks, &mut rng);

        assert!(enemy.is_dead());
        assert_eq!(outcome.result.damage_by_defender, 0);
        assert_eq!(player.health(), player.max_health());
    }

    #[test]
    fn damage_totals_are_actual_health_deltas() {
        let (mut player, mut enemy) = adjacent_pair();
        let enemy_start = enemy.health();
        let player_start = player.health();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let outcome = resolve_combat(&mut player, &mut enemy, &NoHooks, &mut rng);

        assert_eq!(
            outcome.result.damage_by_attacker,
            enemy_start - enemy.health()
        );
        assert_eq!(
            outcome.result.damage_by_defender,
            player_start - player.health()
        );
    }

    #[test]
    fn health_never_goes_negative() {
        for seed in 0..16 {
            let (mut player, mut enemy) = adjacent_pair();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            resolve_combat(&mut player, &mut enemy, &NoHooks, &mut rng);
            assert!(player.health() >= 0);
            assert!(enemy.health() >= 0);
        }
    }

    #[test]
    fn defender_name_is_recorded() {
        let (mut player, mut enemy) = adjacent_pair();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let outcome = resolve_combat(&mut player, &mut enemy, &NoHooks, &mut rng);
        assert_eq!(outcome.result.defender_name, "Orc");
    }

    /// A hook that blocks every hit, so neither side can ever die; the
    /// round cap must end the exchange.
    struct AbsorbEverything;

    impl CombatHooks for AbsorbEverything {
        fn absorb_damage(&self, _target: &dyn Combatant, _amount: i32) -> i32 {
            0
        }
    }

    #[test]
    fn round_cap_ends_unwinnable_exchanges() {
        let (mut player, mut enemy) = adjacent_pair();
        let mut rng = ChaCha8Rng::seed_from_u64(6);

        let outcome = resolve_combat(&mut player, &mut enemy, &AbsorbEverything, &mut rng);

        assert_eq!(outcome.result.rounds, MAX_ROUNDS);
        assert!(!player.is_dead());
        assert!(!enemy.is_dead());
    }
}
