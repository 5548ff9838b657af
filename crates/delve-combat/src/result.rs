//! The summary record of a single combat encounter.

use std::fmt;

/// Result summary of one combat encounter.
///
/// Damage totals are actual health deltas, never negative, so evasion
/// and shields are accounted for transparently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleResult {
    /// Display name of the defender.
    pub defender_name: String,
    /// Number of full exchanges fought.
    pub rounds: u32,
    /// Total health the attacker removed from the defender.
    pub damage_by_attacker: i32,
    /// Total health the defender removed from the attacker.
    pub damage_by_defender: i32,
}

impl fmt::Display for BattleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "battle vs {}: rounds={}, dealt={}, taken={}",
            self.defender_name, self.rounds, self.damage_by_attacker, self.damage_by_defender
        )
    }
}
