//! Effect application errors.

use crate::effect::EffectKind;
use delve_entity::Role;
use std::error::Error;
use std::fmt;

/// Errors from applying an effect to a character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectError {
    /// The effect's target role does not match the character's role.
    /// The character is left untouched.
    RoleMismatch {
        /// The effect that was refused.
        kind: EffectKind,
        /// The role of the character it was aimed at.
        target_role: Role,
    },
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoleMismatch { kind, target_role } => write!(
                f,
                "effect '{kind}' targets {} characters, not a {target_role}",
                kind.target_role()
            ),
        }
    }
}

impl Error for EffectError {}
