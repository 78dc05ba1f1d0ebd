//! # Moves
//!
//! The fixed five-move set and the per-round move pair.
//!
//! Discriminants match the ledger's `PlayerMoves` enum; the contract rejects
//! anything outside `0..=4`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single combatant move.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    /// Direct attack.
    Strike = 0,
    /// Provoke the opponent.
    Taunt = 1,
    /// Avoid incoming damage.
    Dodge = 2,
    /// Heavy attack.
    #[serde(alias = "special_move")]
    Special = 3,
    /// Heal accumulated damage.
    Recover = 4,
}

impl Move {
    /// All moves in ledger order.
    pub const ALL: [Self; 5] = [
        Self::Strike,
        Self::Taunt,
        Self::Dodge,
        Self::Special,
        Self::Recover,
    ];

    /// Ledger encoding of this move.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Lowercase name, as used by advisory services.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Strike => "strike",
            Self::Taunt => "taunt",
            Self::Dodge => "dodge",
            Self::Special => "special",
            Self::Recover => "recover",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A move name that is not part of the move set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown move: {0}")]
pub struct UnknownMove(pub String);

impl FromStr for Move {
    type Err = UnknownMove;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strike" => Ok(Self::Strike),
            "taunt" => Ok(Self::Taunt),
            "dodge" => Ok(Self::Dodge),
            "special" | "special_move" => Ok(Self::Special),
            "recover" => Ok(Self::Recover),
            _ => Err(UnknownMove(s.to_string())),
        }
    }
}

/// The ordered move pair for one round.
///
/// `first` always belongs to combatant one. A decision is valid for exactly
/// one round and is never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDecision {
    /// Combatant one's move.
    pub first: Move,
    /// Combatant two's move.
    pub second: Move,
}

impl MoveDecision {
    /// Creates a move pair.
    #[must_use]
    pub const fn new(first: Move, second: Move) -> Self {
        Self { first, second }
    }
}

impl fmt::Display for MoveDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_order() {
        for (index, mv) in Move::ALL.iter().enumerate() {
            assert_eq!(usize::from(mv.as_u8()), index);
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("STRIKE".parse::<Move>(), Ok(Move::Strike));
        assert_eq!(" recover ".parse::<Move>(), Ok(Move::Recover));
        assert_eq!("special_move".parse::<Move>(), Ok(Move::Special));
        assert!("fireball".parse::<Move>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Move::Special).unwrap();
        assert_eq!(json, "\"special\"");
        let parsed: Move = serde_json::from_str("\"special_move\"").unwrap();
        assert_eq!(parsed, Move::Special);
    }
}
