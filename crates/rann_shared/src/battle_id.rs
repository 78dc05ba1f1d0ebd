//! # Battle Identifiers
//!
//! A battle is keyed by its arena contract address. Identifiers that do not
//! parse as an address run in simulation mode against an in-memory ledger.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{keccak256, Address};
use serde::{Deserialize, Serialize};

/// Identifier of one battle session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BattleId(String);

impl BattleId {
    /// Creates a battle id, rejecting blank input.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The raw identifier.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The contract address, if this id is a real ledger address.
    #[must_use]
    pub fn contract_address(&self) -> Option<Address> {
        Address::from_str(&self.0).ok()
    }

    /// True when this id does not resemble a ledger address.
    #[must_use]
    pub fn is_simulation(&self) -> bool {
        self.contract_address().is_none()
    }

    /// Address used on the ledger for this battle.
    ///
    /// Simulation ids map to the low 20 bytes of `keccak256(id)` so the
    /// simulated ledger can key contracts the same way the real one does.
    #[must_use]
    pub fn ledger_address(&self) -> Address {
        self.contract_address()
            .unwrap_or_else(|| Address::from_word(keccak256(self.0.as_bytes())))
    }
}

impl fmt::Display for BattleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
