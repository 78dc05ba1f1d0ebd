//! # Chain Reader
//!
//! Read-only queries against an arena contract. Nothing here changes ledger
//! state, so every call is safe to repeat.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::Serialize;

use crate::error::ChainResult;

/// Damage accumulated by both combatants, as reported by the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageReport {
    /// Damage on combatant one.
    pub first: u64,
    /// Damage on combatant two.
    pub second: u64,
}

/// The parts of a transaction receipt the arena cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    /// Transaction hash.
    pub hash: B256,
    /// Execution succeeded.
    pub success: bool,
    /// Block the transaction was mined in.
    pub block_number: Option<u64>,
}

/// Read-only view of the ledger.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// The arena's authoritative round counter.
    async fn current_round(&self, arena: Address) -> ChainResult<u8>;

    /// Damage accumulated by both combatants.
    async fn damage(&self, arena: Address) -> ChainResult<DamageReport>;

    /// True when contract code is deployed at `arena`.
    async fn has_contract(&self, arena: Address) -> ChainResult<bool>;

    /// The receipt for `hash`, or `None` while it is still pending.
    async fn receipt(&self, hash: B256) -> ChainResult<Option<ReceiptSummary>>;
}
