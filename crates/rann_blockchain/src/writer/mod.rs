//! # Chain Writer
//!
//! State-changing arena calls. Each call returns only after the ledger has
//! confirmed it (or the confirmation bound has elapsed).

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::Serialize;

use crate::error::ChainResult;
use crate::signature::SignedMoves;

/// Outcome of one submitted write.
///
/// The arena keeps exactly one of these per battle and overwrites it every
/// round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Transaction hash.
    pub hash: B256,
    /// Arena the transaction targeted.
    pub arena: Address,
    /// A successful receipt has been observed.
    pub confirmed: bool,
    /// Block the transaction was mined in.
    pub block_number: Option<u64>,
}

impl TransactionRecord {
    /// A confirmed transaction.
    #[must_use]
    pub const fn confirmed(hash: B256, arena: Address, block_number: Option<u64>) -> Self {
        Self {
            hash,
            arena,
            confirmed: true,
            block_number,
        }
    }

    /// A submitted transaction whose receipt has not been seen yet.
    #[must_use]
    pub const fn unconfirmed(hash: B256, arena: Address) -> Self {
        Self {
            hash,
            arena,
            confirmed: false,
            block_number: None,
        }
    }
}

/// State-changing arena operations.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    /// Calls `startGame()` and waits for confirmation.
    async fn start_game(&self, arena: Address) -> ChainResult<TransactionRecord>;

    /// Calls `battle(..)` with a signed move pair and waits for confirmation.
    async fn battle(&self, arena: Address, moves: &SignedMoves) -> ChainResult<TransactionRecord>;
}
