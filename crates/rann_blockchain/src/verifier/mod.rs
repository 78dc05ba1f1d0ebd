//! # Transaction Verifier
//!
//! Turns a transaction hash into success / failure / unknown. Read failures
//! never propagate: a receipt we cannot fetch is simply `Unknown`.

use std::sync::Arc;

use alloy_primitives::B256;
use serde::Serialize;

use crate::reader::ChainReader;

/// Confirmation status of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Mined and executed successfully.
    Success,
    /// Mined and reverted.
    Failure,
    /// Pending, dropped, or the receipt could not be read.
    Unknown,
}

/// Result of verifying one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    /// The transaction checked.
    pub hash: B256,
    /// Its status.
    pub status: TransactionStatus,
    /// Block it was mined in, if known.
    pub block_number: Option<u64>,
    /// Why the status is unknown, if a read failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Polls receipts through a [`ChainReader`].
#[derive(Clone)]
pub struct TransactionVerifier {
    reader: Arc<dyn ChainReader>,
}

impl TransactionVerifier {
    /// Creates a verifier over `reader`.
    #[must_use]
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }

    /// Checks the receipt for `hash`.
    ///
    /// In simulation mode the transaction is reported successful without
    /// any I/O.
    pub async fn verify(&self, hash: B256, simulation: bool) -> Verification {
        if simulation {
            return Verification {
                hash,
                status: TransactionStatus::Success,
                block_number: None,
                error: None,
            };
        }

        match self.reader.receipt(hash).await {
            Ok(Some(receipt)) => Verification {
                hash,
                status: if receipt.success {
                    TransactionStatus::Success
                } else {
                    TransactionStatus::Failure
                },
                block_number: receipt.block_number,
                error: None,
            },
            Ok(None) => Verification {
                hash,
                status: TransactionStatus::Unknown,
                block_number: None,
                error: None,
            },
            Err(err) => {
                tracing::warn!("Failed to verify transaction {}: {}", hash, err);
                Verification {
                    hash,
                    status: TransactionStatus::Unknown,
                    block_number: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
