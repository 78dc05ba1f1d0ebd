//! # Chain Error Types
//!
//! All errors that can occur talking to the ledger.

use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Errors that can occur in the chain bridge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Missing or malformed signing key or network endpoint.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No contract code at the target address.
    #[error("no contract deployed at {0}")]
    ContractNotFound(Address),

    /// The receipt did not appear within the confirmation bound.
    #[error("transaction {hash} not confirmed within {timeout_secs}s")]
    TransactionTimeout {
        /// The submitted transaction.
        hash: B256,
        /// The bound that elapsed.
        timeout_secs: u64,
    },

    /// The transaction was mined but execution failed.
    #[error("transaction {hash} reverted")]
    TransactionReverted {
        /// The reverted transaction.
        hash: B256,
        /// Block it was mined in, if known.
        block_number: Option<u64>,
    },

    /// The node did not answer a request in time.
    #[error("{operation} timed out after {timeout_secs}s")]
    RequestTimeout {
        /// The RPC step that stalled.
        operation: &'static str,
        /// The bound that elapsed.
        timeout_secs: u64,
    },

    /// Transport or node error.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Return data did not match the contract interface.
    #[error("failed to decode {call} return data: {reason}")]
    Decode {
        /// Solidity signature of the call.
        call: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// The operator key could not produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),
}

impl ChainError {
    /// Hash of the submitted transaction, when the failure happened after
    /// submission.
    #[must_use]
    pub const fn submitted_hash(&self) -> Option<B256> {
        match self {
            Self::TransactionTimeout { hash, .. } | Self::TransactionReverted { hash, .. } => {
                Some(*hash)
            }
            _ => None,
        }
    }
}

impl From<alloy_transport::TransportError> for ChainError {
    fn from(err: alloy_transport::TransportError) -> Self {
        Self::Rpc(err.to_string())
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submitted_hash() {
        let hash = B256::repeat_byte(7);
        let timeout = ChainError::TransactionTimeout {
            hash,
            timeout_secs: 60,
        };
        assert_eq!(timeout.submitted_hash(), Some(hash));
        assert_eq!(ChainError::Rpc("down".into()).submitted_hash(), None);
        assert_eq!(
            ChainError::RequestTimeout {
                operation: "eth_call",
                timeout_secs: 15
            }
            .submitted_hash(),
            None
        );
        assert_eq!(
            ChainError::ContractNotFound(Address::ZERO).submitted_hash(),
            None
        );
    }

    #[test]
    fn test_messages_are_readable() {
        let err = ChainError::Configuration("ARENA_AUTOMATION_PRIVATE_KEY not set".into());
        assert_eq!(
            err.to_string(),
            "configuration error: ARENA_AUTOMATION_PRIVATE_KEY not set"
        );
    }
}
