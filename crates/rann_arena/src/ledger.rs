//! # Ledger Ports
//!
//! The reader, writer and signer one battle runs against. The controller
//! holds two sets: the live RPC ledger and the in-memory simulation.

use std::sync::Arc;

use rann_blockchain::{
    ChainError, ChainReader, ChainResult, ChainWriter, MoveSigner, SignedMoves, SimulatedLedger,
    TransactionVerifier,
};
use rann_shared::MoveDecision;

/// Handles to one ledger, shared by every battle that uses it.
#[derive(Clone)]
pub struct LedgerPorts {
    reader: Arc<dyn ChainReader>,
    writer: Arc<dyn ChainWriter>,
    signer: Option<MoveSigner>,
}

impl LedgerPorts {
    /// Ports from separate reader and writer handles.
    #[must_use]
    pub fn new(
        reader: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        signer: Option<MoveSigner>,
    ) -> Self {
        Self {
            reader,
            writer,
            signer,
        }
    }

    /// Ports from one ledger that both reads and writes.
    #[must_use]
    pub fn from_ledger<L>(ledger: Arc<L>, signer: Option<MoveSigner>) -> Self
    where
        L: ChainReader + ChainWriter + 'static,
    {
        Self::new(ledger.clone(), ledger, signer)
    }

    /// A fresh simulated ledger. Without an operator key the development key
    /// signs.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Configuration`] if the development key cannot be
    /// loaded.
    pub fn simulated(signer: Option<MoveSigner>) -> ChainResult<Self> {
        let signer = match signer {
            Some(signer) => signer,
            None => MoveSigner::development()?,
        };
        Ok(Self::from_ledger(Arc::new(SimulatedLedger::new()), Some(signer)))
    }

    /// Read side.
    #[must_use]
    pub fn reader(&self) -> &Arc<dyn ChainReader> {
        &self.reader
    }

    /// Write side.
    #[must_use]
    pub fn writer(&self) -> &Arc<dyn ChainWriter> {
        &self.writer
    }

    /// Receipt checker over the read side.
    #[must_use]
    pub fn verifier(&self) -> TransactionVerifier {
        TransactionVerifier::new(self.reader.clone())
    }

    /// Signs a move pair with the operator key.
    ///
    /// # Errors
    ///
    /// [`ChainError::Configuration`] when no key is configured, otherwise
    /// whatever signing returns.
    pub fn sign(&self, decision: MoveDecision) -> ChainResult<SignedMoves> {
        self.signer
            .as_ref()
            .ok_or_else(|| {
                ChainError::Configuration("ARENA_AUTOMATION_PRIVATE_KEY not set".into())
            })?
            .sign(decision)
    }
}
