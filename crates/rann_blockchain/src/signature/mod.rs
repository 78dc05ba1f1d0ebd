//! # Move Signatures
//!
//! The arena contract only accepts a move pair signed by the game master
//! key. It recomputes
//!
//! ```text
//! digest = keccak256(abi.encodePacked(uint8 first, uint8 second))
//! signer = ecrecover(keccak256("\x19Ethereum Signed Message:\n32" ‖ digest), sig)
//! ```
//!
//! and reverts on mismatch. We only produce the signature; checking it is
//! the ledger's job.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{keccak256, Address, Bytes, Signature, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{sol_data, SolType};
use rann_shared::MoveDecision;

use crate::error::{ChainError, ChainResult};

/// Byte length of an encoded move pair.
pub const MOVE_ENCODING_LEN: usize = 2;

/// Local development key (anvil account #0).
const DEVELOPMENT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// A move pair together with the signature the ledger will check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedMoves {
    /// The moves that were signed.
    pub decision: MoveDecision,
    /// `keccak256` of the packed encoding.
    pub digest: B256,
    /// EIP-191 signature over `digest`.
    pub signature: Signature,
}

impl SignedMoves {
    /// The 65-byte `r ‖ s ‖ v` form passed to the contract.
    #[must_use]
    pub fn signature_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.signature.as_bytes())
    }
}

/// Signs move pairs with the operator key.
#[derive(Clone)]
pub struct MoveSigner {
    signer: PrivateKeySigner,
}

impl fmt::Debug for MoveSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoveSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl MoveSigner {
    /// Wraps an existing signer.
    #[must_use]
    pub const fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Parses a hex private key (with or without `0x`).
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Configuration`] when the key is malformed.
    pub fn from_hex_key(key: &str) -> ChainResult<Self> {
        PrivateKeySigner::from_str(key.trim())
            .map(Self::new)
            .map_err(|err| ChainError::Configuration(format!("invalid signing key: {err}")))
    }

    /// Signer for simulated arenas when no operator key is configured.
    ///
    /// Uses the well-known local development key. Never attach it to a real
    /// network.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Configuration`] if the built-in key fails to parse.
    pub fn development() -> ChainResult<Self> {
        Self::from_hex_key(DEVELOPMENT_KEY)
    }

    /// The underlying key, for attaching to a transaction wallet.
    #[must_use]
    pub fn into_inner(self) -> PrivateKeySigner {
        self.signer
    }

    /// Address the ledger will recover.
    #[must_use]
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Packed encoding of a move pair: one byte per move, combatant one first.
    #[must_use]
    pub fn encode(decision: MoveDecision) -> Vec<u8> {
        <(sol_data::Uint<8>, sol_data::Uint<8>)>::abi_encode_packed(&(
            decision.first.as_u8(),
            decision.second.as_u8(),
        ))
    }

    /// Content hash of the packed encoding.
    #[must_use]
    pub fn digest(decision: MoveDecision) -> B256 {
        keccak256(Self::encode(decision))
    }

    /// Signs a move pair.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Signing`] if the key cannot produce a signature.
    pub fn sign(&self, decision: MoveDecision) -> ChainResult<SignedMoves> {
        let digest = Self::digest(decision);
        let signature = self
            .signer
            .sign_message_sync(digest.as_slice())
            .map_err(|err| ChainError::Signing(err.to_string()))?;

        Ok(SignedMoves {
            decision,
            digest,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rann_shared::Move;

    // Well-known development key (anvil account #0).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_encoding_layout() {
        let decision = MoveDecision::new(Move::Special, Move::Dodge);
        let encoded = MoveSigner::encode(decision);
        assert_eq!(encoded.len(), MOVE_ENCODING_LEN);
        assert_eq!(encoded, vec![3, 2]);
    }

    #[test]
    fn test_encoding_is_ordered() {
        let a = MoveSigner::digest(MoveDecision::new(Move::Strike, Move::Recover));
        let b = MoveSigner::digest(MoveDecision::new(Move::Recover, Move::Strike));
        assert_ne!(a, b);
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = MoveSigner::from_hex_key(DEV_KEY).unwrap();
        let decision = MoveDecision::new(Move::Strike, Move::Taunt);

        assert_eq!(MoveSigner::encode(decision), MoveSigner::encode(decision));

        let first = signer.sign(decision).unwrap();
        let second = signer.sign(decision).unwrap();
        assert_eq!(first.digest, second.digest);
        assert_eq!(first.signature_bytes(), second.signature_bytes());
    }

    #[test]
    fn test_signature_recovers_operator() {
        let signer = MoveSigner::from_hex_key(DEV_KEY).unwrap();
        assert_eq!(signer.address(), DEV_ADDRESS.parse::<Address>().unwrap());

        let signed = signer
            .sign(MoveDecision::new(Move::Dodge, Move::Special))
            .unwrap();
        let recovered = signed
            .signature
            .recover_address_from_msg(signed.digest.as_slice())
            .unwrap();
        assert_eq!(recovered, signer.address());
        assert_eq!(signed.signature_bytes().len(), 65);
    }

    #[test]
    fn test_development_signer() {
        let signer = MoveSigner::development().unwrap();
        assert_eq!(signer.address(), DEV_ADDRESS.parse::<Address>().unwrap());
    }

    #[test]
    fn test_malformed_key() {
        let err = MoveSigner::from_hex_key("0x1234").unwrap_err();
        assert!(matches!(err, ChainError::Configuration(_)));
    }
}
