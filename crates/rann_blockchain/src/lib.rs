//! # RANN Blockchain Bridge
//!
//! Everything the arena needs from the ledger, behind two traits.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   reads    ┌─────────────────┐
//! │  Kurukshetra    │ ─────────▶ │  ChainReader    │ ──▶ round, damage, code
//! │  Contract       │            └─────────────────┘
//! │                 │   writes   ┌─────────────────┐
//! │                 │ ◀───────── │  ChainWriter    │ ◀── startGame / battle
//! └─────────────────┘            └────────┬────────┘
//!                                         │ signed by
//!                                ┌────────┴────────┐
//!                                │  MoveSigner     │
//!                                └─────────────────┘
//! ```
//!
//! Two ledgers implement the traits: [`RpcLedger`] talks to a real node,
//! [`SimulatedLedger`] keeps arenas in memory for battles whose id is not a
//! contract address.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod contracts;
pub mod error;
pub mod reader;
pub mod rpc;
pub mod signature;
pub mod simulator;
pub mod verifier;
pub mod writer;

pub use contracts::IKurukshetra;
pub use error::{ChainError, ChainResult};
pub use reader::{ChainReader, DamageReport, ReceiptSummary};
pub use rpc::{ChainConfig, RpcLedger};
pub use signature::{MoveSigner, SignedMoves};
pub use simulator::SimulatedLedger;
pub use verifier::{TransactionStatus, TransactionVerifier, Verification};
pub use writer::{ChainWriter, TransactionRecord};
