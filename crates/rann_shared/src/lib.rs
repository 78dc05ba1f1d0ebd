//! # RANN Shared
//!
//! Common types used by the chain bridge, the automation engine and the
//! HTTP control surface.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER perform I/O. If a type needs an RPC client, it
//! belongs in `rann_blockchain`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod battle_id;
pub mod constants;
pub mod moves;

pub use battle_id::BattleId;
pub use constants::{
    CONFIRMATION_TIMEOUT_SECS, MAX_ROUNDS, PRE_BATTLE_COUNTDOWN_SECS, ROUND_COUNTDOWN_SECS,
    RPC_REQUEST_TIMEOUT_SECS, TICK_INTERVAL_MS,
};
pub use moves::{Move, MoveDecision, UnknownMove};
