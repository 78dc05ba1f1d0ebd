//! # Arena & Chain Constants
//!
//! Production defaults for battle automation.
//!
//! **NOTE:** Every timing value here is only a default. The server reads the
//! effective values from `rann.toml`; tests shrink or keep them as needed.

// =============================================================================
// BATTLE TIMING
// =============================================================================

/// Countdown before the ledger game is started (betting window).
pub const PRE_BATTLE_COUNTDOWN_SECS: u64 = 70;

/// Countdown between two round writes.
pub const ROUND_COUNTDOWN_SECS: u64 = 40;

/// Number of rounds in a battle. The ledger reports `MAX_ROUNDS + 1` once
/// the last round has been played.
pub const MAX_ROUNDS: u8 = 5;

/// Scheduler resolution.
pub const TICK_INTERVAL_MS: u64 = 1_000;

/// Upper bound on waiting for a transaction receipt.
pub const CONFIRMATION_TIMEOUT_SECS: u64 = 60;

/// Upper bound on one node request (a read, or filling and broadcasting a
/// write).
pub const RPC_REQUEST_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// MOVE SELECTION
// =============================================================================

/// Notional maximum damage a combatant can take.
pub const MAX_DAMAGE: u64 = 100;

/// Share of [`MAX_DAMAGE`] above which a combatant is considered in danger.
pub const HIGH_DAMAGE_PERCENT: u64 = 60;

/// Probability of forcing RECOVER for a combatant in danger.
pub const RECOVER_BIAS: f64 = 0.6;

/// Time budget for the whole advisory pass of one round.
pub const ADVISORY_BUDGET_MS: u64 = 3_000;

// =============================================================================
// CHAIN CONFIGURATION - FLOW EVM TESTNET
// =============================================================================

/// Flow EVM testnet chain id.
pub const FLOW_TESTNET_CHAIN_ID: u64 = 545;

/// Flow EVM testnet public RPC endpoint.
pub const FLOW_TESTNET_RPC_URL: &str = "https://testnet.evm.nodes.onflow.org";

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Control surface bind address.
pub const SERVER_BIND: &str = "0.0.0.0:3001";

/// High-damage threshold in absolute damage points.
#[must_use]
pub const fn high_damage_threshold() -> u64 {
    MAX_DAMAGE * HIGH_DAMAGE_PERCENT / 100
}
