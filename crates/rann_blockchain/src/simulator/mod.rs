//! # Simulated Ledger
//!
//! An in-memory stand-in for the arena contract, used for battles whose id
//! is not a contract address.
//!
//! It follows the contract's rules closely enough for the automation to run
//! end to end: `startGame` moves round 0 to 1, `battle` is only accepted in
//! rounds 1..=5 and advances the round, and the round reads 6 once the last
//! round has been fought.

use std::collections::HashMap;

use alloy_primitives::{keccak256, Address, B256};
use async_trait::async_trait;
use parking_lot::Mutex;
use rann_shared::{Move, MoveDecision, MAX_ROUNDS};

use crate::error::{ChainError, ChainResult};
use crate::reader::{ChainReader, DamageReport, ReceiptSummary};
use crate::signature::SignedMoves;
use crate::writer::{ChainWriter, TransactionRecord};

/// Healing applied by RECOVER.
const RECOVER_HEAL: u64 = 10;

/// One simulated arena.
#[derive(Clone, Copy, Debug, Default)]
struct SimulatedArena {
    round: u8,
    damage: DamageReport,
}

#[derive(Default)]
struct LedgerState {
    arenas: HashMap<Address, SimulatedArena>,
    receipts: HashMap<B256, ReceiptSummary>,
    block_number: u64,
}

impl LedgerState {
    /// Mines a transaction for `arena` and stores its receipt.
    fn mine(&mut self, arena: Address, success: bool) -> ReceiptSummary {
        self.block_number += 1;
        let mut preimage = [0u8; 28];
        preimage[..20].copy_from_slice(arena.as_slice());
        preimage[20..].copy_from_slice(&self.block_number.to_be_bytes());

        let receipt = ReceiptSummary {
            hash: keccak256(preimage),
            success,
            block_number: Some(self.block_number),
        };
        self.receipts.insert(receipt.hash, receipt);
        receipt
    }
}

/// Damage `attacker` deals to `defender` in one exchange.
fn hit(attacker: Move, defender: Move) -> u64 {
    match (attacker, defender) {
        (_, Move::Dodge) => 0,
        (Move::Strike, _) => 10,
        (Move::Special, _) => 20,
        (Move::Taunt, _) => 5,
        (Move::Dodge | Move::Recover, _) => 0,
    }
}

/// Applies one round to the damage counters.
fn resolve(damage: DamageReport, decision: MoveDecision) -> DamageReport {
    let mut first = damage.first + hit(decision.second, decision.first);
    let mut second = damage.second + hit(decision.first, decision.second);
    if decision.first == Move::Recover {
        first = first.saturating_sub(RECOVER_HEAL);
    }
    if decision.second == Move::Recover {
        second = second.saturating_sub(RECOVER_HEAL);
    }
    DamageReport { first, second }
}

/// In-memory ledger keyed by arena address.
#[derive(Default)]
pub struct SimulatedLedger {
    state: Mutex<LedgerState>,
}

impl SimulatedLedger {
    /// Creates an empty simulated ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces an arena's round counter. Used to rehearse ledger desync.
    pub fn set_round(&self, arena: Address, round: u8) {
        self.state.lock().arenas.entry(arena).or_default().round = round;
    }
}

#[async_trait]
impl ChainReader for SimulatedLedger {
    async fn current_round(&self, arena: Address) -> ChainResult<u8> {
        Ok(self
            .state
            .lock()
            .arenas
            .get(&arena)
            .map_or(0, |a| a.round))
    }

    async fn damage(&self, arena: Address) -> ChainResult<DamageReport> {
        Ok(self
            .state
            .lock()
            .arenas
            .get(&arena)
            .map(|a| a.damage)
            .unwrap_or_default())
    }

    async fn has_contract(&self, _arena: Address) -> ChainResult<bool> {
        Ok(true)
    }

    async fn receipt(&self, hash: B256) -> ChainResult<Option<ReceiptSummary>> {
        Ok(self.state.lock().receipts.get(&hash).copied())
    }
}

#[async_trait]
impl ChainWriter for SimulatedLedger {
    async fn start_game(&self, arena: Address) -> ChainResult<TransactionRecord> {
        let mut state = self.state.lock();
        let current = state.arenas.get(&arena).map_or(0, |a| a.round);
        if current != 0 {
            let receipt = state.mine(arena, false);
            return Err(ChainError::TransactionReverted {
                hash: receipt.hash,
                block_number: receipt.block_number,
            });
        }

        state.arenas.entry(arena).or_default().round = 1;
        let receipt = state.mine(arena, true);
        Ok(TransactionRecord::confirmed(receipt.hash, arena, receipt.block_number))
    }

    async fn battle(&self, arena: Address, moves: &SignedMoves) -> ChainResult<TransactionRecord> {
        let mut state = self.state.lock();
        let current = state.arenas.get(&arena).copied().unwrap_or_default();
        if current.round == 0 || current.round > MAX_ROUNDS {
            let receipt = state.mine(arena, false);
            return Err(ChainError::TransactionReverted {
                hash: receipt.hash,
                block_number: receipt.block_number,
            });
        }

        state.arenas.insert(
            arena,
            SimulatedArena {
                round: current.round + 1,
                damage: resolve(current.damage, moves.decision),
            },
        );
        let receipt = state.mine(arena, true);
        Ok(TransactionRecord::confirmed(receipt.hash, arena, receipt.block_number))
    }
}
