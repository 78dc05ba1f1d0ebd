//! # Battle Controller
//!
//! The public face of the automation: initialize, cleanup, resume and
//! status. Every call is keyed by battle id and touches only that battle.

use std::sync::Arc;

use alloy_primitives::Address;
use rann_blockchain::{TransactionRecord, TransactionStatus, Verification};
use rann_shared::BattleId;
use serde::Serialize;
use tokio::time::Instant;
use tracing::info;

use crate::config::ArenaConfig;
use crate::driver::BattleContext;
use crate::error::{ArenaError, ArenaResult};
use crate::ledger::LedgerPorts;
use crate::moves::MoveSelector;
use crate::scheduler::BattleScheduler;
use crate::session::{BattleSession, SessionRegistry, SessionSnapshot};

/// Session state plus ledger-side detail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleStatus {
    /// The session.
    pub game_state: SessionSnapshot,
    /// A timer task is alive for this battle.
    pub has_active_timer: bool,
    /// Confirmation state of the last write.
    pub last_transaction: Option<Verification>,
    /// Contract address, for battles on the live ledger.
    pub arena_address: Option<Address>,
}

/// Orchestrates every battle in the process.
pub struct BattleController {
    config: Arc<ArenaConfig>,
    registry: SessionRegistry,
    scheduler: BattleScheduler,
    selector: Arc<MoveSelector>,
    live: LedgerPorts,
    simulated: LedgerPorts,
}

impl BattleController {
    /// Creates a controller over the live and simulated ledgers.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidConfig`] if the timing is unusable.
    pub fn new(
        config: ArenaConfig,
        live: LedgerPorts,
        simulated: LedgerPorts,
        selector: MoveSelector,
    ) -> ArenaResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            registry: SessionRegistry::new(),
            scheduler: BattleScheduler::new(),
            selector: Arc::new(selector),
            live,
            simulated,
        })
    }

    fn ports(&self, battle_id: &BattleId) -> &LedgerPorts {
        if battle_id.is_simulation() {
            &self.simulated
        } else {
            &self.live
        }
    }

    fn context(&self, battle_id: &BattleId) -> BattleContext {
        BattleContext {
            registry: self.registry.clone(),
            ports: self.ports(battle_id).clone(),
            selector: self.selector.clone(),
            config: self.config.clone(),
        }
    }

    /// Creates a session awaiting start and starts its timer.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AlreadyActive`] if the battle already has a
    /// session.
    pub fn initialize(
        &self,
        battle_id: BattleId,
        combatants: [u64; 2],
    ) -> ArenaResult<SessionSnapshot> {
        let session = BattleSession::new(
            battle_id.clone(),
            combatants,
            self.config.max_rounds,
            self.config.pre_battle_countdown(),
            Instant::now(),
        );
        let snapshot = self.registry.insert(session)?;

        self.scheduler
            .start(battle_id.clone(), self.context(&battle_id));
        info!(
            battle = %battle_id,
            combatants = ?combatants,
            simulation = snapshot.is_simulation,
            "battle initialized"
        );
        Ok(snapshot)
    }

    /// Stops the timer and forgets the battle. Does nothing for unknown ids.
    pub fn cleanup(&self, battle_id: &BattleId) {
        let stopped = self.scheduler.stop(battle_id);
        if self.registry.remove(battle_id).is_some() || stopped {
            info!(battle = %battle_id, "battle cleaned up");
        }
    }

    /// Returns a paused battle to its prior phase with a fresh round
    /// countdown and restarts its timer.
    ///
    /// # Errors
    ///
    /// [`ArenaError::NotFound`] for unknown ids, [`ArenaError::NotPaused`]
    /// when the battle is not paused.
    pub fn resume(&self, battle_id: &BattleId) -> ArenaResult<SessionSnapshot> {
        let countdown = self.config.round_countdown();
        let snapshot = self
            .registry
            .update(battle_id, |session| -> ArenaResult<SessionSnapshot> {
                session.resume(countdown, Instant::now())?;
                Ok(session.snapshot())
            })
            .ok_or_else(|| ArenaError::NotFound(battle_id.clone()))??;

        self.scheduler
            .start(battle_id.clone(), self.context(battle_id));
        info!(battle = %battle_id, phase = %snapshot.phase, "battle resumed");
        Ok(snapshot)
    }

    /// Current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::NotFound`] for unknown ids.
    pub fn get(&self, battle_id: &BattleId) -> ArenaResult<SessionSnapshot> {
        self.registry
            .snapshot(battle_id)
            .ok_or_else(|| ArenaError::NotFound(battle_id.clone()))
    }

    /// Snapshot plus the confirmation state of the last write.
    ///
    /// A write recorded as unconfirmed (its confirmation wait timed out) is
    /// marked confirmed here once its receipt reports success. The session
    /// itself is left as it is; a paused battle still needs `resume`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::NotFound`] for unknown ids.
    pub async fn status(&self, battle_id: &BattleId) -> ArenaResult<BattleStatus> {
        let snapshot = self.get(battle_id)?;

        let last_transaction = match self.registry.last_transaction(battle_id) {
            Some(record) => {
                let verification = self
                    .ports(battle_id)
                    .verifier()
                    .verify(record.hash, snapshot.is_simulation)
                    .await;
                if !record.confirmed && verification.status == TransactionStatus::Success {
                    self.registry.confirm_transaction(
                        battle_id,
                        record.hash,
                        verification.block_number,
                    );
                    info!(battle = %battle_id, hash = %record.hash, "late confirmation reconciled");
                }
                Some(verification)
            }
            None => None,
        };

        Ok(BattleStatus {
            has_active_timer: self.scheduler.is_running(battle_id),
            arena_address: battle_id.contract_address(),
            game_state: snapshot,
            last_transaction,
        })
    }

    /// True when the battle has a live timer.
    #[must_use]
    pub fn has_active_timer(&self, battle_id: &BattleId) -> bool {
        self.scheduler.is_running(battle_id)
    }

    /// Ids of every tracked battle.
    #[must_use]
    pub fn battles(&self) -> Vec<BattleId> {
        self.registry.battle_ids()
    }

    /// The last recorded write for a battle.
    #[must_use]
    pub fn last_transaction(&self, battle_id: &BattleId) -> Option<TransactionRecord> {
        self.registry.last_transaction(battle_id)
    }

    /// Cancels every timer. Sessions stay readable.
    pub fn shutdown(&self) {
        self.scheduler.stop_all();
    }
}
