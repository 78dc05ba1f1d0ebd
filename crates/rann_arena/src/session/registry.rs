//! # Session Registry
//!
//! The one table of live battles, shared by the controller and the
//! scheduler tasks. Each battle also has one slot for its last transaction.
//!
//! Every operation takes the lock once and releases it before returning, so
//! nothing here can be held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::B256;
use parking_lot::Mutex;
use rann_blockchain::TransactionRecord;
use rann_shared::BattleId;

use super::{BattleSession, SessionSnapshot};
use crate::error::{ArenaError, ArenaResult};

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<BattleId, BattleSession>,
    transactions: HashMap<BattleId, TransactionRecord>,
}

/// Process-local session table keyed by battle id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new session.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::AlreadyActive`] if the battle already has one.
    pub fn insert(&self, session: BattleSession) -> ArenaResult<SessionSnapshot> {
        let mut state = self.inner.lock();
        let battle_id = session.battle_id().clone();
        if state.sessions.contains_key(&battle_id) {
            return Err(ArenaError::AlreadyActive(battle_id));
        }
        let snapshot = session.snapshot();
        state.sessions.insert(battle_id, session);
        Ok(snapshot)
    }

    /// Removes a session and its transaction slot.
    pub fn remove(&self, battle_id: &BattleId) -> Option<BattleSession> {
        let mut state = self.inner.lock();
        state.transactions.remove(battle_id);
        state.sessions.remove(battle_id)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    /// True when no battle is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().sessions.is_empty()
    }

    /// Mutates one session. Returns `None` if it does not exist.
    pub fn update<R>(
        &self,
        battle_id: &BattleId,
        f: impl FnOnce(&mut BattleSession) -> R,
    ) -> Option<R> {
        self.inner.lock().sessions.get_mut(battle_id).map(f)
    }

    /// Records a write outcome and mutates the session under one lock.
    ///
    /// Nothing is recorded if the session was cleaned up while the write was
    /// in flight.
    pub fn settle<R>(
        &self,
        battle_id: &BattleId,
        record: Option<TransactionRecord>,
        f: impl FnOnce(&mut BattleSession) -> R,
    ) -> Option<R> {
        let mut state = self.inner.lock();
        let session = state.sessions.get_mut(battle_id)?;
        let result = f(session);
        if let Some(record) = record {
            state.transactions.insert(battle_id.clone(), record);
        }
        Some(result)
    }

    /// Snapshot of one session.
    #[must_use]
    pub fn snapshot(&self, battle_id: &BattleId) -> Option<SessionSnapshot> {
        self.inner
            .lock()
            .sessions
            .get(battle_id)
            .map(BattleSession::snapshot)
    }

    /// The last transaction submitted for a battle.
    #[must_use]
    pub fn last_transaction(&self, battle_id: &BattleId) -> Option<TransactionRecord> {
        self.inner.lock().transactions.get(battle_id).copied()
    }

    /// Marks the recorded transaction confirmed, if it is still `hash`.
    pub fn confirm_transaction(&self, battle_id: &BattleId, hash: B256, block_number: Option<u64>) {
        if let Some(record) = self.inner.lock().transactions.get_mut(battle_id) {
            if record.hash == hash {
                record.confirmed = true;
                record.block_number = block_number.or(record.block_number);
            }
        }
    }

    /// Ids of every tracked battle.
    #[must_use]
    pub fn battle_ids(&self) -> Vec<BattleId> {
        self.inner.lock().sessions.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use std::time::Duration;
    use tokio::time::Instant;

    fn session(id: &str) -> BattleSession {
        BattleSession::new(
            BattleId::new(id).unwrap(),
            [1, 2],
            5,
            Duration::from_secs(70),
            Instant::now(),
        )
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let registry = SessionRegistry::new();
        registry.insert(session("arena-1")).unwrap();
        let err = registry.insert(session("arena-1")).unwrap_err();
        assert_eq!(err, ArenaError::AlreadyActive(BattleId::new("arena-1").unwrap()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_drops_transaction_slot() {
        let registry = SessionRegistry::new();
        let id = BattleId::new("arena-1").unwrap();
        registry.insert(session("arena-1")).unwrap();
        registry.settle(
            &id,
            Some(TransactionRecord::unconfirmed(B256::ZERO, Address::ZERO)),
            |_| (),
        );
        assert!(registry.last_transaction(&id).is_some());

        assert!(registry.remove(&id).is_some());
        assert!(registry.last_transaction(&id).is_none());
        assert!(registry.remove(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_settle_after_cleanup_is_dropped() {
        let registry = SessionRegistry::new();
        let id = BattleId::new("gone").unwrap();
        let applied = registry.settle(
            &id,
            Some(TransactionRecord::unconfirmed(B256::ZERO, Address::ZERO)),
            |_| (),
        );
        assert!(applied.is_none());
        assert!(registry.last_transaction(&id).is_none());
    }

    #[test]
    fn test_confirm_only_matching_hash() {
        let registry = SessionRegistry::new();
        let id = BattleId::new("arena-1").unwrap();
        registry.insert(session("arena-1")).unwrap();
        let hash = B256::repeat_byte(4);
        registry.settle(&id, Some(TransactionRecord::unconfirmed(hash, Address::ZERO)), |_| ());

        registry.confirm_transaction(&id, B256::repeat_byte(5), Some(1));
        assert!(!registry.last_transaction(&id).unwrap().confirmed);

        registry.confirm_transaction(&id, hash, Some(12));
        let record = registry.last_transaction(&id).unwrap();
        assert!(record.confirmed);
        assert_eq!(record.block_number, Some(12));
    }
}
