//! # Battle Sessions
//!
//! The mutable automation record for one battle. Sessions live only in
//! memory; a restart forgets them.
//!
//! All mutation goes through the methods below so the invariants hold in
//! one place:
//!
//! - `current_round` never decreases while the battle is active
//! - `time_remaining` never goes below zero
//! - nothing moves a session out of `Finished`

mod registry;

pub use registry::SessionRegistry;

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy_primitives::B256;
use rann_shared::BattleId;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::{ArenaError, ArenaResult};

/// Lifecycle phase of a battle session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattlePhase {
    /// Counting down to `startGame()`.
    AwaitingStart,
    /// Rounds are being played.
    BattleActive,
    /// A write failed; waiting for `resume`.
    Paused,
    /// All rounds played.
    Finished,
}

impl BattlePhase {
    /// Phases in which the scheduler acts on countdown expiry.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::AwaitingStart | Self::BattleActive)
    }
}

impl fmt::Display for BattlePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AwaitingStart => "AWAITING_START",
            Self::BattleActive => "BATTLE_ACTIVE",
            Self::Paused => "PAUSED",
            Self::Finished => "FINISHED",
        })
    }
}

/// What one scheduler tick found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    /// Countdown still running.
    Running,
    /// Countdown reached zero in an active phase.
    Expired,
    /// Session is paused or finished; the timer should stop.
    Halted,
}

/// Automation state of one battle.
#[derive(Clone, Debug)]
pub struct BattleSession {
    battle_id: BattleId,
    combatants: [u64; 2],
    phase: BattlePhase,
    /// Phase to return to on `resume`.
    paused_from: Option<BattlePhase>,
    current_round: u8,
    max_rounds: u8,
    time_remaining: Duration,
    total_time: Duration,
    /// Reference point for the next countdown decrement.
    last_tick: Instant,
    last_update: SystemTime,
    last_transaction_hash: Option<B256>,
    automation_error: Option<String>,
    is_simulation: bool,
}

impl BattleSession {
    /// Creates a session waiting for the pre-battle countdown.
    #[must_use]
    pub fn new(
        battle_id: BattleId,
        combatants: [u64; 2],
        max_rounds: u8,
        countdown: Duration,
        now: Instant,
    ) -> Self {
        let is_simulation = battle_id.is_simulation();
        Self {
            battle_id,
            combatants,
            phase: BattlePhase::AwaitingStart,
            paused_from: None,
            current_round: 0,
            max_rounds,
            time_remaining: countdown,
            total_time: countdown,
            last_tick: now,
            last_update: SystemTime::now(),
            last_transaction_hash: None,
            automation_error: None,
            is_simulation,
        }
    }

    /// Battle identifier.
    #[must_use]
    pub const fn battle_id(&self) -> &BattleId {
        &self.battle_id
    }

    /// Combatant token ids.
    #[must_use]
    pub const fn combatants(&self) -> [u64; 2] {
        self.combatants
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Current round (0 before the ledger game starts).
    #[must_use]
    pub const fn current_round(&self) -> u8 {
        self.current_round
    }

    /// Rounds in this battle.
    #[must_use]
    pub const fn max_rounds(&self) -> u8 {
        self.max_rounds
    }

    /// Time left on the countdown.
    #[must_use]
    pub const fn time_remaining(&self) -> Duration {
        self.time_remaining
    }

    /// Hash of the most recent write.
    #[must_use]
    pub const fn last_transaction_hash(&self) -> Option<B256> {
        self.last_transaction_hash
    }

    /// Cause of the last pause.
    #[must_use]
    pub fn automation_error(&self) -> Option<&str> {
        self.automation_error.as_deref()
    }

    /// True when running against the simulated ledger.
    #[must_use]
    pub const fn is_simulation(&self) -> bool {
        self.is_simulation
    }

    /// Advances the countdown by the wall-clock time since the last tick.
    pub fn tick(&mut self, now: Instant) -> ClockState {
        if !self.phase.is_active() {
            return ClockState::Halted;
        }

        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.last_update = SystemTime::now();
        self.time_remaining = self.time_remaining.saturating_sub(elapsed);

        if self.time_remaining.is_zero() {
            ClockState::Expired
        } else {
            ClockState::Running
        }
    }

    fn restart_countdown(&mut self, countdown: Duration, now: Instant) {
        self.time_remaining = countdown;
        self.total_time = countdown;
        self.last_tick = now;
        self.last_update = SystemTime::now();
    }

    /// The ledger game is running at `ledger_round`.
    ///
    /// `hash` is the start write when we sent it; `None` when joining a game
    /// the ledger had already started.
    pub fn begin_battle(
        &mut self,
        ledger_round: u8,
        hash: Option<B256>,
        countdown: Duration,
        now: Instant,
    ) {
        if self.phase == BattlePhase::Finished {
            return;
        }
        self.phase = BattlePhase::BattleActive;
        self.current_round = ledger_round.max(1);
        if hash.is_some() {
            self.last_transaction_hash = hash;
        }
        self.restart_countdown(countdown, now);
    }

    /// Aligns the local round with the ledger's counter.
    pub fn adopt_ledger_round(&mut self, ledger_round: u8) {
        if ledger_round > self.current_round {
            self.current_round = ledger_round;
        }
    }

    /// A round write for `ledger_round` confirmed.
    ///
    /// Returns `true` when that was the last round and the battle finished.
    pub fn complete_round(
        &mut self,
        ledger_round: u8,
        hash: B256,
        countdown: Duration,
        now: Instant,
    ) -> bool {
        self.current_round = self.current_round.max(ledger_round.saturating_add(1));
        self.last_transaction_hash = Some(hash);
        self.restart_countdown(countdown, now);

        if self.current_round > self.max_rounds {
            self.finish();
        }
        self.phase == BattlePhase::Finished
    }

    /// A write was submitted but its outcome is unknown.
    pub fn record_submission(&mut self, hash: B256) {
        self.last_transaction_hash = Some(hash);
    }

    /// Stops automation after a failed write. Round and countdown are kept.
    pub fn pause(&mut self, cause: String) {
        if self.phase.is_active() {
            self.paused_from = Some(self.phase);
            self.phase = BattlePhase::Paused;
        }
        self.automation_error = Some(cause);
        self.last_update = SystemTime::now();
    }

    /// Returns a paused session to the phase it was paused from.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::NotPaused`] for any other phase.
    pub fn resume(&mut self, countdown: Duration, now: Instant) -> ArenaResult<()> {
        if self.phase != BattlePhase::Paused {
            return Err(ArenaError::NotPaused {
                battle_id: self.battle_id.clone(),
                phase: self.phase,
            });
        }
        self.phase = self.paused_from.take().unwrap_or(BattlePhase::BattleActive);
        self.automation_error = None;
        self.restart_countdown(countdown, now);
        Ok(())
    }

    /// All rounds are done.
    pub fn finish(&mut self) {
        self.phase = BattlePhase::Finished;
        self.paused_from = None;
        self.time_remaining = Duration::ZERO;
        self.last_update = SystemTime::now();
    }

    /// Serializable view of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            battle_id: self.battle_id.clone(),
            phase: self.phase,
            current_round: self.current_round,
            max_rounds: self.max_rounds,
            time_remaining: whole_seconds(self.time_remaining),
            total_time: whole_seconds(self.total_time),
            last_update: self
                .last_update
                .duration_since(UNIX_EPOCH)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or(0),
            last_transaction_hash: self.last_transaction_hash,
            automation_error: self.automation_error.clone(),
            is_simulation: self.is_simulation,
            combatant1_ref: self.combatants[0],
            combatant2_ref: self.combatants[1],
        }
    }
}

/// Rounds a countdown up to whole seconds, so 0.4s left reads as 1.
fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

/// Point-in-time copy of a session, as served over the control surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Battle identifier.
    pub battle_id: BattleId,
    /// Current phase.
    pub phase: BattlePhase,
    /// Current round.
    pub current_round: u8,
    /// Rounds in this battle.
    pub max_rounds: u8,
    /// Seconds left on the countdown.
    pub time_remaining: u64,
    /// Length of the current countdown in seconds.
    pub total_time: u64,
    /// Last mutation, unix milliseconds.
    pub last_update: u64,
    /// Hash of the most recent write.
    pub last_transaction_hash: Option<B256>,
    /// Cause of the last pause.
    pub automation_error: Option<String>,
    /// Running against the simulated ledger.
    pub is_simulation: bool,
    /// Combatant one token id.
    #[serde(rename = "combatant1Ref")]
    pub combatant1_ref: u64,
    /// Combatant two token id.
    #[serde(rename = "combatant2Ref")]
    pub combatant2_ref: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRE_BATTLE: Duration = Duration::from_secs(70);
    const ROUND: Duration = Duration::from_secs(40);

    fn session(now: Instant) -> BattleSession {
        BattleSession::new(
            BattleId::new("0x5FbDB2315678afecb367f032d93F642f64180aa3").unwrap(),
            [1, 2],
            5,
            PRE_BATTLE,
            now,
        )
    }

    #[test]
    fn test_new_session_awaits_start() {
        let s = session(Instant::now());
        let snap = s.snapshot();
        assert_eq!(snap.phase, BattlePhase::AwaitingStart);
        assert_eq!(snap.time_remaining, 70);
        assert_eq!(snap.current_round, 0);
        assert!(!snap.is_simulation);
    }

    #[test]
    fn test_tick_uses_wall_clock_delta() {
        let start = Instant::now();
        let mut s = session(start);

        assert_eq!(s.tick(start + Duration::from_millis(2_500)), ClockState::Running);
        assert_eq!(s.time_remaining(), Duration::from_millis(67_500));

        assert_eq!(s.tick(start + Duration::from_secs(80)), ClockState::Expired);
        assert_eq!(s.time_remaining(), Duration::ZERO);
    }

    #[test]
    fn test_round_progression_and_finish() {
        let now = Instant::now();
        let mut s = session(now);
        s.begin_battle(1, Some(B256::repeat_byte(1)), ROUND, now);
        assert_eq!(s.phase(), BattlePhase::BattleActive);
        assert_eq!(s.current_round(), 1);

        for round in 1..5 {
            assert!(!s.complete_round(round, B256::repeat_byte(2), ROUND, now));
            assert_eq!(s.current_round(), round + 1);
            assert_eq!(s.time_remaining(), ROUND);
        }

        assert!(s.complete_round(5, B256::repeat_byte(3), ROUND, now));
        assert_eq!(s.phase(), BattlePhase::Finished);
        assert_eq!(s.current_round(), 6);
        assert_eq!(s.tick(now + ROUND), ClockState::Halted);
    }

    #[test]
    fn test_pause_keeps_round_and_countdown() {
        let now = Instant::now();
        let mut s = session(now);
        s.begin_battle(1, Some(B256::ZERO), ROUND, now);
        s.tick(now + ROUND);

        s.pause("transaction reverted".into());
        assert_eq!(s.phase(), BattlePhase::Paused);
        assert_eq!(s.current_round(), 1);
        assert_eq!(s.time_remaining(), Duration::ZERO);
        assert_eq!(s.automation_error(), Some("transaction reverted"));
        assert_eq!(s.tick(now + ROUND * 2), ClockState::Halted);

        s.resume(ROUND, now + ROUND * 2).unwrap();
        assert_eq!(s.phase(), BattlePhase::BattleActive);
        assert_eq!(s.time_remaining(), ROUND);
        assert_eq!(s.automation_error(), None);
    }

    #[test]
    fn test_resume_returns_to_awaiting_start() {
        let now = Instant::now();
        let mut s = session(now);
        s.pause("no contract".into());
        s.resume(ROUND, now).unwrap();
        assert_eq!(s.phase(), BattlePhase::AwaitingStart);
        assert_eq!(s.time_remaining(), ROUND);
    }

    #[test]
    fn test_resume_requires_pause() {
        let now = Instant::now();
        let mut s = session(now);
        let err = s.resume(ROUND, now).unwrap_err();
        assert!(matches!(
            err,
            ArenaError::NotPaused {
                phase: BattlePhase::AwaitingStart,
                ..
            }
        ));
    }

    #[test]
    fn test_joining_started_game_takes_ledger_round() {
        let now = Instant::now();
        let mut s = session(now);
        s.begin_battle(3, None, ROUND, now);
        assert_eq!(s.phase(), BattlePhase::BattleActive);
        assert_eq!(s.current_round(), 3);
        assert_eq!(s.time_remaining(), ROUND);
        assert_eq!(s.last_transaction_hash(), None);
    }

    #[test]
    fn test_round_never_decreases() {
        let now = Instant::now();
        let mut s = session(now);
        s.begin_battle(1, Some(B256::ZERO), ROUND, now);
        s.adopt_ledger_round(3);
        assert_eq!(s.current_round(), 3);
        s.adopt_ledger_round(2);
        assert_eq!(s.current_round(), 3);
    }

    #[test]
    fn test_snapshot_json_keys() {
        let s = session(Instant::now());
        let json = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(json["phase"], "AWAITING_START");
        assert_eq!(json["timeRemaining"], 70);
        assert_eq!(json["combatant1Ref"], 1);
        assert_eq!(json["combatant2Ref"], 2);
        assert!(json["lastTransactionHash"].is_null());
    }

    #[test]
    fn test_whole_seconds_rounds_up() {
        assert_eq!(whole_seconds(Duration::from_millis(400)), 1);
        assert_eq!(whole_seconds(Duration::from_secs(40)), 40);
        assert_eq!(whole_seconds(Duration::ZERO), 0);
    }
}
