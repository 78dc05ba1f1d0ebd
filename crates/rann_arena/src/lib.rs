//! # RANN Arena
//!
//! Autonomous battle orchestration: drives a five-round contest between two
//! ledger-registered combatants without anyone clicking through the steps.
//!
//! ## State Machine
//!
//! ```text
//!                 70s                      40s × 5
//! AWAITING_START ─────▶ BATTLE_ACTIVE ───────────────▶ FINISHED
//!        │  startGame()       │  battle(moves, sig)
//!        │                    │
//!        └──── write fails ───┴──▶ PAUSED ──(resume)──▶ prior phase
//! ```
//!
//! ## Design Principles
//!
//! 1. **Ledger truth** - the round counter is re-read before every round write
//! 2. **One writer** - the next action is scheduled only after the current
//!    write settles
//! 3. **No silent retry** - a failed write pauses the battle; `resume` is the
//!    only way forward
//! 4. **Advisors are optional** - the heuristic always answers in time

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod controller;
mod driver;
pub mod error;
pub mod ledger;
pub mod moves;
pub mod scheduler;
pub mod session;

pub use config::{AdvisoryConfig, ArenaConfig};
pub use controller::{BattleController, BattleStatus};
pub use error::{ArenaError, ArenaResult};
pub use ledger::LedgerPorts;
pub use moves::{
    AdvisoryError, AdvisoryInput, DamageHeuristic, DecisionSource, HttpAdvisor, MoveAdvisor,
    MoveSelector, Selection,
};
pub use scheduler::BattleScheduler;
pub use session::{BattlePhase, BattleSession, ClockState, SessionRegistry, SessionSnapshot};
