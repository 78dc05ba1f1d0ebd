//! # Arena Error Types
//!
//! Usage errors returned by the controller. Automation failures are not
//! errors here: they pause the battle and are recorded on the session.

use rann_shared::BattleId;
use thiserror::Error;

use crate::session::BattlePhase;

/// Errors returned by arena operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    /// No session for this battle.
    #[error("battle not found: {0}")]
    NotFound(BattleId),

    /// A session for this battle already exists.
    #[error("battle already active: {0}")]
    AlreadyActive(BattleId),

    /// `resume` on a battle that is not paused.
    #[error("battle {battle_id} is not paused (phase {phase})")]
    NotPaused {
        /// The battle.
        battle_id: BattleId,
        /// Its current phase.
        phase: BattlePhase,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;
