//! # Arena Configuration
//!
//! Battle timing and advisory settings, loaded once at startup from the
//! `[arena]` and `[advisory]` sections of `rann.toml`.

use std::time::Duration;

use rann_shared::constants::ADVISORY_BUDGET_MS;
use rann_shared::{MAX_ROUNDS, PRE_BATTLE_COUNTDOWN_SECS, ROUND_COUNTDOWN_SECS, TICK_INTERVAL_MS};
use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, ArenaResult};

/// Battle timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Countdown before `startGame()`.
    pub pre_battle_countdown_secs: u64,
    /// Countdown between round writes.
    pub round_countdown_secs: u64,
    /// Rounds per battle.
    pub max_rounds: u8,
    /// Scheduler resolution.
    pub tick_interval_ms: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            pre_battle_countdown_secs: PRE_BATTLE_COUNTDOWN_SECS,
            round_countdown_secs: ROUND_COUNTDOWN_SECS,
            max_rounds: MAX_ROUNDS,
            tick_interval_ms: TICK_INTERVAL_MS,
        }
    }
}

impl ArenaConfig {
    /// Countdown before the ledger game starts.
    #[must_use]
    pub const fn pre_battle_countdown(&self) -> Duration {
        Duration::from_secs(self.pre_battle_countdown_secs)
    }

    /// Countdown between rounds.
    #[must_use]
    pub const fn round_countdown(&self) -> Duration {
        Duration::from_secs(self.round_countdown_secs)
    }

    /// Scheduler tick period.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Rejects values the scheduler cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> ArenaResult<()> {
        if self.max_rounds == 0 {
            return Err(ArenaError::InvalidConfig("max_rounds must be at least 1".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ArenaError::InvalidConfig("tick_interval_ms must be positive".into()));
        }
        if self.round_countdown_secs == 0 {
            return Err(ArenaError::InvalidConfig(
                "round_countdown_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// External move advisory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Advisory endpoint. No endpoint means heuristic only.
    pub endpoint: Option<String>,
    /// Key sent in the request metadata.
    pub api_key: Option<String>,
    /// Budget for the whole advisory pass of one round.
    pub budget_ms: u64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            budget_ms: ADVISORY_BUDGET_MS,
        }
    }
}

impl AdvisoryConfig {
    /// Advisory budget.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_timing() {
        let config = ArenaConfig::default();
        assert_eq!(config.pre_battle_countdown(), Duration::from_secs(70));
        assert_eq!(config.round_countdown(), Duration::from_secs(40));
        assert_eq!(config.max_rounds, 5);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ArenaConfig = toml::from_str("round_countdown_secs = 10").unwrap();
        assert_eq!(config.round_countdown_secs, 10);
        assert_eq!(config.pre_battle_countdown_secs, 70);
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let config = ArenaConfig {
            max_rounds: 0,
            ..ArenaConfig::default()
        };
        assert!(matches!(config.validate(), Err(ArenaError::InvalidConfig(_))));
    }
}
