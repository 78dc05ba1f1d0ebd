//! # Move Selection
//!
//! Picks each round's move pair.
//!
//! ```text
//! advisor 1 ──▶ advisor 2 ──▶ ... ──▶ DamageHeuristic
//!   └──────── shared budget ────────┘      (always answers)
//! ```
//!
//! Advisors are tried in order until one answers inside the shared budget.
//! Whatever happens, the heuristic produces a pair, so a slow or unreachable
//! advisory can never stall a round.

mod http;

pub use http::HttpAdvisor;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rann_blockchain::DamageReport;
use rann_shared::constants::{high_damage_threshold, RECOVER_BIAS};
use rann_shared::{Move, MoveDecision};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::config::AdvisoryConfig;

/// What an advisor is told about the upcoming round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvisoryInput {
    /// Ledger round about to be fought.
    pub round: u8,
    /// Damage accumulated so far.
    pub damage: DamageReport,
}

/// Why an advisor gave no decision.
#[derive(Error, Debug)]
pub enum AdvisoryError {
    /// The advisory could not be reached.
    #[error("advisory unreachable: {0}")]
    Unreachable(String),

    /// The advisory answered with a non-success status.
    #[error("advisory returned HTTP {0}")]
    Status(u16),

    /// The answer did not name two valid moves.
    #[error("malformed advisory response: {0}")]
    Malformed(String),

    /// Client setup failed.
    #[error("advisory client error: {0}")]
    Client(String),
}

/// A best-effort source of move decisions.
#[async_trait]
pub trait MoveAdvisor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Proposes a move pair for the round.
    async fn attempt(&self, input: &AdvisoryInput) -> Result<MoveDecision, AdvisoryError>;
}

/// Where a selection came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecisionSource {
    /// A named advisor.
    Advisor(String),
    /// The local damage heuristic.
    Heuristic,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advisor(name) => write!(f, "advisor:{name}"),
            Self::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// A move pair and its origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// The chosen moves.
    pub decision: MoveDecision,
    /// Who chose them.
    pub source: DecisionSource,
}

/// Local fallback policy.
///
/// A combatant whose damage exceeds the high-damage threshold gets RECOVER
/// with probability [`RECOVER_BIAS`], otherwise a uniform draw over all five
/// moves.
pub struct DamageHeuristic {
    rng: Mutex<ChaCha8Rng>,
}

impl DamageHeuristic {
    /// Seeds from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Fixed seed, for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Picks one combatant's move from its accumulated damage.
    pub fn pick(&self, damage: u64) -> Move {
        let mut rng = self.rng.lock();
        if damage > high_damage_threshold() && rng.gen_bool(RECOVER_BIAS) {
            return Move::Recover;
        }
        Move::ALL[rng.gen_range(0..Move::ALL.len())]
    }

    /// Picks both moves.
    pub fn decide(&self, damage: DamageReport) -> MoveDecision {
        MoveDecision::new(self.pick(damage.first), self.pick(damage.second))
    }
}

impl Default for DamageHeuristic {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Ordered advisors plus the heuristic fallback.
pub struct MoveSelector {
    advisors: Vec<Arc<dyn MoveAdvisor>>,
    heuristic: DamageHeuristic,
    budget: Duration,
}

impl MoveSelector {
    /// Heuristic-only selector.
    #[must_use]
    pub fn new(heuristic: DamageHeuristic, budget: Duration) -> Self {
        Self {
            advisors: Vec::new(),
            heuristic,
            budget,
        }
    }

    /// Appends an advisor. Advisors are consulted in insertion order.
    #[must_use]
    pub fn with_advisor(mut self, advisor: Arc<dyn MoveAdvisor>) -> Self {
        self.advisors.push(advisor);
        self
    }

    /// Builds the production selector: the HTTP advisory when an endpoint is
    /// configured, then the entropy-seeded heuristic.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisoryError::Client`] if the HTTP client cannot be built.
    pub fn from_config(config: &AdvisoryConfig) -> Result<Self, AdvisoryError> {
        let mut selector = Self::new(DamageHeuristic::from_entropy(), config.budget());
        if let Some(endpoint) = &config.endpoint {
            let advisor = HttpAdvisor::new(endpoint.clone(), config.api_key.clone())?;
            selector = selector.with_advisor(Arc::new(advisor));
        }
        Ok(selector)
    }

    /// Number of configured advisors.
    #[must_use]
    pub fn advisor_count(&self) -> usize {
        self.advisors.len()
    }

    /// Decides the round's moves. Never fails and never exceeds the budget
    /// by more than the heuristic's own cost.
    pub async fn select(&self, input: &AdvisoryInput) -> Selection {
        let deadline = Instant::now() + self.budget;

        for advisor in &self.advisors {
            match timeout_at(deadline, advisor.attempt(input)).await {
                Ok(Ok(decision)) => {
                    debug!(advisor = advisor.name(), %decision, "advisor decided");
                    return Selection {
                        decision,
                        source: DecisionSource::Advisor(advisor.name().to_owned()),
                    };
                }
                Ok(Err(err)) => {
                    warn!(advisor = advisor.name(), error = %err, "advisor failed, trying next");
                }
                Err(_) => {
                    warn!(
                        advisor = advisor.name(),
                        budget_ms = u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX),
                        "advisory budget exhausted"
                    );
                    break;
                }
            }
        }

        Selection {
            decision: self.heuristic.decide(input.damage),
            source: DecisionSource::Heuristic,
        }
    }
}
