//! Countdown-expiry actions: start the ledger game or fight one round.
//!
//! Each action runs to completion inside the battle's timer task, so at most
//! one write per battle is ever in flight. Failures pause the session; there
//! is no retry here.

use std::sync::Arc;

use alloy_primitives::Address;
use rann_blockchain::{ChainError, DamageReport, TransactionRecord};
use rann_shared::BattleId;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::ArenaConfig;
use crate::ledger::LedgerPorts;
use crate::moves::{AdvisoryInput, MoveSelector};
use crate::session::{BattlePhase, SessionRegistry};

/// Whether the timer keeps ticking after an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Everything a timer task needs to act on one battle.
#[derive(Clone)]
pub(crate) struct BattleContext {
    pub(crate) registry: SessionRegistry,
    pub(crate) ports: LedgerPorts,
    pub(crate) selector: Arc<MoveSelector>,
    pub(crate) config: Arc<ArenaConfig>,
}

/// Runs the action due when a countdown reaches zero.
pub(crate) async fn on_expiry(battle_id: &BattleId, ctx: &BattleContext) -> Flow {
    let Some(snapshot) = ctx.registry.snapshot(battle_id) else {
        return Flow::Stop;
    };

    match snapshot.phase {
        BattlePhase::AwaitingStart => open_battle(battle_id, ctx).await,
        BattlePhase::BattleActive => play_round(battle_id, snapshot.current_round, ctx).await,
        BattlePhase::Paused | BattlePhase::Finished => Flow::Stop,
    }
}

/// The pre-battle countdown is over. Starts the ledger game, or joins it if
/// the ledger has already moved past round 0.
async fn open_battle(battle_id: &BattleId, ctx: &BattleContext) -> Flow {
    let arena = battle_id.ledger_address();

    let ledger_round = match ctx.ports.reader().current_round(arena).await {
        Ok(round) => round,
        Err(err) => return pause(battle_id, arena, &err, ctx),
    };

    if ledger_round == 0 {
        return start_game(battle_id, ctx).await;
    }

    if ledger_round > ctx.config.max_rounds {
        info!(battle = %battle_id, ledger_round, "ledger reports battle over before start");
        ctx.registry.update(battle_id, |session| session.finish());
        return Flow::Stop;
    }

    warn!(
        battle = %battle_id,
        ledger_round,
        "state desync: ledger game already started, joining at ledger round"
    );
    let countdown = ctx.config.round_countdown();
    let joined = ctx.registry.update(battle_id, |session| {
        session.begin_battle(ledger_round, None, countdown, Instant::now());
    });
    if joined.is_none() {
        return Flow::Stop;
    }
    play_round(battle_id, ledger_round, ctx).await
}

async fn start_game(battle_id: &BattleId, ctx: &BattleContext) -> Flow {
    let arena = battle_id.ledger_address();
    info!(battle = %battle_id, %arena, "countdown over, starting game");

    match ctx.ports.writer().start_game(arena).await {
        Ok(record) => {
            let countdown = ctx.config.round_countdown();
            let applied = ctx.registry.settle(battle_id, Some(record), |session| {
                session.begin_battle(1, Some(record.hash), countdown, Instant::now());
            });
            if applied.is_none() {
                return Flow::Stop;
            }
            info!(battle = %battle_id, hash = %record.hash, "game started, round 1");
            Flow::Continue
        }
        Err(err) => pause(battle_id, arena, &err, ctx),
    }
}

async fn play_round(battle_id: &BattleId, local_round: u8, ctx: &BattleContext) -> Flow {
    let arena = battle_id.ledger_address();
    let reader = ctx.ports.reader();

    let ledger_round = match reader.current_round(arena).await {
        Ok(round) => round,
        Err(err) => return pause(battle_id, arena, &err, ctx),
    };

    if ledger_round == 0 {
        warn!(
            battle = %battle_id,
            local_round,
            "state desync: ledger game not started, re-issuing start"
        );
        return start_game(battle_id, ctx).await;
    }

    if ledger_round > ctx.config.max_rounds {
        info!(battle = %battle_id, ledger_round, "ledger reports battle over");
        ctx.registry.update(battle_id, |session| session.finish());
        return Flow::Stop;
    }

    if ledger_round != local_round {
        warn!(
            battle = %battle_id,
            local_round,
            ledger_round,
            "state desync: adopting ledger round"
        );
        ctx.registry
            .update(battle_id, |session| session.adopt_ledger_round(ledger_round));
    }

    let damage = reader.damage(arena).await.unwrap_or_else(|err| {
        warn!(battle = %battle_id, error = %err, "damage read failed, assuming none");
        DamageReport::default()
    });

    let selection = ctx
        .selector
        .select(&AdvisoryInput {
            round: ledger_round,
            damage,
        })
        .await;
    info!(
        battle = %battle_id,
        round = ledger_round,
        moves = %selection.decision,
        source = %selection.source,
        "moves selected"
    );

    let signed = match ctx.ports.sign(selection.decision) {
        Ok(signed) => signed,
        Err(err) => return pause(battle_id, arena, &err, ctx),
    };

    match ctx.ports.writer().battle(arena, &signed).await {
        Ok(record) => {
            let countdown = ctx.config.round_countdown();
            let finished = ctx.registry.settle(battle_id, Some(record), |session| {
                session.complete_round(ledger_round, record.hash, countdown, Instant::now())
            });
            match finished {
                None => Flow::Stop,
                Some(true) => {
                    info!(battle = %battle_id, hash = %record.hash, "final round confirmed, battle finished");
                    Flow::Stop
                }
                Some(false) => {
                    info!(battle = %battle_id, round = ledger_round, hash = %record.hash, "round confirmed");
                    Flow::Continue
                }
            }
        }
        Err(err) => pause(battle_id, arena, &err, ctx),
    }
}

/// Pauses after a write-path failure. A submitted hash is kept as an
/// unconfirmed transaction so `status` can reconcile it later.
fn pause(battle_id: &BattleId, arena: Address, err: &ChainError, ctx: &BattleContext) -> Flow {
    let submitted = err.submitted_hash();
    let record = submitted.map(|hash| TransactionRecord::unconfirmed(hash, arena));

    ctx.registry.settle(battle_id, record, |session| {
        if let Some(hash) = submitted {
            session.record_submission(hash);
        }
        session.pause(err.to_string());
    });

    error!(battle = %battle_id, error = %err, "automation paused");
    Flow::Stop
}
