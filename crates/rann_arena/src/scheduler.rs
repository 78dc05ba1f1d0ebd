//! # Timer Scheduler
//!
//! One repeating tick per battle. A tick charges the real elapsed time to the
//! session's countdown; at zero it runs the due action and waits for it to
//! settle before ticking again.

use std::collections::HashMap;

use parking_lot::Mutex;
use rann_shared::BattleId;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::driver::{self, BattleContext, Flow};
use crate::session::ClockState;

/// Owns the timer task of every battle.
#[derive(Default)]
pub struct BattleScheduler {
    timers: Mutex<HashMap<BattleId, JoinHandle<()>>>,
}

impl BattleScheduler {
    /// Creates a scheduler with no timers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the battle's timer, cancelling any previous one first.
    pub(crate) fn start(&self, battle_id: BattleId, ctx: BattleContext) {
        let handle = tokio::spawn(run(battle_id.clone(), ctx));
        if let Some(previous) = self.timers.lock().insert(battle_id.clone(), handle) {
            previous.abort();
            debug!(battle = %battle_id, "replaced existing timer");
        }
    }

    /// Cancels the battle's timer. A write already submitted may still land.
    pub fn stop(&self, battle_id: &BattleId) -> bool {
        match self.timers.lock().remove(battle_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// True while the battle's timer task is alive.
    #[must_use]
    pub fn is_running(&self, battle_id: &BattleId) -> bool {
        self.timers
            .lock()
            .get(battle_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancels every timer.
    pub fn stop_all(&self) {
        let timers: Vec<_> = self.timers.lock().drain().collect();
        if !timers.is_empty() {
            info!(count = timers.len(), "stopping all battle timers");
        }
        for (_, handle) in timers {
            handle.abort();
        }
    }
}

impl Drop for BattleScheduler {
    fn drop(&mut self) {
        for handle in self.timers.get_mut().values() {
            handle.abort();
        }
    }
}

async fn run(battle_id: BattleId, ctx: BattleContext) {
    let mut interval = tokio::time::interval(ctx.config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(clock) = ctx
            .registry
            .update(&battle_id, |session| session.tick(Instant::now()))
        else {
            debug!(battle = %battle_id, "session gone, timer exiting");
            return;
        };

        match clock {
            ClockState::Running => {}
            ClockState::Halted => {
                debug!(battle = %battle_id, "session inactive, timer exiting");
                return;
            }
            ClockState::Expired => {
                if driver::on_expiry(&battle_id, &ctx).await == Flow::Stop {
                    return;
                }
                interval.reset();
            }
        }
    }
}
