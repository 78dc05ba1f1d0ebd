//! # RANN Server
//!
//! Runs the battle automation behind the HTTP control surface.
//!
//! ## Production Deployment
//!
//! ```bash
//! export ARENA_AUTOMATION_PRIVATE_KEY=0x...
//! export FLOW_TESTNET_RPC=https://testnet.evm.nodes.onflow.org
//! RANN_CONFIG=/etc/rann/rann.toml ./rann_server
//! ```
//!
//! Battles whose id is not a contract address run against an in-memory
//! ledger and need neither variable.

use std::process::ExitCode;
use std::sync::Arc;

use rann::{router, RannConfig};
use rann_arena::{BattleController, LedgerPorts, MoveSelector};
use rann_blockchain::RpcLedger;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rann=debug")))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = RannConfig::load()?;
    let chain = config.chain_config();
    info!(?chain, "configuration loaded");

    // === LEDGER ===
    let signer = chain.move_signer()?;
    match &signer {
        Some(signer) => info!(operator = %signer.address(), "operator key loaded"),
        None => warn!("ARENA_AUTOMATION_PRIVATE_KEY not set, live round writes will fail"),
    }
    let ledger = Arc::new(RpcLedger::connect(&chain).await?);
    let live = LedgerPorts::from_ledger(ledger, signer.clone());
    let simulated = LedgerPorts::simulated(signer)?;

    // === AUTOMATION ===
    let selector = MoveSelector::from_config(&config.advisory)?;
    info!(advisors = selector.advisor_count(), "move selector ready");
    let controller = Arc::new(BattleController::new(
        config.arena.clone(),
        live,
        simulated,
        selector,
    )?);

    // === HTTP ===
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("control surface listening on http://{addr}");
    info!("   GET  /arena/{{battleId}}   - session snapshot");
    info!("   POST /arena/{{battleId}}   - initialize | cleanup | resume | status");

    axum::serve(listener, router(controller.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    controller.shutdown();
    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
