use anyhow::Result;
use price_balancer::{
    balancer::{PairHandle, RebalanceEngine, resolve_trading_pair, spawn_pair_worker},
    config::AppConfig,
    dex::{PoolClient, spawn_swap_event_watcher},
    utils,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::load()?;
    tracing::info!(
        main_pool = ?config.main_pool,
        target_pool = ?config.target_pool,
        read_timeout_ms = config.read_timeout.as_millis() as u64,
        event_buffer = config.event_buffer,
        "[INIT] price-balancer starting"
    );

    // Pool handles ---------------------------------------------------------
    let main_pool = PoolClient::new(&config.rpc_url, config.main_pool).await?;
    let target_pool = PoolClient::new(&config.rpc_url, config.target_pool).await?;

    // Trading pair is fixed for the lifetime of the process
    let (token0, token1) = main_pool.token_addresses().await?;
    let pair = resolve_trading_pair(&main_pool, token0, token1).await?;
    tracing::info!(
        token0 = ?pair.token0.address,
        decimals0 = pair.token0.decimals,
        token1 = ?pair.token1.address,
        decimals1 = pair.token1.decimals,
        "[INIT] trading pair resolved"
    );

    // One worker per (main, target) pair -----------------------------------
    let engine = RebalanceEngine::new(target_pool, pair).with_read_timeout(config.read_timeout);
    let PairHandle {
        events,
        mut outcomes,
        task: worker,
    } = spawn_pair_worker(engine, config.event_buffer);

    let feed = spawn_swap_event_watcher(&config.ws_url, config.main_pool, events).await?;
    tracing::info!("[INIT] swap feed started");

    // Decision consumer: execution is out of scope, decisions are reported only.
    while let Some(outcome) = outcomes.recv().await {
        utils::log_outcome(&outcome);
    }

    tracing::warn!("[DECISION] outcome stream closed, shutting down");
    let (feed, worker) = futures::join!(feed, worker);
    worker?;
    // A dead feed is what usually closes the outcome stream; exit non-zero.
    feed??;
    Ok(())
}
