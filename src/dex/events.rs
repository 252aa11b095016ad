use crate::dex::client::{SwapFilter, UniswapV3Pool, to_alloy_u256};
use crate::errors::{AppError, Result};
use crate::models::PriceEvent;
use ethers::{
    contract::LogMeta,
    providers::{Provider, Ws},
    types::Address,
};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};

impl PriceEvent {
    pub fn from_swap(swap: &SwapFilter, meta: Option<&LogMeta>) -> Self {
        Self {
            sqrt_price_x96: to_alloy_u256(swap.sqrt_price_x96),
            tick: swap.tick,
            block_number: meta.map(|m| m.block_number.as_u64()),
        }
    }
}

/// Subscribes to `Swap` logs of `pool` over WebSocket and forwards each one as
/// a `PriceEvent`, in the order the node delivers them.
///
/// The task resolves to `Ok` once the receiver is dropped. A failed or ended
/// subscription is an error: the balancer cannot follow the main pool
/// without it.
pub async fn spawn_swap_event_watcher(
    ws_url: &str,
    pool: Address,
    tx: mpsc::Sender<PriceEvent>,
) -> Result<JoinHandle<Result<()>>> {
    let provider = Arc::new(Provider::<Ws>::connect(ws_url).await?);

    let handle = tokio::spawn(async move {
        let contract = UniswapV3Pool::new(pool, provider);
        let event = contract.swap_filter();
        let stream = event.subscribe_with_meta().await.map_err(|e| {
            warn!(error = %e, "[FEED] swap subscription failed");
            AppError::Feed(format!("swap subscription for {pool:?} failed: {e}"))
        })?;
        info!(?pool, "[FEED] subscribed to swap events");

        forward_swaps(pool, stream, &tx).await
    });

    Ok(handle)
}

/// Drains decoded swap logs into `tx`. Undecodable logs are skipped.
pub(crate) async fn forward_swaps<S, E>(
    pool: Address,
    stream: S,
    tx: &mpsc::Sender<PriceEvent>,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<(SwapFilter, LogMeta), E>>,
    E: Display,
{
    futures::pin_mut!(stream);
    while let Some(item) = stream.next().await {
        match item {
            Ok((swap, meta)) => {
                let event = PriceEvent::from_swap(&swap, Some(&meta));
                if tx.send(event).await.is_err() {
                    info!("[FEED] event receiver closed");
                    return Ok(());
                }
            }
            Err(e) => {
                warn!(error = %e, "[FEED] swap log decode failed");
            }
        }
    }

    warn!(?pool, "[FEED] swap subscription ended");
    Err(AppError::Feed(format!("swap subscription for {pool:?} ended")))
}
