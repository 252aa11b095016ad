use crate::errors::RebalanceError;
use alloy_primitives::U256;
use async_trait::async_trait;
use ethers::types::Address;

/// Consistent view of the target pool taken for a single decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSnapshot {
    /// Current sqrt(price1/price0) in Q96 (Uniswap V3 `slot0.sqrtPriceX96`).
    pub sqrt_price_x96: U256,
    /// Current tick index (Uniswap V3 `slot0.tick`).
    pub tick: i32,
    pub tick_spacing: i32,
    /// Block every read of this snapshot was pinned to, if known.
    pub block_number: Option<u64>,
}

/// Read access to the target pool.
///
/// Implementations must return fresh state on every call; the engine never
/// caches between decisions.
#[async_trait]
pub trait PoolStateReader: Send + Sync {
    async fn read_snapshot(&self) -> Result<PoolSnapshot, RebalanceError>;

    /// Liquidity at `tick`, read at the same point in time as `snapshot`.
    /// `Ok(None)` means the pool has nothing recorded for the tick.
    async fn liquidity_at_tick(
        &self,
        snapshot: &PoolSnapshot,
        tick: i32,
    ) -> Result<Option<u128>, RebalanceError>;
}

#[async_trait]
pub trait TokenMetadataReader: Send + Sync {
    async fn decimals_of(&self, token: Address) -> Result<u8, RebalanceError>;
}

#[async_trait]
impl<T: PoolStateReader + ?Sized> PoolStateReader for std::sync::Arc<T> {
    async fn read_snapshot(&self) -> Result<PoolSnapshot, RebalanceError> {
        (**self).read_snapshot().await
    }

    async fn liquidity_at_tick(
        &self,
        snapshot: &PoolSnapshot,
        tick: i32,
    ) -> Result<Option<u128>, RebalanceError> {
        (**self).liquidity_at_tick(snapshot, tick).await
    }
}
