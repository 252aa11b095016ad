use crate::dex::state::{PoolSnapshot, PoolStateReader, TokenMetadataReader};
use crate::errors::{RebalanceError, Result};
use alloy_primitives::U256;
use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::{Http, Middleware, Provider},
    types::{Address, BlockId, U64},
};
use std::sync::Arc;
use tracing::debug;

abigen!(
    UniswapV3Pool,
    r"[
        function slot0() view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked)
        function tickSpacing() view returns (int24)
        function ticks(int24 tick) view returns (uint128 liquidityGross, int128 liquidityNet, uint256 feeGrowthOutside0X128, uint256 feeGrowthOutside1X128, int56 tickCumulativeOutside, uint160 secondsPerLiquidityOutsideX128, uint32 secondsOutside, bool initialized)
        function token0() view returns (address)
        function token1() view returns (address)
        event Swap(address indexed sender, address indexed recipient, int256 amount0, int256 amount1, uint160 sqrtPriceX96, uint128 liquidity, int24 tick)
    ]",
);

abigen!(
    Erc20,
    r"[
        function decimals() view returns (uint8)
    ]",
);

/// Handle for reading a specific Uniswap V3 pool over JSON-RPC.
#[derive(Clone)]
pub struct PoolClient {
    provider: Arc<Provider<Http>>,
    pool: UniswapV3Pool<Provider<Http>>,
}

impl PoolClient {
    pub async fn new(rpc_url: &str, pool_addr: Address) -> Result<Self> {
        let provider = Arc::new(Provider::<Http>::try_from(rpc_url)?);
        let pool = UniswapV3Pool::new(pool_addr, provider.clone());
        pool.slot_0()
            .call()
            .await
            .map_err(|e| RebalanceError::unavailable("pool state", e))?; // sanity-check
        Ok(Self { provider, pool })
    }

    pub fn address(&self) -> Address {
        self.pool.address()
    }

    /// `token0()` and `token1()` of the pool.
    pub async fn token_addresses(&self) -> std::result::Result<(Address, Address), RebalanceError> {
        let token0_call = self.pool.token_0();
        let token1_call = self.pool.token_1();
        tokio::try_join!(token0_call.call(), token1_call.call())
            .map_err(|e| RebalanceError::unavailable("pool tokens", e))
    }
}

#[async_trait]
impl PoolStateReader for PoolClient {
    /// Pins slot0 and tickSpacing to the latest block so both come from the
    /// same state.
    async fn read_snapshot(&self) -> std::result::Result<PoolSnapshot, RebalanceError> {
        let block = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| RebalanceError::unavailable("block number", e))?;

        let slot0_call = self.pool.slot_0().block(block);
        let spacing_call = self.pool.tick_spacing().block(block);
        let ((sqrt_price_x96, tick, _, _, _, _fee_protocol, _unlocked), tick_spacing) =
            tokio::try_join!(slot0_call.call(), spacing_call.call())
                .map_err(|e| RebalanceError::unavailable("pool state", e))?;

        debug!(
            pool = ?self.address(),
            block = block.as_u64(),
            %sqrt_price_x96,
            tick,
            tick_spacing,
            "[DEX] target snapshot"
        );

        Ok(PoolSnapshot {
            sqrt_price_x96: to_alloy_u256(sqrt_price_x96),
            tick,
            tick_spacing,
            block_number: Some(block.as_u64()),
        })
    }

    async fn liquidity_at_tick(
        &self,
        snapshot: &PoolSnapshot,
        tick: i32,
    ) -> std::result::Result<Option<u128>, RebalanceError> {
        let mut call = self.pool.ticks(tick);
        if let Some(block) = snapshot.block_number {
            call = call.block(BlockId::from(U64::from(block)));
        }
        let (liquidity_gross, _net, _, _, _, _, _, initialized) = call
            .call()
            .await
            .map_err(|e| RebalanceError::unavailable("liquidity", e))?;

        Ok(initialized.then_some(liquidity_gross))
    }
}

#[async_trait]
impl TokenMetadataReader for PoolClient {
    async fn decimals_of(&self, token: Address) -> std::result::Result<u8, RebalanceError> {
        Erc20::new(token, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(|e| RebalanceError::unavailable("token decimals", e))
    }
}

/// Converts an ethers word into the alloy representation used by the math.
pub fn to_alloy_u256(value: ethers::types::U256) -> U256 {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    U256::from_be_bytes(buf)
}
