//! In-memory target pool for engine and worker tests.

use crate::dex::state::{PoolSnapshot, PoolStateReader, TokenMetadataReader};
use crate::errors::RebalanceError;
use crate::models::{TokenRef, TradingPair};
use alloy_primitives::U256;
use async_trait::async_trait;
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) fn token0() -> Address {
    Address::repeat_byte(0xa0)
}

pub(crate) fn token1() -> Address {
    Address::repeat_byte(0xa1)
}

pub(crate) fn pair(decimals0: u8, decimals1: u8) -> TradingPair {
    TradingPair {
        token0: TokenRef {
            address: token0(),
            decimals: decimals0,
        },
        token1: TokenRef {
            address: token1(),
            decimals: decimals1,
        },
    }
}

/// `sqrt * 2^96`: the Q64.96 encoding of a whole sqrt price.
pub(crate) fn sqrt_q96(sqrt: u64) -> U256 {
    U256::from(sqrt) << 96usize
}

pub(crate) struct MockPool {
    snapshot: PoolSnapshot,
    liquidity: Option<u128>,
    failing: Option<&'static str>,
    delay: Option<Duration>,
    liquidity_failing: Option<&'static str>,
    liquidity_delay: Option<Duration>,
    pub snapshot_reads: AtomicUsize,
    pub liquidity_reads: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockPool {
    pub fn new(sqrt_price_x96: U256, tick: i32, tick_spacing: i32) -> Self {
        Self {
            snapshot: PoolSnapshot {
                sqrt_price_x96,
                tick,
                tick_spacing,
                block_number: None,
            },
            liquidity: None,
            failing: None,
            delay: None,
            liquidity_failing: None,
            liquidity_delay: None,
            snapshot_reads: AtomicUsize::new(0),
            liquidity_reads: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_liquidity(mut self, liquidity: Option<u128>) -> Self {
        self.liquidity = liquidity;
        self
    }

    pub fn at_block(mut self, block: u64) -> Self {
        self.snapshot.block_number = Some(block);
        self
    }

    pub fn failing(mut self, message: &'static str) -> Self {
        self.failing = Some(message);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_liquidity(mut self, message: &'static str) -> Self {
        self.liquidity_failing = Some(message);
        self
    }

    pub fn with_liquidity_delay(mut self, delay: Duration) -> Self {
        self.liquidity_delay = Some(delay);
        self
    }
}

#[async_trait]
impl PoolStateReader for MockPool {
    async fn read_snapshot(&self) -> Result<PoolSnapshot, RebalanceError> {
        self.snapshot_reads.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.failing {
            Some(message) => Err(RebalanceError::unavailable("pool state", message)),
            None => Ok(self.snapshot.clone()),
        }
    }

    async fn liquidity_at_tick(
        &self,
        _snapshot: &PoolSnapshot,
        _tick: i32,
    ) -> Result<Option<u128>, RebalanceError> {
        self.liquidity_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.liquidity_delay {
            tokio::time::sleep(delay).await;
        }

        match self.liquidity_failing {
            Some(message) => Err(RebalanceError::unavailable("liquidity", message)),
            None => Ok(self.liquidity),
        }
    }
}

pub(crate) struct MockTokens(pub HashMap<Address, u8>);

#[async_trait]
impl TokenMetadataReader for MockTokens {
    async fn decimals_of(&self, token: Address) -> Result<u8, RebalanceError> {
        self.0
            .get(&token)
            .copied()
            .ok_or_else(|| RebalanceError::unavailable("token decimals", format!("{token:?}")))
    }
}
