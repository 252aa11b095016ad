//! Rebalance decision pipeline.
//!
//! Turns a main-pool price event plus a fresh snapshot of the target pool into
//! the trade that would bring the target back to the main pool's price:
//!
//! 1. read the target snapshot
//! 2. price both pools exactly from their sqrt prices
//! 3. stop on exact parity
//! 4. pick the token to sell and the sqrt-price delta
//! 5. align the target tick to its spacing
//! 6. sample liquidity at the aligned tick
//! 7. size the trade and scale it to the sell token's base units
//!
//! Any failing step aborts the decision; nothing partial is returned.

use crate::dex::calc::{FIXED_POINT_BITS, Price, price_from_sqrt_x96};
use crate::dex::state::{PoolStateReader, TokenMetadataReader};
use crate::dex::tick::align_tick;
use crate::errors::RebalanceError;
use crate::models::{
    LiquiditySample, PriceEvent, RebalanceDecision, RebalanceTrade, TokenRef, TokenSide,
    TradingPair,
};
use ethers::types::Address;
use num_bigint::BigUint;
use std::cmp::Ordering;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

type Result<T> = std::result::Result<T, RebalanceError>;

pub struct RebalanceEngine<R> {
    reader: R,
    pair: TradingPair,
    read_timeout: Option<Duration>,
}

impl<R: PoolStateReader> RebalanceEngine<R> {
    pub fn new(reader: R, pair: TradingPair) -> Self {
        Self {
            reader,
            pair,
            read_timeout: None,
        }
    }

    /// Bounds every collaborator read. A zero duration disables the bound.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub async fn on_price_event(&self, event: &PriceEvent) -> Result<RebalanceDecision> {
        let snapshot = self
            .bounded("pool state", self.reader.read_snapshot())
            .await?;
        if let (Some(event_block), Some(snapshot_block)) =
            (event.block_number, snapshot.block_number)
        {
            if snapshot_block < event_block {
                return Err(RebalanceError::unavailable(
                    "pool state",
                    format!("snapshot at block {snapshot_block} predates event block {event_block}"),
                ));
            }
        }

        let price_main = price_from_sqrt_x96(event.sqrt_price_x96)?;
        let price_target = price_from_sqrt_x96(snapshot.sqrt_price_x96)?;
        debug!(
            price_main = %price_main.to_decimal().round(12),
            price_target = %price_target.to_decimal().round(12),
            target_tick = snapshot.tick,
            tick_spacing = snapshot.tick_spacing,
            "[BALANCE] prices"
        );

        let token_to_sell = match price_main.cmp(&price_target) {
            Ordering::Equal => return Ok(RebalanceDecision::Parity),
            Ordering::Greater => TokenSide::Token1,
            Ordering::Less => TokenSide::Token0,
        };
        let delta_sqrt = sqrt_delta(token_to_sell, &price_main, &price_target)?;

        let aligned = align_tick(snapshot.tick, snapshot.tick_spacing)?;
        if aligned.clamped {
            warn!(
                raw_tick = snapshot.tick,
                tick_spacing = snapshot.tick_spacing,
                clamped_tick = aligned.tick,
                "[BALANCE] aligned tick clamped to range boundary"
            );
        }

        let reading = self
            .bounded(
                "liquidity",
                self.reader.liquidity_at_tick(&snapshot, aligned.tick),
            )
            .await?;
        let liquidity = LiquiditySample::from_reading(reading);
        if liquidity.is_placeholder() {
            warn!(
                tick = aligned.tick,
                "[BALANCE] no liquidity recorded at tick, sizing with placeholder liquidity of 1"
            );
        }

        let token = self.pair.token(token_to_sell);
        let amount_raw = BigUint::from(liquidity.value()) * &delta_sqrt;
        let amount_scaled = scale_to_base_units(&amount_raw, token);

        Ok(RebalanceDecision::Trade(RebalanceTrade {
            token_to_sell,
            token,
            delta_sqrt,
            amount_raw,
            amount_scaled,
            adjusted_tick: aligned.tick,
            tick_clamped: aligned.clamped,
            liquidity,
        }))
    }

    async fn bounded<T>(
        &self,
        collaborator: &'static str,
        read: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.read_timeout {
            None => read.await,
            Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| {
                RebalanceError::unavailable(collaborator, format!("no response within {limit:?}"))
            })?,
        }
    }
}

/// Fixed-point distance the target pool has to move.
///
/// Selling token1 pushes sqrt(price) up, so the delta is
/// `sqrt(main) - sqrt(target)`. Selling token0 pushes it down and the delta is
/// taken on the reciprocals, `1/sqrt(main) - 1/sqrt(target)`. Callers pick the
/// side from the price comparison, so a negative result means the inputs are
/// inconsistent.
pub fn sqrt_delta(side: TokenSide, price_main: &Price, price_target: &Price) -> Result<BigUint> {
    let (main, target) = match side {
        TokenSide::Token1 => (price_main.sqrt_fixed(), price_target.sqrt_fixed()),
        TokenSide::Token0 => (price_main.inv_sqrt_fixed(), price_target.inv_sqrt_fixed()),
    };
    if main < target {
        return Err(RebalanceError::InvariantViolation(format!(
            "negative sqrt delta selling {side:?}: main {main} < target {target} (2^{FIXED_POINT_BITS} scale)"
        )));
    }
    Ok(main - target)
}

/// `amount_raw * 10^decimals`, with the fixed-point fraction dropped.
pub fn scale_to_base_units(amount_raw: &BigUint, token: TokenRef) -> BigUint {
    let unit = BigUint::from(10u32).pow(u32::from(token.decimals));
    (amount_raw * unit) >> FIXED_POINT_BITS
}

/// Reads both tokens' decimals; done once at startup.
pub async fn resolve_trading_pair<M: TokenMetadataReader + ?Sized>(
    meta: &M,
    token0: Address,
    token1: Address,
) -> Result<TradingPair> {
    let (decimals0, decimals1) =
        tokio::try_join!(meta.decimals_of(token0), meta.decimals_of(token1))?;
    Ok(TradingPair {
        token0: TokenRef {
            address: token0,
            decimals: decimals0,
        },
        token1: TokenRef {
            address: token1,
            decimals: decimals1,
        },
    })
}
