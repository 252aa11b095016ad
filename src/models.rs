//! Shared data structures used throughout the application.

use crate::dex::calc::{FIXED_POINT_BITS, from_fixed};
use crate::errors::Result;
use alloy_primitives::U256;
use ethers::types::Address;
use num_bigint::BigUint;
use serde::Serialize;

/// Price change observed on the main pool (decoded `Swap` log).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEvent {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    /// Block the log was emitted in, when the source knows it.
    pub block_number: Option<u64>,
}

/// One side of the trading pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSide {
    Token0,
    Token1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRef {
    pub address: Address,
    pub decimals: u8,
}

/// Token pair of the main pool, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingPair {
    pub token0: TokenRef,
    pub token1: TokenRef,
}

impl TradingPair {
    pub fn token(&self, side: TokenSide) -> TokenRef {
        match side {
            TokenSide::Token0 => self.token0,
            TokenSide::Token1 => self.token1,
        }
    }
}

/// Liquidity used for sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquiditySample {
    /// Value read from the target pool at the aligned tick.
    Observed(u128),
    /// The reader had nothing for the tick. Sizing uses a liquidity of 1 as a
    /// conservative placeholder until a real depth model exists; this is not
    /// on-chain depth.
    Placeholder,
}

impl LiquiditySample {
    pub const PLACEHOLDER_LIQUIDITY: u128 = 1;

    pub fn from_reading(reading: Option<u128>) -> Self {
        reading.map_or(Self::Placeholder, Self::Observed)
    }

    pub fn value(&self) -> u128 {
        match self {
            Self::Observed(liquidity) => *liquidity,
            Self::Placeholder => Self::PLACEHOLDER_LIQUIDITY,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

/// Corrective trade for the target pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceTrade {
    pub token_to_sell: TokenSide,
    pub token: TokenRef,
    /// Difference of sqrt prices (or of their reciprocals when selling
    /// token0), fixed-point with `FIXED_POINT_BITS` fractional bits.
    pub delta_sqrt: BigUint,
    /// `liquidity * delta_sqrt`, same fixed-point scale.
    pub amount_raw: BigUint,
    /// Whole base units of `token`.
    pub amount_scaled: BigUint,
    pub adjusted_tick: i32,
    pub tick_clamped: bool,
    pub liquidity: LiquiditySample,
}

impl RebalanceTrade {
    /// `amount_raw` without its fractional bits.
    pub fn amount_raw_whole(&self) -> BigUint {
        from_fixed(&self.amount_raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebalanceDecision {
    /// Both pools already quote the exact same price.
    Parity,
    Trade(RebalanceTrade),
}

impl RebalanceDecision {
    pub fn is_parity(&self) -> bool {
        matches!(self, Self::Parity)
    }

    pub fn trade(&self) -> Option<&RebalanceTrade> {
        match self {
            Self::Parity => None,
            Self::Trade(trade) => Some(trade),
        }
    }
}

/// Flat, serializable view of a decision for the consumer's log line.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionReport {
    pub block_number: Option<u64>,
    pub parity: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_to_sell: Option<TokenSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_scaled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_tick: Option<i32>,
    pub tick_clamped: bool,
    pub placeholder_liquidity: bool,
    pub fixed_point_bits: u32,
}

impl DecisionReport {
    pub fn new(event: &PriceEvent, decision: &RebalanceDecision) -> Self {
        let trade = decision.trade();
        Self {
            block_number: event.block_number,
            parity: decision.is_parity(),
            token_to_sell: trade.map(|t| t.token_to_sell),
            token: trade.map(|t| format!("{:?}", t.token.address)),
            amount_raw: trade.map(|t| t.amount_raw.to_string()),
            amount_scaled: trade.map(|t| t.amount_scaled.to_string()),
            adjusted_tick: trade.map(|t| t.adjusted_tick),
            tick_clamped: trade.is_some_and(|t| t.tick_clamped),
            placeholder_liquidity: trade.is_some_and(|t| t.liquidity.is_placeholder()),
            fixed_point_bits: FIXED_POINT_BITS,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> PriceEvent {
        PriceEvent {
            sqrt_price_x96: U256::from(1u64) << 96usize,
            tick: 0,
            block_number: Some(42),
        }
    }

    #[test]
    fn placeholder_liquidity_is_labelled() {
        let sample = LiquiditySample::from_reading(None);
        assert!(sample.is_placeholder());
        assert_eq!(sample.value(), 1);

        let observed = LiquiditySample::from_reading(Some(1));
        assert!(!observed.is_placeholder());
        assert_eq!(observed.value(), 1);
    }

    #[test]
    fn parity_report_omits_trade_fields() {
        let report = DecisionReport::new(&event(), &RebalanceDecision::Parity);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["parity"], true);
        assert_eq!(json["block_number"], 42);
        assert!(json.get("token_to_sell").is_none());
        assert!(json.get("amount_scaled").is_none());
    }

    #[test]
    fn trade_report_serializes_amounts_as_strings() {
        let trade = RebalanceTrade {
            token_to_sell: TokenSide::Token1,
            token: TokenRef {
                address: Address::repeat_byte(0x11),
                decimals: 18,
            },
            delta_sqrt: BigUint::from(1u32) << FIXED_POINT_BITS,
            amount_raw: BigUint::from(1_000u32) << FIXED_POINT_BITS,
            amount_scaled: BigUint::from(10u32).pow(21),
            adjusted_tick: 10,
            tick_clamped: false,
            liquidity: LiquiditySample::Placeholder,
        };
        assert_eq!(trade.amount_raw_whole(), BigUint::from(1_000u32));

        let report = DecisionReport::new(&event(), &RebalanceDecision::Trade(trade));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["parity"], false);
        assert_eq!(json["token_to_sell"], "token1");
        assert_eq!(json["amount_scaled"], "1000000000000000000000");
        assert_eq!(json["adjusted_tick"], 10);
        assert_eq!(json["placeholder_liquidity"], true);
        assert_eq!(json["fixed_point_bits"], 96);
    }
}
