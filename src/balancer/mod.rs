//! Price reconciliation between the main and the target pool.

pub mod engine;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{RebalanceEngine, resolve_trading_pair, scale_to_base_units, sqrt_delta};
pub use worker::{DecisionOutcome, PairHandle, PairWorker, spawn_pair_worker};
