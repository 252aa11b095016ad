//! Miscellaneous helper utilities.

use crate::balancer::DecisionOutcome;
use crate::models::DecisionReport;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Logs one decision outcome. Successful decisions are emitted as a JSON
/// report; failures are logged with their kind so retries can be told apart
/// from data problems.
pub fn log_outcome(outcome: &DecisionOutcome) {
    match &outcome.result {
        Ok(decision) => {
            let report = DecisionReport::new(&outcome.event, decision);
            match report.to_json() {
                Ok(json) => info!(report = %json, "[DECISION] rebalance decided"),
                Err(e) => warn!(error = %e, "[DECISION] report serialization failed"),
            }
        }
        Err(e) if e.is_transient() => {
            warn!(
                error = %e,
                block = ?outcome.event.block_number,
                "[DECISION] collaborator failure, event may be retried"
            );
        }
        Err(e) => {
            error!(
                error = %e,
                block = ?outcome.event.block_number,
                sqrt_price_x96 = %outcome.event.sqrt_price_x96,
                tick = outcome.event.tick,
                "[DECISION] decision aborted"
            );
        }
    }
}
