use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Provider error: {0}")]
    Provider(#[from] ethers::providers::ProviderError),

    #[error("Serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Rebalance error: {0}")]
    Rebalance(#[from] RebalanceError),

    /// The main-pool swap subscription failed or ended.
    #[error("Swap feed error: {0}")]
    Feed(String),
}

/// Failures that abort a single rebalance decision.
///
/// None of these stop the process. The worker hands them to the decision
/// consumer, which picks the retry or alerting policy.
#[derive(Debug, Error)]
pub enum RebalanceError {
    #[error("Invalid sqrtPriceX96 {value}: {reason}")]
    InvalidSqrtPrice { value: String, reason: &'static str },

    #[error("Invalid tick spacing {spacing}: must be a positive integer")]
    InvalidSpacing { spacing: i32 },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("{collaborator} unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        message: String,
    },
}

impl RebalanceError {
    pub fn unavailable(collaborator: &'static str, err: impl std::fmt::Display) -> Self {
        Self::CollaboratorUnavailable {
            collaborator,
            message: err.to_string(),
        }
    }

    /// Only collaborator failures are worth retrying; everything else will
    /// fail the same way on the same input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::CollaboratorUnavailable { .. })
    }
}
