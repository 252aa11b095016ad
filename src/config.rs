//! Configuration loader and application settings.

use crate::errors::{AppError, Result};
use ethers::types::Address;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_EVENT_BUFFER: usize = 64;

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP(S) RPC endpoint used for pool state reads.
    pub rpc_url: String,
    /// WebSocket endpoint used for the `Swap` log subscription.
    pub ws_url: String,
    /// Reference pool whose price the target follows.
    pub main_pool: Address,
    /// Pool being brought back into parity.
    pub target_pool: Address,
    /// Upper bound on each collaborator read; zero disables it.
    pub read_timeout: Duration,
    /// Capacity of the event and outcome channels.
    pub event_buffer: usize,
}

impl AppConfig {
    /// Load configuration from environment variables (after `.env`).
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Config(format!("Set {key} env var")))
        };

        let rpc_url = required("RPC_URL")?;
        check_scheme("RPC_URL", &rpc_url, &["http", "https"])?;
        let ws_url = required("WS_URL")?;
        check_scheme("WS_URL", &ws_url, &["ws", "wss"])?;

        let main_pool = parse_address("MAIN_POOL_ADDRESS", &required("MAIN_POOL_ADDRESS")?)?;
        let target_pool = parse_address("TARGET_POOL_ADDRESS", &required("TARGET_POOL_ADDRESS")?)?;
        if main_pool == target_pool {
            return Err(AppError::Config(
                "MAIN_POOL_ADDRESS and TARGET_POOL_ADDRESS must differ".into(),
            ));
        }

        let read_timeout_ms: u64 = parse_or(
            "READ_TIMEOUT_MS",
            lookup("READ_TIMEOUT_MS"),
            DEFAULT_READ_TIMEOUT_MS,
        )?;
        let event_buffer: usize =
            parse_or("EVENT_BUFFER", lookup("EVENT_BUFFER"), DEFAULT_EVENT_BUFFER)?;
        if event_buffer == 0 {
            return Err(AppError::Config("EVENT_BUFFER must be greater than zero".into()));
        }

        Ok(Self {
            rpc_url,
            ws_url,
            main_pool,
            target_pool,
            read_timeout: Duration::from_millis(read_timeout_ms),
            event_buffer,
        })
    }
}

fn check_scheme(key: &str, raw: &str, allowed: &[&str]) -> Result<()> {
    let url = Url::parse(raw)?;
    if allowed.contains(&url.scheme()) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "{key} must use one of {allowed:?}, got {}",
            url.scheme()
        )))
    }
}

fn parse_address(key: &str, raw: &str) -> Result<Address> {
    Address::from_str(raw).map_err(|e| AppError::Config(format!("{key} is not an address: {e}")))
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}"))),
    }
}
