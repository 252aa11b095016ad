//! Uniswap V3 pool math and chain access.

pub mod calc;
pub mod client;
pub mod events;
pub mod state;
pub mod tick;

pub use calc::{FIXED_POINT_BITS, Price, big_sqrt, price_from_sqrt_x96};
pub use client::PoolClient;
pub use events::spawn_swap_event_watcher;
pub use state::{PoolSnapshot, PoolStateReader, TokenMetadataReader};
pub use tick::{AlignedTick, align_tick};
