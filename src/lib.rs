//! Core library for the price-balancer project.
//!
//! Watches a main Uniswap V3 pool and decides the trade that would bring a
//! target pool back to the same price. Execution is left to the caller.

pub mod balancer;
pub mod config;
pub mod dex;
pub mod errors;
pub mod models;
pub mod utils;
