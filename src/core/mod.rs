//! Core building blocks
//!
//! The generic object pool and the registry configuration

mod config;
mod pool;

pub use config::{ConfigError, RegistryConfig};
pub use pool::{Pool, PoolStats};
