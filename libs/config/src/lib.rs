//! # TWAMM Pool Configuration
//!
//! Centralized pool presets and configuration loading for TWAMM pools.
//!
//! ## Features
//!
//! - **Presets**: order block interval, max order length and fee tiers per pool type
//! - **Limits**: hard bounds on fees, token decimals, interval length and order length
//! - **Loading**: TOML files with `TWAMM__`-prefixed environment overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use twamm_config::{presets, PoolConfig};
//!
//! let interval = presets::liquid::ORDER_BLOCK_INTERVAL;
//! let params = PoolConfig::load(Path::new("config/pool.toml"))
//!     .unwrap()
//!     .resolve()
//!     .unwrap();
//! assert!(params.order_block_interval > 0 || interval > 0);
//! ```

pub mod pool_config;
pub mod presets;

// Re-export commonly used types
pub use pool_config::{parse_address, ConfigError, PoolConfig, PoolParams, TokenConfig};
pub use presets::{PoolType, Preset};
