//! # TWAMM Pool Engine
//!
//! ## Purpose
//!
//! Accounting and execution engine of a two-token TWAMM pool: long-term
//! orders sell at a constant rate over many blocks and are settled lazily,
//! interval by interval, against a constant product curve. Atomic swaps,
//! liquidity joins and exits, and order lifecycle operations all share one
//! state machine that keeps reserves, order principal, proceeds and fees in
//! balance with the custodian's token holdings.
//!
//! ## Integration Points
//!
//! - **Host**: a custodian implementing [`Host`] supplies balances, block
//!   number, LP share supply and partner status; outcomes describe transfers
//! - **User data**: [`calldata`] decodes the tagged binary operation blobs
//! - **Math**: `twamm-amm` for curve, virtual trade and fee split arithmetic
//! - **Configuration**: `twamm-config` presets and validated [`PoolParams`]
//!
//! ## Architecture Role
//!
//! ```text
//! Host callback ─→ [TwammPool] ─→ LedgerBatch ─→ [VirtualOrderExecutor] ─→ replayed batch
//!                       │                                                       │
//!                       └──────────→ [OrderBook] / swap / join / exit ←─────────┘
//!                                              │
//!                                   conservation check ─→ commit ─→ outcome to host
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use twamm_config::{PoolConfig, PoolType, TokenConfig};
//! use twamm_pool::{Direction, JoinKind, Simulation, TwammPool};
//!
//! let config = PoolConfig::new(
//!     PoolType::Liquid,
//!     TokenConfig { symbol: "WETH".into(), decimals: 18 },
//!     TokenConfig { symbol: "USDC".into(), decimals: 6 },
//! );
//! let pool = TwammPool::from_config(&config, 0).unwrap();
//! let mut sim = Simulation::new(pool, 0);
//! let lp = [1u8; 20];
//! sim.vault.mint(lp, [1_000_000, 1_000_000]).unwrap();
//! sim.join(lp, [1_000_000, 1_000_000], JoinKind::Join).unwrap();
//!
//! let trader = [2u8; 20];
//! sim.vault.mint(trader, [90_000, 0]).unwrap();
//! let order = sim
//!     .long_term_swap(trader, Direction::ZeroToOne, 90_000, 2, None)
//!     .unwrap()
//!     .order
//!     .unwrap();
//! sim.advance_blocks(300);
//! let amounts = sim.order_amounts(order.order_id).unwrap();
//! assert!(amounts.proceeds > 0);
//! ```

pub mod calldata;
pub mod error;
pub mod executor;
pub mod guard;
pub mod host;
pub mod ledger;
pub mod liabilities;
pub mod lifecycle;
pub mod operations;
pub mod order;
pub mod order_pools;
pub mod params;
pub mod pool;
pub mod sim;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::{ErrorCategory, PoolError, PoolResult};
pub use executor::{ReplayReport, VirtualOrderExecutor};
pub use guard::{LockGuard, ReentrancyLock};
pub use host::{Custodian, Host, PartnerRegistry, ShareLedger};
pub use ledger::VirtualOrders;
pub use liabilities::Liabilities;
pub use lifecycle::{ExtendedOrder, IssuedOrder, OrderAmounts, OrderBook, OrderSettlement};
pub use operations::{
    ExitKind, ExitOutcome, ExitRequest, JoinKind, JoinOutcome, JoinRequest, SwapKind, SwapOutcome,
    SwapRequest,
};
pub use order::Order;
pub use order_pools::{OrderPools, ProceedsAccumulator};
pub use params::EngineParams;
pub use pool::{TwammPool, VirtualSnapshot, MINIMUM_LIQUIDITY};
pub use sim::{SimError, SimResult, SimVault, Simulation};
pub use types::{Address, Direction, NULL_ADDRESS};

pub use twamm_config::PoolParams;
