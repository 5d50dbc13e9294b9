//! # TWAMM AMM Library - Integer Pool Mathematics
//!
//! ## Purpose
//!
//! Pure, allocation-free math used by the TWAMM pool engine: constant product
//! swaps for atomic trades, the per-step aggregate virtual trade (one-sided or
//! concurrent two-sided) for long-term orders, and the protocol / LP / platform
//! fee split. Amounts are raw token units in `u128`; products that can exceed
//! 128 bits are carried through a 256-bit intermediate.
//!
//! ## Integration Points
//!
//! - **Callers**: the pool engine's virtual order executor and swap entry points
//! - **Precision**: integer arithmetic only, every rounding direction is explicit
//! - **Fees**: fee points out of 100,000; protocol fraction in 18-decimal fixed point
//!
//! ## Architecture Role
//!
//! ```text
//! Order pools (rates) ─┐
//!                      ├─→ [VirtualTrade] ─→ reserves', outputs, gross fees ─→ [FeeSplitter]
//! Reserves ────────────┘                                                          │
//! Swap request ──────────→ [ConstantProduct] ─→ quote ─→ gross fee ───────────────┘
//! ```

pub mod constant_product;
pub mod error;
pub mod fee_split;
pub mod virtual_trade;
pub mod wide_math;

pub use constant_product::{ConstantProduct, CpPoolState, SwapQuote};
pub use error::{AmmError, AmmResult};
pub use fee_split::{FeeShares, FeeSplitter, MAX_PLATFORM_FEE_SHIFT};
pub use virtual_trade::{IntervalInput, IntervalTrade, VirtualTrade};
pub use wide_math::{FEE_DENOMINATOR_FP, MAX_U112, MAX_U96, ONE_E18};

/// Common types for price reporting
pub use rust_decimal::Decimal;
