//! Aggregate order pool state per direction
//!
//! Each direction keeps its current aggregate sales rate, a cumulative
//! proceeds-per-unit-rate accumulator and the table of sales rate that expires
//! at each interval boundary. The accumulator lives in `u128` and is allowed to
//! wrap: only differences between two readings are meaningful, and those are
//! computed modulo 2^128.

use crate::error::PoolResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use twamm_amm::wide_math::{mul_div, wrapping_mul_div};

/// Cumulative proceeds per unit of sales rate, scaled and wrapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProceedsAccumulator(u128);

impl ProceedsAccumulator {
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Credit `amount_out` bought by a pool selling at `sales_rate`
    ///
    /// The increment `amount_out × scale / sales_rate` is truncated to 128 bits
    /// before the wrapping add; no-op when the pool was idle.
    pub fn advance(self, amount_out: u128, scale: u128, sales_rate: u128) -> PoolResult<Self> {
        if sales_rate == 0 {
            return Ok(self);
        }
        let increment = wrapping_mul_div(amount_out, scale, sales_rate, "proceeds increment")?;
        Ok(Self(self.0.wrapping_add(increment)))
    }

    /// Distance from an earlier reading, modulo 2^128
    #[inline]
    pub fn distance_since(self, earlier: Self) -> u128 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Proceeds earned since `checkpoint` by an order selling at `sales_rate`
    pub fn proceeds_since(self, checkpoint: Self, sales_rate: u128, scale: u128) -> PoolResult<u128> {
        let distance = self.distance_since(checkpoint);
        if distance == 0 || sales_rate == 0 {
            return Ok(0);
        }
        Ok(mul_div(distance, sales_rate, scale, "order proceeds")?)
    }
}

/// Per-direction aggregate state, indexed by sold token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPools {
    pub current_sales_rate: [u128; 2],
    pub cumulative_proceeds: [ProceedsAccumulator; 2],
    /// Sales rate leaving each pool at a boundary block
    pub sales_rate_expiring: BTreeMap<u64, [u128; 2]>,
}

impl OrderPools {
    pub fn expiring_at(&self, block: u64) -> [u128; 2] {
        self.sales_rate_expiring
            .get(&block)
            .copied()
            .unwrap_or_default()
    }
}
