//! Aggregate virtual trade for one replay step
//!
//! Every active long-term order of a direction sells at its sales rate, so over
//! `n` blocks the whole order pool sells `rate × n`. When only one direction is
//! active this is an ordinary constant product swap. When both are active the
//! flows are settled with a closed-form approximation of continuous concurrent
//! trading:
//!
//! ```text
//! sum0 = r0 + net0            sum1 = r1 + net1
//! r0'  = r1 × sum0 / sum1     r1'  = r0 × sum1 / sum0
//! out0 = sum0 − r0'           out1 = sum1 − r1'
//! ```
//!
//! `r0' × r1'` equals `r0 × r1` up to integer truncation; this is a first-order
//! approximation of the true continuous curve, and its deviation is the accepted
//! error of the engine.
//!
//! All arrays are indexed by token (0 or 1). `gross_in[0]` is token0 sold by the
//! 0→1 pool; `amount_out[1]` is token1 bought by it.

use crate::constant_product::ConstantProduct;
use crate::error::{AmmError, AmmResult};
use crate::fee_split::{FeeShares, FeeSplitter};
use crate::wide_math::{fee_rounded_up, mul_div};
use serde::{Deserialize, Serialize};

/// Inputs to one replay step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalInput {
    /// AMM reserves at the start of the step
    pub reserves: [u128; 2],
    /// Aggregate sales rates, indexed by sold token
    pub sales_rates: [u128; 2],
    /// Blocks elapsed in this step
    pub blocks: u64,
    /// Long-term swap fee in fee points
    pub long_term_fee_fp: u128,
}

/// Outcome of one replay step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalTrade {
    /// Order principal consumed, per token
    pub gross_in: [u128; 2],
    /// Principal reaching the curve after the long-term fee
    pub net_in: [u128; 2],
    /// Tokens paid out to the opposite order pool, per token
    pub amount_out: [u128; 2],
    /// Fee split per token
    pub fees: [FeeShares; 2],
    /// Reserves after the step, LP fee share included
    pub reserves: [u128; 2],
}

impl IntervalTrade {
    fn idle(reserves: [u128; 2]) -> Self {
        Self {
            reserves,
            ..Self::default()
        }
    }
}

/// Per-step virtual trade engine
pub struct VirtualTrade;

impl VirtualTrade {
    /// Execute the aggregate virtual trade for one step
    pub fn execute_interval(
        input: &IntervalInput,
        splitter: &FeeSplitter,
    ) -> AmmResult<IntervalTrade> {
        let [rate0, rate1] = input.sales_rates;
        if input.blocks == 0 || (rate0 == 0 && rate1 == 0) {
            return Ok(IntervalTrade::idle(input.reserves));
        }

        let blocks = input.blocks as u128;
        let gross_in = [
            rate0.checked_mul(blocks).ok_or(AmmError::Overflow {
                context: "gross token0 in",
            })?,
            rate1.checked_mul(blocks).ok_or(AmmError::Overflow {
                context: "gross token1 in",
            })?,
        ];

        let gross_fee = [
            fee_rounded_up(gross_in[0], input.long_term_fee_fp)?,
            fee_rounded_up(gross_in[1], input.long_term_fee_fp)?,
        ];
        let net_in = [gross_in[0] - gross_fee[0], gross_in[1] - gross_fee[1]];

        let [reserve0, reserve1] = input.reserves;
        let (mut reserves, amount_out) = if rate1 == 0 {
            let out1 = ConstantProduct::output_amount(net_in[0], reserve0, reserve1)?;
            let new_reserve0 = reserve0.checked_add(net_in[0]).ok_or(AmmError::Overflow {
                context: "reserve0 after virtual trade",
            })?;
            ([new_reserve0, reserve1 - out1], [0, out1])
        } else if rate0 == 0 {
            let out0 = ConstantProduct::output_amount(net_in[1], reserve1, reserve0)?;
            let new_reserve1 = reserve1.checked_add(net_in[1]).ok_or(AmmError::Overflow {
                context: "reserve1 after virtual trade",
            })?;
            ([reserve0 - out0, new_reserve1], [out0, 0])
        } else {
            Self::two_sided(reserve0, reserve1, net_in[0], net_in[1])?
        };

        let fees = [splitter.split(gross_fee[0])?, splitter.split(gross_fee[1])?];
        for token in 0..2 {
            reserves[token] = reserves[token]
                .checked_add(fees[token].lp)
                .ok_or(AmmError::Overflow {
                    context: "reserve after LP fee",
                })?;
        }

        Ok(IntervalTrade {
            gross_in,
            net_in,
            amount_out,
            fees,
            reserves,
        })
    }

    /// Concurrent two-sided settlement, returns `(reserves, amount_out)`
    pub fn two_sided(
        reserve0: u128,
        reserve1: u128,
        net0: u128,
        net1: u128,
    ) -> AmmResult<([u128; 2], [u128; 2])> {
        let sum0 = reserve0.checked_add(net0).ok_or(AmmError::Overflow {
            context: "two-sided sum0",
        })?;
        let sum1 = reserve1.checked_add(net1).ok_or(AmmError::Overflow {
            context: "two-sided sum1",
        })?;

        let end0 = mul_div(reserve1, sum0, sum1, "two-sided reserve0")?;
        let end1 = mul_div(reserve0, sum1, sum0, "two-sided reserve1")?;

        Ok(([end0, end1], [sum0 - end0, sum1 - end1]))
    }
}
