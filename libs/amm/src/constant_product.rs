//! Constant product (x*y=k) swap math on integer token amounts
//!
//! Fees are charged on the input side in fee points (100,000 FP = 100%) and
//! rounded up so the pool never under-collects.

use crate::error::{AmmError, AmmResult};
use crate::wide_math::{fee_rounded_up, mul_div};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reserves on either side of a directional swap plus the fee tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpPoolState {
    pub reserve_in: u128,
    pub reserve_out: u128,
    pub fee_fp: u128,
}

/// Breakdown of an atomic swap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub amount_in: u128,
    /// Gross fee taken from `amount_in` (before splitting)
    pub fee: u128,
    pub net_in: u128,
    pub amount_out: u128,
}

/// Constant product math functions
pub struct ConstantProduct;

impl ConstantProduct {
    /// `reserve_out × net_in / (reserve_in + net_in)`, rounded down
    pub fn output_amount(net_in: u128, reserve_in: u128, reserve_out: u128) -> AmmResult<u128> {
        if net_in == 0 {
            return Ok(0);
        }
        let denominator = reserve_in
            .checked_add(net_in)
            .ok_or(AmmError::Overflow {
                context: "constant product denominator",
            })?;
        mul_div(reserve_out, net_in, denominator, "constant product output")
    }

    /// Quote an atomic swap against the given reserves
    pub fn quote(amount_in: u128, pool: &CpPoolState) -> AmmResult<SwapQuote> {
        if pool.reserve_in == 0 || pool.reserve_out == 0 {
            return Err(AmmError::InsufficientLiquidity {
                requested: amount_in,
                available: 0,
            });
        }

        let fee = fee_rounded_up(amount_in, pool.fee_fp)?;
        let net_in = amount_in - fee;
        let amount_out = Self::output_amount(net_in, pool.reserve_in, pool.reserve_out)?;

        if amount_out >= pool.reserve_out {
            return Err(AmmError::InsufficientLiquidity {
                requested: amount_out,
                available: pool.reserve_out,
            });
        }

        Ok(SwapQuote {
            amount_in,
            fee,
            net_in,
            amount_out,
        })
    }

    /// Spot price of token0 denominated in token1, in whole-token units
    ///
    /// Display only; returns `None` when a reserve is zero or does not fit a Decimal.
    pub fn spot_price(
        reserve0: u128,
        reserve1: u128,
        decimals0: u8,
        decimals1: u8,
    ) -> Option<Decimal> {
        if reserve0 == 0 {
            return None;
        }
        let r0 = Decimal::try_from_i128_with_scale(i128::try_from(reserve0).ok()?, decimals0 as u32)
            .ok()?;
        let r1 = Decimal::try_from_i128_with_scale(i128::try_from(reserve1).ok()?, decimals1 as u32)
            .ok()?;
        r1.checked_div(r0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_output_calculation() {
        // 100 in against 1000:2000 with no fee -> 2000*100/1100 = 181
        let out = ConstantProduct::output_amount(100, 1000, 2000).unwrap();
        assert_eq!(out, 181);
    }

    #[test]
    fn test_quote_charges_fee_on_input() {
        let pool = CpPoolState {
            reserve_in: 1_000_000,
            reserve_out: 2_000_000,
            fee_fp: 300,
        };
        let quote = ConstantProduct::quote(10_000, &pool).unwrap();
        assert_eq!(quote.fee, 30);
        assert_eq!(quote.net_in, 9_970);
        assert_eq!(
            quote.amount_out,
            2_000_000u128 * 9_970 / (1_000_000 + 9_970)
        );
    }

    #[test]
    fn test_quote_rejects_empty_pool() {
        let pool = CpPoolState {
            reserve_in: 0,
            reserve_out: 10,
            fee_fp: 0,
        };
        assert!(matches!(
            ConstantProduct::quote(1, &pool),
            Err(AmmError::InsufficientLiquidity { .. })
        ));
    }

    #[test]
    fn test_spot_price_respects_decimals() {
        // 1 WETH (18 dec) : 2000 USDC (6 dec)
        let price =
            ConstantProduct::spot_price(1_000_000_000_000_000_000, 2_000_000_000, 18, 6).unwrap();
        assert_eq!(price, dec!(2000));
        assert!(ConstantProduct::spot_price(0, 1, 18, 6).is_none());
    }
}
