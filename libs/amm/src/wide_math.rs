//! 256-bit intermediate arithmetic for u128 token amounts
//!
//! Reserves and rates are bounded to 112 bits, so products such as
//! `reserve × reserve` or `amount × scaling_factor` need a wider
//! intermediate before the final division narrows them back.

use crate::error::{AmmError, AmmResult};
use ethers_core::types::U256;

/// Fee points denominator (100,000 FP = 100%)
pub const FEE_DENOMINATOR_FP: u128 = 100_000;

/// 18-decimal fixed point one
pub const ONE_E18: u128 = 1_000_000_000_000_000_000;

/// Largest value representable in 112 bits (principal, proceeds, rates)
pub const MAX_U112: u128 = (1u128 << 112) - 1;

/// Largest value representable in 96 bits (fee counters)
pub const MAX_U96: u128 = (1u128 << 96) - 1;

/// Narrow a 256-bit value back to u128, failing on overflow
#[inline]
pub fn narrow(value: U256, context: &'static str) -> AmmResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(AmmError::Overflow { context });
    }
    Ok(value.as_u128())
}

/// `⌊a × b / denominator⌋` with a 256-bit intermediate
pub fn mul_div(a: u128, b: u128, denominator: u128, context: &'static str) -> AmmResult<u128> {
    if denominator == 0 {
        return Err(AmmError::DivisionByZero { context });
    }
    let product = U256::from(a) * U256::from(b);
    narrow(product / U256::from(denominator), context)
}

/// `⌈a × b / denominator⌉` with a 256-bit intermediate
pub fn mul_div_up(a: u128, b: u128, denominator: u128, context: &'static str) -> AmmResult<u128> {
    if denominator == 0 {
        return Err(AmmError::DivisionByZero { context });
    }
    let product = U256::from(a) * U256::from(b);
    let denominator = U256::from(denominator);
    let (quotient, remainder) = product.div_mod(denominator);
    let rounded = if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::one()
    };
    narrow(rounded, context)
}

/// Low 128 bits of `⌊a × b / denominator⌋`
///
/// Used only for the proceeds accumulator, which is defined modulo 2^128.
pub fn wrapping_mul_div(
    a: u128,
    b: u128,
    denominator: u128,
    context: &'static str,
) -> AmmResult<u128> {
    if denominator == 0 {
        return Err(AmmError::DivisionByZero { context });
    }
    let product = U256::from(a) * U256::from(b);
    Ok((product / U256::from(denominator)).low_u128())
}

/// Fee owed on `amount` at `fee_fp` fee points, rounded up in favour of the pool
pub fn fee_rounded_up(amount: u128, fee_fp: u128) -> AmmResult<u128> {
    if fee_fp > FEE_DENOMINATOR_FP {
        return Err(AmmError::InvalidFee { fee_fp });
    }
    mul_div_up(amount, fee_fp, FEE_DENOMINATOR_FP, "fee")
}

/// `⌊√(a × b)⌋`, always fits in u128
pub fn sqrt_product(a: u128, b: u128) -> u128 {
    (U256::from(a) * U256::from(b)).integer_sqrt().low_u128()
}

/// `10^exponent` as u128, failing past 10^38
pub fn pow10(exponent: u32) -> AmmResult<u128> {
    10u128
        .checked_pow(exponent)
        .ok_or(AmmError::Overflow { context: "pow10" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_uses_wide_intermediate() {
        let a = MAX_U112;
        let b = MAX_U112;
        // a * b overflows u128 but the quotient fits
        let result = mul_div(a, b, MAX_U112, "test").unwrap();
        assert_eq!(result, MAX_U112);
    }

    #[test]
    fn test_mul_div_up_rounds_only_with_remainder() {
        assert_eq!(mul_div_up(10, 3, 5, "test").unwrap(), 6);
        assert_eq!(mul_div_up(10, 3, 4, "test").unwrap(), 8); // 7.5 -> 8
        assert_eq!(mul_div(10, 3, 4, "test").unwrap(), 7);
    }

    #[test]
    fn test_fee_rounds_up() {
        // 1 unit at 0.3% still pays one unit of fee
        assert_eq!(fee_rounded_up(1, 300).unwrap(), 1);
        assert_eq!(fee_rounded_up(100_000, 300).unwrap(), 300);
        assert_eq!(fee_rounded_up(0, 300).unwrap(), 0);
        assert!(fee_rounded_up(1, FEE_DENOMINATOR_FP + 1).is_err());
    }

    #[test]
    fn test_narrow_rejects_overflow() {
        let result = mul_div(u128::MAX, 2, 1, "test");
        assert!(matches!(result, Err(AmmError::Overflow { .. })));
    }

    #[test]
    fn test_wrapping_mul_div_keeps_low_bits() {
        let wrapped = wrapping_mul_div(u128::MAX, 2, 1, "test").unwrap();
        assert_eq!(wrapped, u128::MAX - 1);
    }

    #[test]
    fn test_sqrt_product() {
        assert_eq!(sqrt_product(4, 9), 6);
        assert_eq!(sqrt_product(MAX_U112, MAX_U112), MAX_U112);
        assert_eq!(sqrt_product(2, 1), 1);
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            mul_div(1, 1, 0, "test"),
            Err(AmmError::DivisionByZero { .. })
        ));
    }
}
