//! Three-way fee splitting between protocol, liquidity providers and platform
//!
//! The protocol fraction is an 18-decimal fixed-point number. The platform fee is
//! expressed as a shift `s`: when enabled, whatever the protocol does not take is
//! divided into `1 + 2^s` parts, one for the platform and `2^s` for LPs.
//! All divisions round down and the remainder lands in the protocol share.

use crate::error::{AmmError, AmmResult};
use crate::wide_math::{mul_div, ONE_E18};
use serde::{Deserialize, Serialize};

/// Largest supported platform fee shift (LPs get 16x the platform share)
pub const MAX_PLATFORM_FEE_SHIFT: u8 = 4;

/// Result of splitting one gross fee amount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeShares {
    pub protocol: u128,
    pub lp: u128,
    pub platform: u128,
}

impl FeeShares {
    pub fn total(&self) -> u128 {
        self.protocol + self.lp + self.platform
    }
}

/// Fee split parameters for one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplitter {
    protocol_fee_e18: u128,
    platform_fee_shift: u8,
}

impl FeeSplitter {
    pub fn new(protocol_fee_e18: u128, platform_fee_shift: u8) -> AmmResult<Self> {
        if protocol_fee_e18 > ONE_E18 {
            return Err(AmmError::InvalidProtocolFee {
                fraction: protocol_fee_e18,
            });
        }
        if platform_fee_shift > MAX_PLATFORM_FEE_SHIFT {
            return Err(AmmError::InvalidFeeShift {
                shift: platform_fee_shift,
            });
        }
        Ok(Self {
            protocol_fee_e18,
            platform_fee_shift,
        })
    }

    pub fn protocol_fee_e18(&self) -> u128 {
        self.protocol_fee_e18
    }

    pub fn platform_fee_shift(&self) -> u8 {
        self.platform_fee_shift
    }

    pub fn platform_fee_enabled(&self) -> bool {
        self.platform_fee_shift != 0
    }

    /// Split a gross fee
    pub fn split(&self, gross: u128) -> AmmResult<FeeShares> {
        if gross == 0 {
            return Ok(FeeShares::default());
        }

        let non_protocol_e18 = ONE_E18 - self.protocol_fee_e18;

        if !self.platform_fee_enabled() {
            if self.protocol_fee_e18 == 0 {
                return Ok(FeeShares {
                    protocol: 0,
                    lp: gross,
                    platform: 0,
                });
            }
            let lp = mul_div(gross, non_protocol_e18, ONE_E18, "fee split")?;
            return Ok(FeeShares {
                protocol: gross - lp,
                lp,
                platform: 0,
            });
        }

        let lp_multiple = 1u128 << self.platform_fee_shift;
        let parts = 1 + lp_multiple;
        let platform = mul_div(gross, non_protocol_e18, ONE_E18 * parts, "fee split")?;
        let lp = platform * lp_multiple;

        Ok(FeeShares {
            protocol: gross - lp - platform,
            lp,
            platform,
        })
    }
}

impl Default for FeeSplitter {
    fn default() -> Self {
        Self {
            protocol_fee_e18: 0,
            platform_fee_shift: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HALF: u128 = ONE_E18 / 2;

    #[test]
    fn test_everything_to_lp_when_no_protocol_or_platform() {
        let splitter = FeeSplitter::default();
        let shares = splitter.split(12_345).unwrap();
        assert_eq!(shares.lp, 12_345);
        assert_eq!(shares.protocol, 0);
        assert_eq!(shares.platform, 0);
    }

    #[test]
    fn test_protocol_only() {
        let splitter = FeeSplitter::new(HALF, 0).unwrap();
        let shares = splitter.split(1001).unwrap();
        // LP rounds down, protocol picks up the odd unit
        assert_eq!(shares.lp, 500);
        assert_eq!(shares.protocol, 501);
        assert_eq!(shares.platform, 0);
    }

    #[test]
    fn test_platform_enabled_shift_two() {
        // protocol 50%, remaining 50% split 1:4 platform:LP
        let splitter = FeeSplitter::new(HALF, 2).unwrap();
        let shares = splitter.split(1000).unwrap();
        assert_eq!(shares.platform, 100);
        assert_eq!(shares.lp, 400);
        assert_eq!(shares.protocol, 500);
    }

    #[test]
    fn test_platform_enabled_without_protocol_fee() {
        let splitter = FeeSplitter::new(0, 1).unwrap();
        let shares = splitter.split(10).unwrap();
        // 10 / 3 = 3 platform, 6 LP, remainder 1 to protocol
        assert_eq!(shares.platform, 3);
        assert_eq!(shares.lp, 6);
        assert_eq!(shares.protocol, 1);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(
            FeeSplitter::new(ONE_E18 + 1, 0),
            Err(AmmError::InvalidProtocolFee { .. })
        ));
        assert!(matches!(
            FeeSplitter::new(0, 5),
            Err(AmmError::InvalidFeeShift { shift: 5 })
        ));
    }

    #[test]
    fn test_full_protocol_fee() {
        let splitter = FeeSplitter::new(ONE_E18, 3).unwrap();
        let shares = splitter.split(999).unwrap();
        assert_eq!(shares.protocol, 999);
        assert_eq!(shares.lp + shares.platform, 0);
    }

    proptest! {
        #[test]
        fn prop_split_conserves_gross(
            gross in 0u128..(1u128 << 96),
            protocol in 0u128..=ONE_E18,
            shift in 0u8..=MAX_PLATFORM_FEE_SHIFT,
        ) {
            let splitter = FeeSplitter::new(protocol, shift).unwrap();
            let shares = splitter.split(gross).unwrap();
            prop_assert_eq!(shares.total(), gross);
            if shift > 0 {
                prop_assert_eq!(shares.lp, shares.platform << shift);
            } else {
                prop_assert_eq!(shares.platform, 0);
            }
        }
    }
}
