//! Pool type presets and hard configuration limits
//!
//! Each pool type trades off execution granularity against replay cost: the
//! order block interval (OBI) is the number of blocks between order expiry
//! boundaries, and the maximum interval count bounds order length to roughly
//! the same wall-clock horizon for every type.

use serde::{Deserialize, Serialize};

/// Hard limits enforced on every configuration
pub mod limits {
    /// Highest fee any swap type may charge (1,000 FP = 1%)
    pub const MAX_FEE_FP: u32 = 1_000;

    /// Token decimals supported by the proceeds scaling factor (10^(d+1) must fit u128)
    pub const MAX_TOKEN_DECIMALS: u8 = 22;

    /// Longest allowed order block interval
    pub const MAX_ORDER_BLOCK_INTERVAL: u64 = 100_000;

    /// Longest allowed order, in intervals; keeps every expiry far inside u64
    pub const MAX_ORDER_INTERVALS: u64 = 10_000_000;
}

/// Stable pairs (pegged assets): fine-grained intervals, low fees
pub mod stable {
    pub const ORDER_BLOCK_INTERVAL: u64 = 75;
    pub const MAX_ORDER_INTERVALS: u64 = 176_102;
    pub const SHORT_TERM_FEE_FP: u32 = 10;
    pub const PARTNER_FEE_FP: u32 = 5;
    pub const LONG_TERM_FEE_FP: u32 = 30;
}

/// Liquid pairs (blue chips)
pub mod liquid {
    pub const ORDER_BLOCK_INTERVAL: u64 = 300;
    pub const MAX_ORDER_INTERVALS: u64 = 43_854;
    pub const SHORT_TERM_FEE_FP: u32 = 50;
    pub const PARTNER_FEE_FP: u32 = 25;
    pub const LONG_TERM_FEE_FP: u32 = 150;
}

/// Volatile pairs (long tail)
pub mod volatile {
    pub const ORDER_BLOCK_INTERVAL: u64 = 1_200;
    pub const MAX_ORDER_INTERVALS: u64 = 10_963;
    pub const SHORT_TERM_FEE_FP: u32 = 100;
    pub const PARTNER_FEE_FP: u32 = 50;
    pub const LONG_TERM_FEE_FP: u32 = 300;
}

/// Pool type selecting a preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    Stable,
    Liquid,
    Volatile,
}

/// Concrete preset values for a pool type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub order_block_interval: u64,
    pub max_order_intervals: u64,
    pub short_term_fee_fp: u32,
    pub partner_fee_fp: u32,
    pub long_term_fee_fp: u32,
}

impl PoolType {
    pub fn preset(self) -> Preset {
        match self {
            PoolType::Stable => Preset {
                order_block_interval: stable::ORDER_BLOCK_INTERVAL,
                max_order_intervals: stable::MAX_ORDER_INTERVALS,
                short_term_fee_fp: stable::SHORT_TERM_FEE_FP,
                partner_fee_fp: stable::PARTNER_FEE_FP,
                long_term_fee_fp: stable::LONG_TERM_FEE_FP,
            },
            PoolType::Liquid => Preset {
                order_block_interval: liquid::ORDER_BLOCK_INTERVAL,
                max_order_intervals: liquid::MAX_ORDER_INTERVALS,
                short_term_fee_fp: liquid::SHORT_TERM_FEE_FP,
                partner_fee_fp: liquid::PARTNER_FEE_FP,
                long_term_fee_fp: liquid::LONG_TERM_FEE_FP,
            },
            PoolType::Volatile => Preset {
                order_block_interval: volatile::ORDER_BLOCK_INTERVAL,
                max_order_intervals: volatile::MAX_ORDER_INTERVALS,
                short_term_fee_fp: volatile::SHORT_TERM_FEE_FP,
                partner_fee_fp: volatile::PARTNER_FEE_FP,
                long_term_fee_fp: volatile::LONG_TERM_FEE_FP,
            },
        }
    }
}
