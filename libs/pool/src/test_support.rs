//! Shared fixtures for unit tests

use crate::params::EngineParams;
use twamm_config::{PoolParams, PoolType};

/// Fee-free parameters with the given order block interval
pub fn pool_params(order_block_interval: u64) -> PoolParams {
    PoolParams {
        pool_type: PoolType::Liquid,
        order_block_interval,
        max_order_intervals: 100,
        short_term_fee_fp: 0,
        partner_fee_fp: 0,
        long_term_fee_fp: 0,
        protocol_fee_e18: 0,
        platform_fee_shift: 0,
        platform_fee_address: None,
        admin_address: None,
        token_decimals: [18, 18],
    }
}

pub fn engine_params(order_block_interval: u64) -> EngineParams {
    EngineParams::new(pool_params(order_block_interval)).unwrap()
}
