//! Engine parameters derived from validated pool configuration

use crate::error::PoolResult;
use crate::types::Address;
use twamm_amm::wide_math::pow10;
use twamm_amm::FeeSplitter;
use twamm_config::PoolParams;

/// Immutable parameters the engine runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    pool: PoolParams,
    splitter: FeeSplitter,
    scaling_factors: [u128; 2],
}

impl EngineParams {
    pub fn new(pool: PoolParams) -> PoolResult<Self> {
        pool.validate()?;
        let splitter = FeeSplitter::new(pool.protocol_fee_e18, pool.platform_fee_shift)?;
        let scaling_factors = [
            pow10(u32::from(pool.token_decimals[0]) + 1)?,
            pow10(u32::from(pool.token_decimals[1]) + 1)?,
        ];
        Ok(Self {
            pool,
            splitter,
            scaling_factors,
        })
    }

    /// Skips range validation so tests can reach bounds config rejects
    #[cfg(test)]
    pub(crate) fn without_validation(pool: PoolParams) -> Self {
        Self {
            pool,
            splitter: FeeSplitter::default(),
            scaling_factors: [10, 10],
        }
    }

    pub fn pool(&self) -> &PoolParams {
        &self.pool
    }

    pub fn order_block_interval(&self) -> u64 {
        self.pool.order_block_interval
    }

    pub fn max_order_intervals(&self) -> u64 {
        self.pool.max_order_intervals
    }

    pub fn short_term_fee_fp(&self) -> u128 {
        self.pool.short_term_fee_fp
    }

    pub fn partner_fee_fp(&self) -> u128 {
        self.pool.partner_fee_fp
    }

    pub fn long_term_fee_fp(&self) -> u128 {
        self.pool.long_term_fee_fp
    }

    pub fn splitter(&self) -> &FeeSplitter {
        &self.splitter
    }

    /// Proceeds scaling factor of the order pool selling `token`
    pub fn scaling_factor(&self, token: usize) -> u128 {
        self.scaling_factors[token]
    }

    pub fn platform_fee_address(&self) -> Option<Address> {
        self.pool.platform_fee_address
    }

    pub fn admin_address(&self) -> Option<Address> {
        self.pool.admin_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PoolError;
    use twamm_config::{ConfigError, PoolType};

    fn params() -> PoolParams {
        PoolParams {
            pool_type: PoolType::Liquid,
            order_block_interval: 10,
            max_order_intervals: 100,
            short_term_fee_fp: 0,
            partner_fee_fp: 0,
            long_term_fee_fp: 0,
            protocol_fee_e18: 0,
            platform_fee_shift: 0,
            platform_fee_address: None,
            admin_address: None,
            token_decimals: [18, 6],
        }
    }

    #[test]
    fn test_scaling_factors_follow_decimals() {
        let engine = EngineParams::new(params()).unwrap();
        assert_eq!(engine.scaling_factor(0), 10u128.pow(19));
        assert_eq!(engine.scaling_factor(1), 10_000_000);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut bad = params();
        bad.order_block_interval = 0;
        assert_eq!(
            EngineParams::new(bad),
            Err(PoolError::Config(ConfigError::InvalidOrderBlockInterval(0)))
        );
    }
}
