//! Pool Configuration Module
//!
//! Loads pool configuration from TOML files with `TWAMM__`-prefixed environment
//! overrides, applies the pool type preset for unset fields and validates the
//! result into concrete [`PoolParams`].

use crate::presets::{limits, PoolType};
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};
use twamm_amm::{MAX_PLATFORM_FEE_SHIFT, ONE_E18};

/// Configuration errors, rejected at pool creation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Token {token} decimals {decimals} outside supported range 0..={max}")]
    UnsupportedDecimals { token: u8, decimals: u8, max: u8 },

    #[error("{name} of {fee_fp} FP exceeds maximum {max} FP")]
    InvalidFee {
        name: &'static str,
        fee_fp: u128,
        max: u128,
    },

    #[error("Protocol fee fraction {0} must be within [0, 1]")]
    InvalidProtocolFee(String),

    #[error("Platform fee shift {0} must be 0 (disabled) or 1..=4")]
    InvalidPlatformFeeShift(u8),

    #[error("Platform fee enabled without a platform fee address")]
    MissingPlatformFeeAddress,

    #[error("Order block interval {0} must be within 1..={max}", max = limits::MAX_ORDER_BLOCK_INTERVAL)]
    InvalidOrderBlockInterval(u64),

    #[error("Max order intervals {0} must be within 1..={max}", max = limits::MAX_ORDER_INTERVALS)]
    InvalidMaxOrderIntervals(u64),

    #[error("Invalid address '{0}': expected 20 hex-encoded bytes")]
    InvalidAddress(String),
}

impl ConfigError {
    /// Stable numeric code for this failure
    pub fn code(&self) -> u16 {
        match self {
            ConfigError::UnsupportedDecimals { .. } => 101,
            ConfigError::InvalidFee { .. } => 102,
            ConfigError::InvalidProtocolFee(_) => 103,
            ConfigError::InvalidPlatformFeeShift(_) => 104,
            ConfigError::MissingPlatformFeeAddress => 105,
            ConfigError::InvalidOrderBlockInterval(_) => 106,
            ConfigError::InvalidMaxOrderIntervals(_) => 107,
            ConfigError::InvalidAddress(_) => 108,
        }
    }
}

/// Token metadata needed by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub decimals: u8,
}

/// Pool configuration as written in TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub pool_type: PoolType,

    pub token0: TokenConfig,
    pub token1: TokenConfig,

    /// Overrides of the pool type preset
    #[serde(default)]
    pub order_block_interval: Option<u64>,
    #[serde(default)]
    pub max_order_intervals: Option<u64>,
    #[serde(default)]
    pub short_term_fee_fp: Option<u32>,
    #[serde(default)]
    pub partner_fee_fp: Option<u32>,
    #[serde(default)]
    pub long_term_fee_fp: Option<u32>,

    /// Fraction of every fee owed to the custodian protocol, e.g. "0.5"
    #[serde(default)]
    pub protocol_fee: Decimal,

    /// 0 disables the platform fee; 1..=4 gives LPs 2^shift platform shares
    #[serde(default)]
    pub platform_fee_shift: u8,

    /// Hex address receiving platform fees
    #[serde(default)]
    pub platform_fee_address: Option<String>,

    /// Hex address allowed to pause the pool
    #[serde(default)]
    pub admin_address: Option<String>,
}

/// Validated, fully resolved pool parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolParams {
    pub pool_type: PoolType,
    pub order_block_interval: u64,
    pub max_order_intervals: u64,
    pub short_term_fee_fp: u128,
    pub partner_fee_fp: u128,
    pub long_term_fee_fp: u128,
    pub protocol_fee_e18: u128,
    pub platform_fee_shift: u8,
    pub platform_fee_address: Option<[u8; 20]>,
    pub admin_address: Option<[u8; 20]>,
    pub token_decimals: [u8; 2],
}

impl PoolConfig {
    /// Minimal configuration for a pool type with preset values
    pub fn new(pool_type: PoolType, token0: TokenConfig, token1: TokenConfig) -> Self {
        Self {
            pool_type,
            token0,
            token1,
            order_block_interval: None,
            max_order_intervals: None,
            short_term_fee_fp: None,
            partner_fee_fp: None,
            long_term_fee_fp: None,
            protocol_fee: Decimal::ZERO,
            platform_fee_shift: 0,
            platform_fee_address: None,
            admin_address: None,
        }
    }

    /// Load configuration from a TOML file with environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading pool config: {:?}", path);
        let builder = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(
                Environment::with_prefix("TWAMM")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build().context("Failed to build pool configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize pool configuration")
    }

    /// Parse configuration from a TOML string (no environment overrides)
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .context("Failed to parse pool configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize pool configuration")
    }

    /// Save configuration as TOML
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize pool config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write pool config to {:?}", path))?;
        Ok(())
    }

    /// Apply presets and validate into concrete parameters
    pub fn resolve(&self) -> Result<PoolParams, ConfigError> {
        let preset = self.pool_type.preset();

        let params = PoolParams {
            pool_type: self.pool_type,
            order_block_interval: self
                .order_block_interval
                .unwrap_or(preset.order_block_interval),
            max_order_intervals: self
                .max_order_intervals
                .unwrap_or(preset.max_order_intervals),
            short_term_fee_fp: self
                .short_term_fee_fp
                .unwrap_or(preset.short_term_fee_fp)
                .into(),
            partner_fee_fp: self.partner_fee_fp.unwrap_or(preset.partner_fee_fp).into(),
            long_term_fee_fp: self
                .long_term_fee_fp
                .unwrap_or(preset.long_term_fee_fp)
                .into(),
            protocol_fee_e18: protocol_fee_to_e18(self.protocol_fee)?,
            platform_fee_shift: self.platform_fee_shift,
            platform_fee_address: self
                .platform_fee_address
                .as_deref()
                .map(parse_address)
                .transpose()?,
            admin_address: self
                .admin_address
                .as_deref()
                .map(parse_address)
                .transpose()?,
            token_decimals: [self.token0.decimals, self.token1.decimals],
        };

        params.validate()?;
        debug!(
            "Resolved {:?} pool: OBI {} blocks, LT fee {} FP",
            params.pool_type, params.order_block_interval, params.long_term_fee_fp
        );
        Ok(params)
    }
}

impl PoolParams {
    /// Validate parameter ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (token, decimals) in self.token_decimals.iter().enumerate() {
            if *decimals > limits::MAX_TOKEN_DECIMALS {
                return Err(ConfigError::UnsupportedDecimals {
                    token: token as u8,
                    decimals: *decimals,
                    max: limits::MAX_TOKEN_DECIMALS,
                });
            }
        }

        for (name, fee_fp) in [
            ("short_term_fee_fp", self.short_term_fee_fp),
            ("partner_fee_fp", self.partner_fee_fp),
            ("long_term_fee_fp", self.long_term_fee_fp),
        ] {
            if fee_fp > u128::from(limits::MAX_FEE_FP) {
                return Err(ConfigError::InvalidFee {
                    name,
                    fee_fp,
                    max: u128::from(limits::MAX_FEE_FP),
                });
            }
        }

        if self.protocol_fee_e18 > ONE_E18 {
            return Err(ConfigError::InvalidProtocolFee(
                self.protocol_fee_e18.to_string(),
            ));
        }

        if self.platform_fee_shift > MAX_PLATFORM_FEE_SHIFT {
            return Err(ConfigError::InvalidPlatformFeeShift(self.platform_fee_shift));
        }
        if self.platform_fee_shift > 0 && self.platform_fee_address.is_none() {
            return Err(ConfigError::MissingPlatformFeeAddress);
        }

        if self.order_block_interval == 0
            || self.order_block_interval > limits::MAX_ORDER_BLOCK_INTERVAL
        {
            return Err(ConfigError::InvalidOrderBlockInterval(
                self.order_block_interval,
            ));
        }
        if self.max_order_intervals == 0 || self.max_order_intervals > limits::MAX_ORDER_INTERVALS
        {
            return Err(ConfigError::InvalidMaxOrderIntervals(
                self.max_order_intervals,
            ));
        }

        Ok(())
    }
}

fn protocol_fee_to_e18(fraction: Decimal) -> Result<u128, ConfigError> {
    if fraction.is_sign_negative() || fraction > Decimal::ONE {
        return Err(ConfigError::InvalidProtocolFee(fraction.to_string()));
    }
    (fraction * Decimal::from_i128_with_scale(ONE_E18 as i128, 0))
        .trunc()
        .to_u128()
        .ok_or_else(|| ConfigError::InvalidProtocolFee(fraction.to_string()))
}

/// Parse a `0x`-prefixed (or bare) 20-byte hex address
pub fn parse_address(value: &str) -> Result<[u8; 20], ConfigError> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(trimmed).map_err(|_| ConfigError::InvalidAddress(value.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| ConfigError::InvalidAddress(value.to_string()))
}
