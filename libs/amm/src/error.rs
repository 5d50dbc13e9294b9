//! Error types for AMM arithmetic
//!
//! Every variant maps to a stable numeric code so callers further up the
//! stack can surface machine-checkable failures.

use thiserror::Error;

/// Failures of the pure AMM math layer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    /// Intermediate or final value does not fit the target width
    #[error("Arithmetic overflow in {context}")]
    Overflow { context: &'static str },

    /// Division by a zero denominator
    #[error("Division by zero in {context}")]
    DivisionByZero { context: &'static str },

    /// Output would drain (or exceed) the available reserve
    #[error("Insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: u128, available: u128 },

    /// Fee points outside 0..=FEE_DENOMINATOR_FP
    #[error("Fee of {fee_fp} fee points exceeds denominator")]
    InvalidFee { fee_fp: u128 },

    /// Protocol fee fraction above 1.0 (1e18)
    #[error("Protocol fee fraction {fraction} exceeds 1e18")]
    InvalidProtocolFee { fraction: u128 },

    /// Platform fee shift outside 0..=4
    #[error("Platform fee shift {shift} outside 0..=4")]
    InvalidFeeShift { shift: u8 },
}

impl AmmError {
    /// Stable numeric code for this failure
    pub fn code(&self) -> u16 {
        match self {
            AmmError::Overflow { .. } => 401,
            AmmError::DivisionByZero { .. } => 402,
            AmmError::InsufficientLiquidity { .. } => 403,
            AmmError::InvalidFee { .. } => 404,
            AmmError::InvalidProtocolFee { .. } => 405,
            AmmError::InvalidFeeShift { .. } => 406,
        }
    }
}

pub type AmmResult<T> = Result<T, AmmError>;
