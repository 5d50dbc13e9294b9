//! Pool engine errors
//!
//! Failures fall into three categories with stable numeric codes:
//! configuration (1xx, from [`ConfigError`]), caller errors (2xx) that a
//! well-formed request can avoid, and internal-consistency faults (3xx) that
//! indicate corrupted accounting. Arithmetic failures of the math layer keep
//! their own 4xx codes. Any error aborts the whole operation with no state
//! change.

use crate::types::Direction;
use thiserror::Error;
use twamm_amm::AmmError;
use twamm_config::ConfigError;

/// Broad failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Caller,
    Internal,
    Arithmetic,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Sales rate rounds to zero for the deposited amount")]
    SalesRateZero,

    #[error("Order of {requested} intervals exceeds maximum {max}")]
    OrderIntervalsExceeded { requested: u64, max: u64 },

    #[error("Extension funds do not cover a single interval")]
    InsufficientExtensionFunds,

    #[error("Extension supplied the order's buy token")]
    WrongExtensionToken,

    #[error("Extended order length of {intervals} intervals exceeds maximum {max}")]
    ExtensionTooLong { intervals: u64, max: u64 },

    #[error("Sender is not authorized for order {0}")]
    Unauthorized(u64),

    #[error("Sender is not the pool admin")]
    NotAdmin,

    #[error("Sender is not the platform fee address")]
    NotPlatformFeeAddress,

    #[error("Delegates may only send funds to the order owner")]
    DelegateMustPayOwner,

    #[error("Order owner must not be the null address")]
    InvalidOwner,

    #[error("Order {0} is paused")]
    OrderPaused(u64),

    #[error("Order {0} is not paused")]
    OrderNotPaused(u64),

    #[error("Order {0} has expired")]
    OrderExpired(u64),

    #[error("Order {0} has completed and cannot be cancelled")]
    CannotCancelCompletedOrder(u64),

    #[error("No funds available to withdraw")]
    NoFundsAvailable,

    #[error("Order {0} not found")]
    OrderNotFound(u64),

    #[error("Amount must be non-zero")]
    ZeroAmount,

    #[error("{what} of {value} exceeds the {bits}-bit range")]
    AmountOutOfRange {
        what: &'static str,
        value: u128,
        bits: u32,
    },

    #[error("Pool is paused")]
    PoolPaused,

    #[error("Pool has no liquidity")]
    PoolNotInitialized,

    #[error("Initial liquidity must mint more than {minimum} shares")]
    InsufficientInitialLiquidity { minimum: u128 },

    #[error("Output {amount_out} below minimum {min_amount_out}")]
    SlippageExceeded {
        amount_out: u128,
        min_amount_out: u128,
    },

    #[error("Sender is not a registered partner")]
    NotPartner,

    #[error("Cannot burn {requested} shares of {supply} outstanding")]
    InsufficientShares { requested: u128, supply: u128 },

    #[error("Malformed user data: {0}")]
    MalformedUserData(&'static str),

    #[error("Unknown {kind} operation tag {tag}")]
    UnknownOperation { kind: &'static str, tag: u8 },

    #[error("Pool entry point re-entered")]
    Reentrancy,

    #[error("Order of {intervals} intervals from block {block} expires beyond the block range")]
    ExpiryOutOfRange { block: u64, intervals: u64 },

    #[error("Sales rate underflow expiring {direction} orders at block {block}")]
    SalesRateUnderflow { block: u64, direction: Direction },

    #[error("Token {token} balance {balance} below liabilities {liabilities}")]
    InsufficientBalance {
        token: usize,
        balance: u128,
        liabilities: u128,
    },

    #[error("{what} liability underflow for token {token}")]
    LiabilityUnderflow { what: &'static str, token: usize },

    #[error("Missing proceeds snapshot for expiry block {0}")]
    MissingExpirySnapshot(u64),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Math error: {0}")]
    Amm(#[from] AmmError),
}

impl PoolError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PoolError::Config(_) => ErrorCategory::Configuration,
            PoolError::Amm(_) => ErrorCategory::Arithmetic,
            PoolError::SalesRateUnderflow { .. }
            | PoolError::InsufficientBalance { .. }
            | PoolError::LiabilityUnderflow { .. }
            | PoolError::MissingExpirySnapshot(_) => ErrorCategory::Internal,
            _ => ErrorCategory::Caller,
        }
    }

    /// True for faults that indicate broken accounting rather than a bad request
    pub fn is_internal_fault(&self) -> bool {
        self.category() == ErrorCategory::Internal
    }

    /// Stable numeric code for this failure
    pub fn code(&self) -> u16 {
        match self {
            PoolError::SalesRateZero => 201,
            PoolError::OrderIntervalsExceeded { .. } => 202,
            PoolError::InsufficientExtensionFunds => 203,
            PoolError::WrongExtensionToken => 204,
            PoolError::ExtensionTooLong { .. } => 205,
            PoolError::Unauthorized(_) => 206,
            PoolError::NotAdmin => 207,
            PoolError::NotPlatformFeeAddress => 208,
            PoolError::DelegateMustPayOwner => 209,
            PoolError::InvalidOwner => 210,
            PoolError::OrderPaused(_) => 211,
            PoolError::OrderNotPaused(_) => 212,
            PoolError::OrderExpired(_) => 213,
            PoolError::CannotCancelCompletedOrder(_) => 214,
            PoolError::NoFundsAvailable => 215,
            PoolError::OrderNotFound(_) => 216,
            PoolError::ZeroAmount => 217,
            PoolError::AmountOutOfRange { .. } => 218,
            PoolError::PoolPaused => 219,
            PoolError::PoolNotInitialized => 220,
            PoolError::InsufficientInitialLiquidity { .. } => 221,
            PoolError::SlippageExceeded { .. } => 222,
            PoolError::NotPartner => 223,
            PoolError::InsufficientShares { .. } => 224,
            PoolError::MalformedUserData(_) => 225,
            PoolError::UnknownOperation { .. } => 226,
            PoolError::Reentrancy => 227,
            PoolError::ExpiryOutOfRange { .. } => 228,
            PoolError::SalesRateUnderflow { .. } => 301,
            PoolError::InsufficientBalance { .. } => 302,
            PoolError::LiabilityUnderflow { .. } => 303,
            PoolError::MissingExpirySnapshot(_) => 304,
            PoolError::Config(err) => err.code(),
            PoolError::Amm(err) => err.code(),
        }
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
