//! Shared primitive types for the pool engine

use crate::error::{PoolError, PoolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use twamm_amm::{MAX_U112, MAX_U96};

/// 20-byte account identifier
pub type Address = [u8; 20];

/// Sentinel owner of cleared orders; also holds the permanently locked shares
pub const NULL_ADDRESS: Address = [0u8; 20];

/// Hex rendering of an address for logs
pub fn short_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Trade direction of a long-term order (or of an atomic swap)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sells token0, buys token1
    ZeroToOne,
    /// Sells token1, buys token0
    OneToZero,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::ZeroToOne, Direction::OneToZero];

    /// Index of the token sold, which also indexes the order pool
    #[inline]
    pub fn sell_token(self) -> usize {
        match self {
            Direction::ZeroToOne => 0,
            Direction::OneToZero => 1,
        }
    }

    /// Index of the token bought
    #[inline]
    pub fn buy_token(self) -> usize {
        1 - self.sell_token()
    }

    /// Direction selling the given token
    pub fn selling(token: usize) -> Self {
        if token == 0 {
            Direction::ZeroToOne
        } else {
            Direction::OneToZero
        }
    }

    pub fn opposite(self) -> Self {
        Direction::selling(self.buy_token())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ZeroToOne => write!(f, "0->1"),
            Direction::OneToZero => write!(f, "1->0"),
        }
    }
}

/// Reject values that do not fit the 112-bit amount range
#[inline]
pub fn ensure_u112(value: u128, what: &'static str) -> PoolResult<u128> {
    if value > MAX_U112 {
        return Err(PoolError::AmountOutOfRange {
            what,
            value,
            bits: 112,
        });
    }
    Ok(value)
}

/// Reject values that do not fit the 96-bit fee counter range
#[inline]
pub fn ensure_u96(value: u128, what: &'static str) -> PoolResult<u128> {
    if value > MAX_U96 {
        return Err(PoolError::AmountOutOfRange {
            what,
            value,
            bits: 96,
        });
    }
    Ok(value)
}

/// First interval boundary at or after `block`
#[inline]
pub fn boundary_at_or_after(block: u64, interval: u64) -> u64 {
    match block % interval {
        0 => block,
        rem => block + (interval - rem),
    }
}
