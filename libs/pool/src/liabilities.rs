//! Liability counters and reserve reconciliation
//!
//! The custodian holds one balance per token covering both the AMM reserves
//! and everything the pool owes. Reserves are never stored; they are derived
//! as `balance − orders − proceeds − protocol fees − platform fees`, so every
//! change to a liability moves the reserves implicitly.

use crate::error::{PoolError, PoolResult};
use crate::types::{ensure_u112, ensure_u96};
use serde::{Deserialize, Serialize};

/// Amounts the pool owes, per token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liabilities {
    /// Unsold long-term order principal
    pub orders: [u128; 2],
    /// Proceeds bought for orders and not yet withdrawn
    pub proceeds: [u128; 2],
    /// Protocol fees awaiting collection by the custodian
    pub protocol_fees: [u128; 2],
    /// Platform fees awaiting withdrawal by the platform fee address
    pub platform_fees: [u128; 2],
}

impl Liabilities {
    /// Sum of all liabilities for one token
    pub fn total(&self, token: usize) -> Option<u128> {
        self.orders[token]
            .checked_add(self.proceeds[token])?
            .checked_add(self.protocol_fees[token])?
            .checked_add(self.platform_fees[token])
    }

    /// Derive AMM reserves from custodian balances
    pub fn reconcile(&self, balances: [u128; 2]) -> PoolResult<[u128; 2]> {
        let mut reserves = [0u128; 2];
        for token in 0..2 {
            let owed = self.total(token).ok_or(PoolError::InsufficientBalance {
                token,
                balance: balances[token],
                liabilities: u128::MAX,
            })?;
            reserves[token] =
                balances[token]
                    .checked_sub(owed)
                    .ok_or(PoolError::InsufficientBalance {
                        token,
                        balance: balances[token],
                        liabilities: owed,
                    })?;
        }
        Ok(reserves)
    }

    pub fn add_orders(&mut self, token: usize, amount: u128) -> PoolResult<()> {
        self.orders[token] = ensure_u112(
            self.orders[token].saturating_add(amount),
            "order liabilities",
        )?;
        Ok(())
    }

    pub fn sub_orders(&mut self, token: usize, amount: u128) -> PoolResult<()> {
        self.orders[token] = self.orders[token]
            .checked_sub(amount)
            .ok_or(PoolError::LiabilityUnderflow {
                what: "order",
                token,
            })?;
        Ok(())
    }

    pub fn add_proceeds(&mut self, token: usize, amount: u128) -> PoolResult<()> {
        self.proceeds[token] = ensure_u112(
            self.proceeds[token].saturating_add(amount),
            "proceeds liabilities",
        )?;
        Ok(())
    }

    pub fn sub_proceeds(&mut self, token: usize, amount: u128) -> PoolResult<()> {
        self.proceeds[token] = self.proceeds[token]
            .checked_sub(amount)
            .ok_or(PoolError::LiabilityUnderflow {
                what: "proceeds",
                token,
            })?;
        Ok(())
    }

    pub fn add_protocol_fees(&mut self, token: usize, amount: u128) -> PoolResult<()> {
        self.protocol_fees[token] = ensure_u96(
            self.protocol_fees[token].saturating_add(amount),
            "protocol fee counter",
        )?;
        Ok(())
    }

    pub fn add_platform_fees(&mut self, token: usize, amount: u128) -> PoolResult<()> {
        self.platform_fees[token] = ensure_u96(
            self.platform_fees[token].saturating_add(amount),
            "platform fee counter",
        )?;
        Ok(())
    }

    /// Zero the protocol fee counters, returning what was owed
    pub fn take_protocol_fees(&mut self) -> [u128; 2] {
        std::mem::take(&mut self.protocol_fees)
    }

    /// Zero the platform fee counters, returning what was owed
    pub fn take_platform_fees(&mut self) -> [u128; 2] {
        std::mem::take(&mut self.platform_fees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twamm_amm::{MAX_U112, MAX_U96};

    #[test]
    fn test_reconcile_subtracts_every_liability() {
        let liabilities = Liabilities {
            orders: [100, 0],
            proceeds: [0, 40],
            protocol_fees: [3, 1],
            platform_fees: [2, 0],
        };
        assert_eq!(liabilities.reconcile([1_000, 500]).unwrap(), [895, 459]);
    }

    #[test]
    fn test_reconcile_detects_shortfall() {
        let liabilities = Liabilities {
            orders: [0, 600],
            ..Liabilities::default()
        };
        let err = liabilities.reconcile([1_000, 500]).unwrap_err();
        assert_eq!(
            err,
            PoolError::InsufficientBalance {
                token: 1,
                balance: 500,
                liabilities: 600
            }
        );
        assert!(err.is_internal_fault());
    }

    #[test]
    fn test_counters_respect_ranges() {
        let mut liabilities = Liabilities::default();
        liabilities.add_orders(0, MAX_U112).unwrap();
        assert!(liabilities.add_orders(0, 1).is_err());
        liabilities.add_protocol_fees(1, MAX_U96).unwrap();
        assert!(liabilities.add_protocol_fees(1, 1).is_err());
        assert!(matches!(
            liabilities.sub_proceeds(0, 1),
            Err(PoolError::LiabilityUnderflow { what: "proceeds", .. })
        ));
    }

    #[test]
    fn test_take_fees_zeroes_counters() {
        let mut liabilities = Liabilities::default();
        liabilities.add_protocol_fees(0, 5).unwrap();
        liabilities.add_platform_fees(1, 9).unwrap();
        assert_eq!(liabilities.take_protocol_fees(), [5, 0]);
        assert_eq!(liabilities.take_platform_fees(), [0, 9]);
        assert_eq!(liabilities, Liabilities::default());
    }
}
