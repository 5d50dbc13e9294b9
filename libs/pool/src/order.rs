//! Long-term order record

use crate::error::{PoolError, PoolResult};
use crate::order_pools::ProceedsAccumulator;
use crate::types::{Address, Direction, NULL_ADDRESS};
use serde::{Deserialize, Serialize};

/// A long-term order
///
/// While active and unpaused, the order's unsold principal is implicit:
/// `sales_rate × (expiry_block − block)`. `deposit_remaining` only holds
/// principal set aside by pausing or left over from an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub direction: Direction,
    pub paused: bool,
    /// Principal not scheduled for sale (refundable)
    pub deposit_remaining: u128,
    /// Proceeds banked at pause time, not yet withdrawn
    pub proceeds_accrued: u128,
    /// Sell-token units sold per block
    pub sales_rate: u128,
    /// Accumulator reading at the last settlement
    pub proceeds_checkpoint: ProceedsAccumulator,
    pub owner: Address,
    /// Optional account allowed to act for the owner (NULL_ADDRESS when none)
    pub delegate: Address,
    pub start_block: u64,
    pub expiry_block: u64,
}

impl Order {
    /// Cleared orders have every numeric field zeroed and the null owner
    pub fn cleared() -> Self {
        Self {
            direction: Direction::ZeroToOne,
            paused: false,
            deposit_remaining: 0,
            proceeds_accrued: 0,
            sales_rate: 0,
            proceeds_checkpoint: ProceedsAccumulator::default(),
            owner: NULL_ADDRESS,
            delegate: NULL_ADDRESS,
            start_block: 0,
            expiry_block: 0,
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.owner == NULL_ADDRESS
    }

    /// Expirations are processed at the expiry block itself
    pub fn is_expired(&self, block: u64) -> bool {
        block >= self.expiry_block
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate != NULL_ADDRESS
    }

    /// Principal the order still holds at `block`, scheduled or not
    pub fn unsold_principal(&self, block: u64) -> u128 {
        if self.paused || self.is_expired(block) {
            return self.deposit_remaining;
        }
        let remaining_blocks = (self.expiry_block - block) as u128;
        self.deposit_remaining
            .saturating_add(self.sales_rate.saturating_mul(remaining_blocks))
    }

    /// Check `sender` may act on the order and resolve who receives funds
    ///
    /// The owner may send funds anywhere (defaulting to themselves). A delegate
    /// may act but funds always go to the owner.
    pub fn authorize(
        &self,
        order_id: u64,
        sender: &Address,
        recipient: Option<Address>,
    ) -> PoolResult<Address> {
        if *sender == self.owner {
            return Ok(recipient.unwrap_or(self.owner));
        }
        if self.has_delegate() && *sender == self.delegate {
            return match recipient {
                None => Ok(self.owner),
                Some(account) if account == self.owner => Ok(self.owner),
                Some(_) => Err(PoolError::DelegateMustPayOwner),
            };
        }
        Err(PoolError::Unauthorized(order_id))
    }
}
