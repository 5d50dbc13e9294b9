//! Requests accepted and outcomes returned by the pool entry points
//!
//! Outcomes are instructions to the host: the custodian takes `amounts_in`
//! from the sender, pays `amounts_out` to the recipient, collects
//! `protocol_fees_due` and mints or burns shares as reported.

use crate::lifecycle::{ExtendedOrder, IssuedOrder, OrderSettlement};
use crate::types::{Address, Direction, NULL_ADDRESS};
use serde::{Deserialize, Serialize};
use twamm_amm::FeeShares;

/// Swap flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapKind {
    /// Atomic swap at the short-term fee
    Regular { min_amount_out: u128 },
    /// Atomic swap at the partner fee, registered partners only
    Partner { min_amount_out: u128 },
    /// Deposit into a long-term order
    LongTerm {
        num_intervals: u64,
        #[serde(default = "no_delegate")]
        delegate: Address,
    },
}

fn no_delegate() -> Address {
    NULL_ADDRESS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    pub sender: Address,
    pub direction: Direction,
    pub amount_in: u128,
    pub kind: SwapKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOutcome {
    /// Sell-token taken from the sender
    pub amount_in: u128,
    /// Buy-token paid to the sender (zero for long-term orders)
    pub amount_out: u128,
    /// Gross swap fee split (zero for long-term orders)
    pub fees: FeeShares,
    pub order: Option<IssuedOrder>,
}

/// Join flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Provide liquidity for shares
    Join,
    /// Donate tokens to the reserves without minting shares
    Reward,
    /// Add funds to an existing long-term order
    Extend { order_id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinRequest {
    pub sender: Address,
    /// Maximum token amounts offered
    pub amounts: [u128; 2],
    pub kind: JoinKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    pub amounts_in: [u128; 2],
    /// Shares minted to the sender
    pub shares_minted: u128,
    /// Shares minted to the null address on the first join
    pub shares_locked: u128,
    pub protocol_fees_due: [u128; 2],
    pub extension: Option<ExtendedOrder>,
}

/// Exit flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    /// Burn shares for a proportional slice of the reserves
    Exit { shares: u128 },
    /// Withdraw order proceeds (and the deposit once expired)
    Withdraw {
        order_id: u64,
        #[serde(default)]
        recipient: Option<Address>,
    },
    /// Cancel an active order
    Cancel {
        order_id: u64,
        #[serde(default)]
        recipient: Option<Address>,
    },
    /// Platform fee address collects accrued platform fees
    FeeWithdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRequest {
    pub sender: Address,
    pub kind: ExitKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitOutcome {
    pub recipient: Address,
    pub amounts_out: [u128; 2],
    /// Shares burned from the sender
    pub shares_burned: u128,
    pub protocol_fees_due: [u128; 2],
    pub settlement: Option<OrderSettlement>,
}
