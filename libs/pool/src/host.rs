//! Capabilities the pool needs from its hosting environment
//!
//! The custodian (vault) owns token balances and the block clock, the share
//! ledger tracks LP share supply, and the partner registry authorizes
//! discounted swaps. The pool reads these; it never moves tokens itself.
//! Every outcome it returns describes the transfers the host must perform.

use crate::types::Address;

/// Token custody and block clock
pub trait Custodian {
    /// Pool balances of token0 and token1 held by the custodian
    fn pool_balances(&self) -> [u128; 2];

    fn block_number(&self) -> u64;
}

/// LP share accounting
pub trait ShareLedger {
    fn total_supply(&self) -> u128;
}

/// Registered partner swappers
pub trait PartnerRegistry {
    fn is_partner(&self, account: &Address) -> bool;
}

/// Everything an entry point needs from the host
pub trait Host: Custodian + ShareLedger + PartnerRegistry {}

impl<T: Custodian + ShareLedger + PartnerRegistry> Host for T {}
