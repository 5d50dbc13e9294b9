//! In-memory custodian for driving a pool outside a chain
//!
//! [`SimVault`] implements the host traits over plain maps: pool balances,
//! account wallets, LP shares, a partner set and a block clock. [`Simulation`]
//! pairs it with a [`TwammPool`] and performs the transfers each outcome
//! describes, checking wallet and share balances the way a custodian would.

use crate::error::PoolError;
use crate::executor::ReplayReport;
use crate::host::{Custodian, PartnerRegistry, ShareLedger};
use crate::operations::{
    ExitKind, ExitOutcome, ExitRequest, JoinKind, JoinOutcome, JoinRequest, SwapKind, SwapOutcome,
    SwapRequest,
};
use crate::order::Order;
use crate::pool::{TwammPool, VirtualSnapshot};
use crate::lifecycle::OrderAmounts;
use crate::types::{short_hex, Address, Direction, NULL_ADDRESS};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Account {account} holds {available} of token {token}, needs {required}")]
    InsufficientFunds {
        account: String,
        token: usize,
        available: u128,
        required: u128,
    },

    #[error("Account {account} holds {available} shares, needs {required}")]
    InsufficientShares {
        account: String,
        available: u128,
        required: u128,
    },

    #[error("{what} exceeds the u128 range")]
    Overflow { what: &'static str },
}

pub type SimResult<T> = Result<T, SimError>;

/// In-memory custodian state
#[derive(Debug, Clone, Default)]
pub struct SimVault {
    block: u64,
    pool_balances: [u128; 2],
    wallets: HashMap<Address, [u128; 2]>,
    shares: HashMap<Address, u128>,
    total_supply: u128,
    partners: HashSet<Address>,
    /// Protocol fees collected from the pool so far
    protocol_fees_collected: [u128; 2],
    /// Every token ever minted
    circulating: [u128; 2],
}

impl SimVault {
    pub fn new(block: u64) -> Self {
        Self {
            block,
            ..Self::default()
        }
    }

    pub fn block(&self) -> u64 {
        self.block
    }

    pub fn wallet(&self, account: &Address) -> [u128; 2] {
        self.wallets.get(account).copied().unwrap_or_default()
    }

    pub fn shares_of(&self, account: &Address) -> u128 {
        self.shares.get(account).copied().unwrap_or_default()
    }

    pub fn protocol_fees_collected(&self) -> [u128; 2] {
        self.protocol_fees_collected
    }

    /// Credit tokens to an account out of thin air
    ///
    /// Minting is capped so that every token in circulation fits u128, which
    /// keeps later transfers between wallets and the pool in range.
    pub fn mint(&mut self, account: Address, amounts: [u128; 2]) -> SimResult<()> {
        let circulating = checked_add_pair(self.circulating, amounts, "circulating supply")?;
        let wallet = checked_add_pair(self.wallet(&account), amounts, "wallet balance")?;
        self.circulating = circulating;
        self.wallets.insert(account, wallet);
        Ok(())
    }

    pub fn add_partner(&mut self, account: Address) {
        self.partners.insert(account);
    }

    fn check_funds(&self, account: &Address, amounts: [u128; 2]) -> SimResult<()> {
        let wallet = self.wallet(account);
        for token in 0..2 {
            if wallet[token] < amounts[token] {
                return Err(SimError::InsufficientFunds {
                    account: short_hex(account),
                    token,
                    available: wallet[token],
                    required: amounts[token],
                });
            }
        }
        Ok(())
    }

    fn check_shares(&self, account: &Address, required: u128) -> SimResult<()> {
        let available = self.shares_of(account);
        if available < required {
            return Err(SimError::InsufficientShares {
                account: short_hex(account),
                available,
                required,
            });
        }
        Ok(())
    }

    /// Apply transfers reported by the pool, all or nothing
    fn settle(
        &mut self,
        payer: &Address,
        recipient: &Address,
        amounts_in: [u128; 2],
        amounts_out: [u128; 2],
        protocol_fees_due: [u128; 2],
    ) -> SimResult<()> {
        self.check_funds(payer, amounts_in)?;
        let mut payer_wallet = self.wallet(payer);
        let mut pool_balances = self.pool_balances;
        for token in 0..2 {
            payer_wallet[token] -= amounts_in[token];
            pool_balances[token] = pool_balances[token]
                .checked_add(amounts_in[token])
                .and_then(|balance| balance.checked_sub(amounts_out[token]))
                .and_then(|balance| balance.checked_sub(protocol_fees_due[token]))
                .ok_or(SimError::Overflow {
                    what: "pool balance",
                })?;
        }
        let collected = checked_add_pair(
            self.protocol_fees_collected,
            protocol_fees_due,
            "protocol fees collected",
        )?;
        let recipient_wallet = if recipient == payer {
            payer_wallet
        } else {
            self.wallet(recipient)
        };
        let recipient_wallet = checked_add_pair(recipient_wallet, amounts_out, "wallet balance")?;

        self.pool_balances = pool_balances;
        self.protocol_fees_collected = collected;
        self.wallets.insert(*payer, payer_wallet);
        self.wallets.insert(*recipient, recipient_wallet);
        Ok(())
    }

    fn credit_shares(&mut self, account: Address, minted: u128, locked: u128) -> SimResult<()> {
        let overflow = SimError::Overflow { what: "share supply" };
        let total_supply = self
            .total_supply
            .checked_add(minted)
            .and_then(|supply| supply.checked_add(locked))
            .ok_or(overflow.clone())?;
        let holding = self
            .shares_of(&account)
            .checked_add(minted)
            .ok_or(overflow.clone())?;
        let locked_holding = self
            .shares_of(&NULL_ADDRESS)
            .checked_add(locked)
            .ok_or(overflow)?;

        self.total_supply = total_supply;
        self.shares.insert(account, holding);
        if locked > 0 {
            self.shares.insert(NULL_ADDRESS, locked_holding);
        }
        Ok(())
    }

    fn debit_shares(&mut self, account: Address, burned: u128) -> SimResult<()> {
        self.check_shares(&account, burned)?;
        let total_supply = self
            .total_supply
            .checked_sub(burned)
            .ok_or(SimError::Overflow {
                what: "share supply",
            })?;
        let holding = self.shares_of(&account) - burned;
        self.shares.insert(account, holding);
        self.total_supply = total_supply;
        Ok(())
    }
}

fn checked_add_pair(
    current: [u128; 2],
    amounts: [u128; 2],
    what: &'static str,
) -> SimResult<[u128; 2]> {
    match (
        current[0].checked_add(amounts[0]),
        current[1].checked_add(amounts[1]),
    ) {
        (Some(first), Some(second)) => Ok([first, second]),
        _ => Err(SimError::Overflow { what }),
    }
}

impl Custodian for SimVault {
    fn pool_balances(&self) -> [u128; 2] {
        self.pool_balances
    }

    fn block_number(&self) -> u64 {
        self.block
    }
}

impl ShareLedger for SimVault {
    fn total_supply(&self) -> u128 {
        self.total_supply
    }
}

impl PartnerRegistry for SimVault {
    fn is_partner(&self, account: &Address) -> bool {
        self.partners.contains(account)
    }
}

/// A pool and its custodian
pub struct Simulation {
    pub pool: TwammPool,
    pub vault: SimVault,
}

impl Simulation {
    pub fn new(pool: TwammPool, block: u64) -> Self {
        Self {
            pool,
            vault: SimVault::new(block),
        }
    }

    pub fn block(&self) -> u64 {
        self.vault.block
    }

    pub fn advance_blocks(&mut self, blocks: u64) {
        self.vault.block = self.vault.block.saturating_add(blocks);
    }

    pub fn advance_to(&mut self, block: u64) {
        self.vault.block = self.vault.block.max(block);
    }

    pub fn swap(
        &mut self,
        sender: Address,
        direction: Direction,
        amount_in: u128,
        kind: SwapKind,
    ) -> SimResult<SwapOutcome> {
        let mut amounts_in = [0u128; 2];
        amounts_in[direction.sell_token()] = amount_in;
        self.vault.check_funds(&sender, amounts_in)?;

        let outcome = self.pool.on_swap(
            &self.vault,
            SwapRequest {
                sender,
                direction,
                amount_in,
                kind,
            },
        )?;

        let mut amounts_out = [0u128; 2];
        amounts_out[direction.buy_token()] = outcome.amount_out;
        self.vault
            .settle(&sender, &sender, amounts_in, amounts_out, [0, 0])?;
        debug!("Simulated swap {} at block {}", direction, self.vault.block);
        Ok(outcome)
    }

    /// Issue a long-term order
    pub fn long_term_swap(
        &mut self,
        sender: Address,
        direction: Direction,
        amount_in: u128,
        num_intervals: u64,
        delegate: Option<Address>,
    ) -> SimResult<SwapOutcome> {
        self.swap(
            sender,
            direction,
            amount_in,
            SwapKind::LongTerm {
                num_intervals,
                delegate: delegate.unwrap_or(NULL_ADDRESS),
            },
        )
    }

    pub fn join(&mut self, sender: Address, amounts: [u128; 2], kind: JoinKind) -> SimResult<JoinOutcome> {
        self.vault.check_funds(&sender, amounts)?;

        let outcome = self.pool.on_join(
            &self.vault,
            JoinRequest {
                sender,
                amounts,
                kind,
            },
        )?;

        self.vault.settle(
            &sender,
            &sender,
            outcome.amounts_in,
            [0, 0],
            outcome.protocol_fees_due,
        )?;
        self.vault
            .credit_shares(sender, outcome.shares_minted, outcome.shares_locked)?;
        Ok(outcome)
    }

    pub fn exit(&mut self, sender: Address, kind: ExitKind) -> SimResult<ExitOutcome> {
        if let ExitKind::Exit { shares } = kind {
            self.vault.check_shares(&sender, shares)?;
        }

        let outcome = self
            .pool
            .on_exit(&self.vault, ExitRequest { sender, kind })?;

        self.vault.settle(
            &sender,
            &outcome.recipient,
            [0, 0],
            outcome.amounts_out,
            outcome.protocol_fees_due,
        )?;
        if outcome.shares_burned > 0 {
            self.vault.debit_shares(sender, outcome.shares_burned)?;
        }
        Ok(outcome)
    }

    pub fn withdraw(&mut self, sender: Address, order_id: u64) -> SimResult<ExitOutcome> {
        self.exit(
            sender,
            ExitKind::Withdraw {
                order_id,
                recipient: None,
            },
        )
    }

    pub fn cancel(&mut self, sender: Address, order_id: u64) -> SimResult<ExitOutcome> {
        self.exit(
            sender,
            ExitKind::Cancel {
                order_id,
                recipient: None,
            },
        )
    }

    pub fn pause_order(&mut self, sender: Address, order_id: u64) -> SimResult<Order> {
        Ok(self.pool.pause_order(&self.vault, sender, order_id)?)
    }

    pub fn resume_order(&mut self, sender: Address, order_id: u64) -> SimResult<Order> {
        Ok(self.pool.resume_order(&self.vault, sender, order_id)?)
    }

    pub fn execute_virtual_orders(&mut self, max_block: u64) -> SimResult<ReplayReport> {
        Ok(self.pool.execute_virtual_orders(&self.vault, max_block)?)
    }

    pub fn virtual_state(&self, max_block: u64) -> SimResult<VirtualSnapshot> {
        Ok(self.pool.virtual_state(&self.vault, max_block)?)
    }

    pub fn order_amounts(&self, order_id: u64) -> SimResult<OrderAmounts> {
        Ok(self.pool.order_amounts(&self.vault, order_id)?)
    }

    /// Current AMM reserves as derived from balances and liabilities
    pub fn reserves(&self) -> SimResult<[u128; 2]> {
        Ok(self.virtual_state(self.vault.block)?.reserves)
    }
}
