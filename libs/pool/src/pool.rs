//! TWAMM pool engine
//!
//! [`TwammPool`] is the single owner of all pool state. Every public entry
//! point follows the same shape:
//!
//! 1. take the re-entrancy lock
//! 2. stage a [`LedgerBatch`] over the committed ledger
//! 3. reconcile reserves and execute virtual orders up to the current block
//! 4. apply the operation to the batch
//! 5. check the post-operation balances still cover every liability
//! 6. commit the batch
//!
//! Any failure drops the batch, so an operation either fully applies or
//! leaves no trace. Token transfers are never performed here: each outcome
//! tells the host what to move.

use crate::calldata::{decode_exit, decode_join, decode_swap};
use crate::error::{PoolError, PoolResult};
use crate::executor::{ReplayReport, VirtualOrderExecutor};
use crate::guard::ReentrancyLock;
use crate::host::Host;
use crate::ledger::{LedgerBatch, LedgerWrites, VirtualOrders};
use crate::liabilities::Liabilities;
use crate::lifecycle::{OrderAmounts, OrderBook};
use crate::operations::{
    ExitKind, ExitOutcome, ExitRequest, JoinKind, JoinOutcome, JoinRequest, SwapKind, SwapOutcome,
    SwapRequest,
};
use crate::order::Order;
use crate::order_pools::ProceedsAccumulator;
use crate::params::EngineParams;
use crate::types::{ensure_u112, short_hex, Address, Direction};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use twamm_amm::wide_math::{mul_div, mul_div_up, sqrt_product};
use twamm_amm::{ConstantProduct, CpPoolState};
use twamm_config::{PoolConfig, PoolParams};

/// Shares permanently locked to the null address by the first join
pub const MINIMUM_LIQUIDITY: u128 = 1_000;

/// Pool state as it would be after executing virtual orders to some block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualSnapshot {
    pub block: u64,
    pub reserves: [u128; 2],
    pub liabilities: Liabilities,
    pub sales_rates: [u128; 2],
    pub cumulative_proceeds: [ProceedsAccumulator; 2],
    pub replay: ReplayReport,
}

pub struct TwammPool {
    params: EngineParams,
    ledger: VirtualOrders,
    liabilities: Liabilities,
    paused: bool,
    lock: ReentrancyLock,
}

impl TwammPool {
    /// Create a pool whose virtual orders start at `created_at_block`
    pub fn new(params: PoolParams, created_at_block: u64) -> PoolResult<Self> {
        let params = EngineParams::new(params)?;
        info!(
            "Created {:?} TWAMM pool at block {}: OBI {} blocks, max {} intervals",
            params.pool().pool_type,
            created_at_block,
            params.order_block_interval(),
            params.max_order_intervals()
        );
        Ok(Self {
            params,
            ledger: VirtualOrders::new(created_at_block),
            liabilities: Liabilities::default(),
            paused: false,
            lock: ReentrancyLock::new(),
        })
    }

    pub fn from_config(config: &PoolConfig, created_at_block: u64) -> PoolResult<Self> {
        Self::new(config.resolve()?, created_at_block)
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn ledger(&self) -> &VirtualOrders {
        &self.ledger
    }

    /// Liabilities as of the last processed block
    pub fn liabilities(&self) -> Liabilities {
        self.liabilities
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn last_processed_block(&self) -> u64 {
        self.ledger.last_processed_block()
    }

    /// Shared handle on the re-entrancy flag
    pub fn reentrancy_lock(&self) -> ReentrancyLock {
        self.lock.clone()
    }

    /// Stored order record, including cleared orders
    pub fn order(&self, order_id: u64) -> Option<&Order> {
        self.ledger.order(order_id)
    }

    pub fn order_ids_of(&self, owner: &Address, offset: usize, limit: usize) -> Vec<u64> {
        self.ledger.order_ids_of(owner, offset, limit)
    }

    // ---- entry points ----

    pub fn on_swap<H: Host + ?Sized>(
        &mut self,
        host: &H,
        request: SwapRequest,
    ) -> PoolResult<SwapOutcome> {
        let _guard = self.lock.acquire()?;
        let result = self.swap(host, request);
        observe("swap", result)
    }

    /// Swap callback with the operation encoded in `user_data`
    pub fn on_swap_encoded<H: Host + ?Sized>(
        &mut self,
        host: &H,
        sender: Address,
        direction: Direction,
        amount_in: u128,
        user_data: &[u8],
    ) -> PoolResult<SwapOutcome> {
        let kind = decode_swap(user_data)?;
        self.on_swap(
            host,
            SwapRequest {
                sender,
                direction,
                amount_in,
                kind,
            },
        )
    }

    pub fn on_join<H: Host + ?Sized>(
        &mut self,
        host: &H,
        request: JoinRequest,
    ) -> PoolResult<JoinOutcome> {
        let _guard = self.lock.acquire()?;
        let result = self.join(host, request);
        observe("join", result)
    }

    pub fn on_join_encoded<H: Host + ?Sized>(
        &mut self,
        host: &H,
        sender: Address,
        amounts: [u128; 2],
        user_data: &[u8],
    ) -> PoolResult<JoinOutcome> {
        let kind = decode_join(user_data)?;
        self.on_join(
            host,
            JoinRequest {
                sender,
                amounts,
                kind,
            },
        )
    }

    pub fn on_exit<H: Host + ?Sized>(
        &mut self,
        host: &H,
        request: ExitRequest,
    ) -> PoolResult<ExitOutcome> {
        let _guard = self.lock.acquire()?;
        let result = self.exit(host, request);
        observe("exit", result)
    }

    pub fn on_exit_encoded<H: Host + ?Sized>(
        &mut self,
        host: &H,
        sender: Address,
        user_data: &[u8],
    ) -> PoolResult<ExitOutcome> {
        let kind = decode_exit(user_data)?;
        self.on_exit(host, ExitRequest { sender, kind })
    }

    /// Pause a long-term order (owner or delegate)
    pub fn pause_order<H: Host + ?Sized>(
        &mut self,
        host: &H,
        sender: Address,
        order_id: u64,
    ) -> PoolResult<Order> {
        let _guard = self.lock.acquire()?;
        let result = self.order_toggle(host, sender, order_id, false);
        observe("pause order", result)
    }

    /// Resume a paused long-term order (owner or delegate)
    pub fn resume_order<H: Host + ?Sized>(
        &mut self,
        host: &H,
        sender: Address,
        order_id: u64,
    ) -> PoolResult<Order> {
        let _guard = self.lock.acquire()?;
        let result = self.order_toggle(host, sender, order_id, true);
        observe("resume order", result)
    }

    /// Execute virtual orders up to `min(max_block, current block)`
    ///
    /// Runs regardless of the pool pause flag; anyone may call it.
    pub fn execute_virtual_orders<H: Host + ?Sized>(
        &mut self,
        host: &H,
        max_block: u64,
    ) -> PoolResult<ReplayReport> {
        let _guard = self.lock.acquire()?;
        let result = self.execute(host, max_block);
        observe("execute virtual orders", result)
    }

    /// Admin-only pause switch for swaps, joins and order issuance/resume
    pub fn set_paused(&mut self, sender: Address, paused: bool) -> PoolResult<()> {
        let _guard = self.lock.acquire()?;
        if self.params.admin_address() != Some(sender) {
            warn!("Rejected pause change from {}", short_hex(&sender));
            return Err(PoolError::NotAdmin);
        }
        self.paused = paused;
        info!("Pool paused set to {}", paused);
        Ok(())
    }

    // ---- read-only queries ----

    /// Pool state after executing virtual orders to `min(max_block, current block)`
    ///
    /// Runs exactly the mutating catch-up on a batch that is then discarded.
    pub fn virtual_state<H: Host + ?Sized>(
        &self,
        host: &H,
        max_block: u64,
    ) -> PoolResult<VirtualSnapshot> {
        let mut batch = LedgerBatch::new(&self.ledger, self.liabilities);
        let replay = self.executor().catch_up(
            &mut batch,
            host.pool_balances(),
            max_block,
            host.block_number(),
        )?;
        Ok(VirtualSnapshot {
            block: batch.last_processed_block,
            reserves: replay.reserves,
            liabilities: batch.liabilities,
            sales_rates: batch.sales_rates,
            cumulative_proceeds: batch.accumulators,
            replay,
        })
    }

    /// Proceeds and refund an order could claim at the current block
    pub fn order_amounts<H: Host + ?Sized>(
        &self,
        host: &H,
        order_id: u64,
    ) -> PoolResult<OrderAmounts> {
        let block = host.block_number();
        let mut batch = LedgerBatch::new(&self.ledger, self.liabilities);
        self.executor()
            .catch_up(&mut batch, host.pool_balances(), block, block)?;
        let order = batch.order(order_id)?;
        OrderBook::new(&self.params).amounts(&batch, block, order_id, &order)
    }

    // ---- operations ----

    fn executor(&self) -> VirtualOrderExecutor<'_> {
        VirtualOrderExecutor::new(&self.params)
    }

    fn swap<H: Host + ?Sized>(&mut self, host: &H, request: SwapRequest) -> PoolResult<SwapOutcome> {
        if self.paused {
            return Err(PoolError::PoolPaused);
        }
        if request.amount_in == 0 {
            return Err(PoolError::ZeroAmount);
        }
        ensure_u112(request.amount_in, "swap amount")?;

        let block = host.block_number();
        let balances = host.pool_balances();
        let mut batch = LedgerBatch::new(&self.ledger, self.liabilities);
        let replay = self
            .executor()
            .catch_up(&mut batch, balances, block, block)?;

        let token_in = request.direction.sell_token();
        let token_out = request.direction.buy_token();

        let (min_amount_out, fee_fp) = match request.kind {
            SwapKind::LongTerm {
                num_intervals,
                delegate,
            } => {
                let order = OrderBook::new(&self.params).issue(
                    &mut batch,
                    block,
                    request.sender,
                    delegate,
                    request.direction,
                    request.amount_in,
                    num_intervals,
                )?;
                let mut amounts_in = [0u128; 2];
                amounts_in[token_in] = request.amount_in;
                let after = balances_after(balances, amounts_in, [0, 0], [0, 0])?;
                let writes = checked_writes(batch, after)?;
                self.commit(writes);
                return Ok(SwapOutcome {
                    amount_in: request.amount_in,
                    order: Some(order),
                    ..SwapOutcome::default()
                });
            }
            SwapKind::Regular { min_amount_out } => {
                (min_amount_out, self.params.short_term_fee_fp())
            }
            SwapKind::Partner { min_amount_out } => {
                if !host.is_partner(&request.sender) {
                    return Err(PoolError::NotPartner);
                }
                (min_amount_out, self.params.partner_fee_fp())
            }
        };

        let quote = ConstantProduct::quote(
            request.amount_in,
            &CpPoolState {
                reserve_in: replay.reserves[token_in],
                reserve_out: replay.reserves[token_out],
                fee_fp,
            },
        )?;
        if quote.amount_out < min_amount_out {
            return Err(PoolError::SlippageExceeded {
                amount_out: quote.amount_out,
                min_amount_out,
            });
        }

        let fees = self.params.splitter().split(quote.fee)?;
        batch.liabilities.add_protocol_fees(token_in, fees.protocol)?;
        batch.liabilities.add_platform_fees(token_in, fees.platform)?;

        let mut amounts_in = [0u128; 2];
        amounts_in[token_in] = request.amount_in;
        let mut amounts_out = [0u128; 2];
        amounts_out[token_out] = quote.amount_out;
        let after = balances_after(balances, amounts_in, amounts_out, [0, 0])?;
        let writes = checked_writes(batch, after)?;
        self.commit(writes);

        debug!(
            "Swap {} by {}: {} in, {} out, fee {}",
            request.direction,
            short_hex(&request.sender),
            request.amount_in,
            quote.amount_out,
            quote.fee
        );

        Ok(SwapOutcome {
            amount_in: request.amount_in,
            amount_out: quote.amount_out,
            fees,
            order: None,
        })
    }

    fn join<H: Host + ?Sized>(&mut self, host: &H, request: JoinRequest) -> PoolResult<JoinOutcome> {
        if self.paused {
            return Err(PoolError::PoolPaused);
        }
        for amount in request.amounts {
            ensure_u112(amount, "join amount")?;
        }

        let block = host.block_number();
        let balances = host.pool_balances();
        let mut batch = LedgerBatch::new(&self.ledger, self.liabilities);

        if let JoinKind::Extend { order_id } = request.kind {
            // extension settles nothing, so virtual orders are not executed here
            let extension = OrderBook::new(&self.params).extend(
                &mut batch,
                block,
                &request.sender,
                order_id,
                request.amounts,
            )?;
            let protocol_fees_due = batch.liabilities.take_protocol_fees();
            let after = balances_after(balances, request.amounts, [0, 0], protocol_fees_due)?;
            let writes = checked_writes(batch, after)?;
            self.commit(writes);
            return Ok(JoinOutcome {
                amounts_in: request.amounts,
                protocol_fees_due,
                extension: Some(extension),
                ..JoinOutcome::default()
            });
        }

        let replay = self
            .executor()
            .catch_up(&mut batch, balances, block, block)?;
        let reserves = replay.reserves;
        let supply = host.total_supply();

        let (amounts_in, shares_minted, shares_locked) = if request.kind == JoinKind::Reward {
            if supply == 0 {
                return Err(PoolError::PoolNotInitialized);
            }
            if request.amounts == [0, 0] {
                return Err(PoolError::ZeroAmount);
            }
            (request.amounts, 0, 0)
        } else if supply == 0 {
            let [amount0, amount1] = request.amounts;
            if amount0 == 0 || amount1 == 0 {
                return Err(PoolError::ZeroAmount);
            }
            let shares = sqrt_product(amount0, amount1);
            if shares <= MINIMUM_LIQUIDITY {
                return Err(PoolError::InsufficientInitialLiquidity {
                    minimum: MINIMUM_LIQUIDITY,
                });
            }
            (request.amounts, shares - MINIMUM_LIQUIDITY, MINIMUM_LIQUIDITY)
        } else {
            if reserves[0] == 0 || reserves[1] == 0 {
                return Err(PoolError::PoolNotInitialized);
            }
            let shares0 = mul_div(request.amounts[0], supply, reserves[0], "join shares")?;
            let shares1 = mul_div(request.amounts[1], supply, reserves[1], "join shares")?;
            let shares = shares0.min(shares1);
            if shares == 0 {
                return Err(PoolError::ZeroAmount);
            }
            let amounts_in = [
                mul_div_up(shares, reserves[0], supply, "join amount")?,
                mul_div_up(shares, reserves[1], supply, "join amount")?,
            ];
            (amounts_in, shares, 0)
        };

        let protocol_fees_due = batch.liabilities.take_protocol_fees();
        let after = balances_after(balances, amounts_in, [0, 0], protocol_fees_due)?;
        let writes = checked_writes(batch, after)?;
        self.commit(writes);

        info!(
            "Join by {}: {:?} in, {} shares minted, protocol fees due {:?}",
            short_hex(&request.sender),
            amounts_in,
            shares_minted,
            protocol_fees_due
        );

        Ok(JoinOutcome {
            amounts_in,
            shares_minted,
            shares_locked,
            protocol_fees_due,
            extension: None,
        })
    }

    fn exit<H: Host + ?Sized>(&mut self, host: &H, request: ExitRequest) -> PoolResult<ExitOutcome> {
        let block = host.block_number();
        let balances = host.pool_balances();
        let mut batch = LedgerBatch::new(&self.ledger, self.liabilities);
        let replay = self
            .executor()
            .catch_up(&mut batch, balances, block, block)?;
        let book = OrderBook::new(&self.params);

        let (recipient, amounts_out, shares_burned, settlement) = match request.kind {
            ExitKind::Exit { shares } => {
                if shares == 0 {
                    return Err(PoolError::ZeroAmount);
                }
                let supply = host.total_supply();
                if shares > supply {
                    return Err(PoolError::InsufficientShares {
                        requested: shares,
                        supply,
                    });
                }
                let amounts_out = [
                    mul_div(replay.reserves[0], shares, supply, "exit amount")?,
                    mul_div(replay.reserves[1], shares, supply, "exit amount")?,
                ];
                (request.sender, amounts_out, shares, None)
            }
            ExitKind::Withdraw {
                order_id,
                recipient,
            } => {
                let settlement =
                    book.withdraw(&mut batch, block, &request.sender, order_id, recipient)?;
                (settlement.recipient, settlement.amounts_out(), 0, Some(settlement))
            }
            ExitKind::Cancel {
                order_id,
                recipient,
            } => {
                let settlement =
                    book.cancel(&mut batch, block, &request.sender, order_id, recipient)?;
                (settlement.recipient, settlement.amounts_out(), 0, Some(settlement))
            }
            ExitKind::FeeWithdraw => {
                if self.params.platform_fee_address() != Some(request.sender) {
                    return Err(PoolError::NotPlatformFeeAddress);
                }
                let fees = batch.liabilities.take_platform_fees();
                if fees == [0, 0] {
                    return Err(PoolError::NoFundsAvailable);
                }
                (request.sender, fees, 0, None)
            }
        };

        let protocol_fees_due = batch.liabilities.take_protocol_fees();
        let after = balances_after(balances, [0, 0], amounts_out, protocol_fees_due)?;
        let writes = checked_writes(batch, after)?;
        self.commit(writes);

        info!(
            "Exit {:?} by {}: {:?} out to {}",
            request.kind,
            short_hex(&request.sender),
            amounts_out,
            short_hex(&recipient)
        );

        Ok(ExitOutcome {
            recipient,
            amounts_out,
            shares_burned,
            protocol_fees_due,
            settlement,
        })
    }

    fn order_toggle<H: Host + ?Sized>(
        &mut self,
        host: &H,
        sender: Address,
        order_id: u64,
        resume: bool,
    ) -> PoolResult<Order> {
        if resume && self.paused {
            return Err(PoolError::PoolPaused);
        }
        let block = host.block_number();
        let balances = host.pool_balances();
        let mut batch = LedgerBatch::new(&self.ledger, self.liabilities);
        self.executor()
            .catch_up(&mut batch, balances, block, block)?;

        let book = OrderBook::new(&self.params);
        let order = if resume {
            book.resume(&mut batch, block, &sender, order_id)?
        } else {
            book.pause(&mut batch, block, &sender, order_id)?
        };

        let writes = checked_writes(batch, balances)?;
        self.commit(writes);
        Ok(order)
    }

    fn execute<H: Host + ?Sized>(&mut self, host: &H, max_block: u64) -> PoolResult<ReplayReport> {
        let balances = host.pool_balances();
        let mut batch = LedgerBatch::new(&self.ledger, self.liabilities);
        let report = self.executor().catch_up(
            &mut batch,
            balances,
            max_block,
            host.block_number(),
        )?;
        let writes = checked_writes(batch, balances)?;
        self.commit(writes);
        Ok(report)
    }

    fn commit(&mut self, writes: LedgerWrites) {
        self.liabilities = writes.liabilities;
        self.ledger.apply(writes);
    }
}

/// Custodian balances once the outcome's transfers have been made
fn balances_after(
    balances: [u128; 2],
    amounts_in: [u128; 2],
    amounts_out: [u128; 2],
    fees_due: [u128; 2],
) -> PoolResult<[u128; 2]> {
    let mut after = [0u128; 2];
    for token in 0..2 {
        let outflow = amounts_out[token].saturating_add(fees_due[token]);
        after[token] = balances[token]
            .checked_add(amounts_in[token])
            .and_then(|balance| balance.checked_sub(outflow))
            .ok_or(PoolError::InsufficientBalance {
                token,
                balance: balances[token],
                liabilities: outflow,
            })?;
    }
    Ok(after)
}

/// Verify the post-operation balances still cover every liability
fn checked_writes(batch: LedgerBatch<'_>, balances: [u128; 2]) -> PoolResult<LedgerWrites> {
    let reserves = batch.liabilities.reconcile(balances)?;
    for reserve in reserves {
        ensure_u112(reserve, "reserve")?;
    }
    Ok(batch.into_writes())
}

fn observe<T>(operation: &'static str, result: PoolResult<T>) -> PoolResult<T> {
    if let Err(err) = &result {
        if err.is_internal_fault() {
            error!(
                "{} aborted on internal fault {}: {}",
                operation,
                err.code(),
                err
            );
        } else {
            debug!("{} rejected ({}): {}", operation, err.code(), err);
        }
    }
    result
}
