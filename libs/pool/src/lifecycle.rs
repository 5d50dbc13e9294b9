//! Long-term order lifecycle
//!
//! Issuance, extension, pause, resume, withdrawal and cancellation, all
//! expressed as edits to a [`LedgerBatch`]. Except for extension, callers run
//! the virtual order executor on the batch first so every order is settled
//! against up-to-date accumulators.

use crate::error::{PoolError, PoolResult};
use crate::ledger::LedgerBatch;
use crate::order::Order;
use crate::params::EngineParams;
use crate::types::{boundary_at_or_after, ensure_u112, short_hex, Address, Direction, NULL_ADDRESS};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A freshly issued long-term order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedOrder {
    pub order_id: u64,
    pub direction: Direction,
    pub sales_rate: u128,
    pub expiry_block: u64,
    /// `sales_rate × (expiry_block − issue block)`, owed to the order
    pub amount_scheduled: u128,
    /// Rounding remainder of the deposit, left to the reserves
    pub amount_forfeited: u128,
}

/// Result of extending an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedOrder {
    pub order_id: u64,
    pub previous_expiry: u64,
    pub expiry_block: u64,
    /// Funds that did not fill a whole interval, kept on the order as deposit
    pub deposit_remaining: u128,
}

/// Funds released by a withdrawal or cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSettlement {
    pub order_id: u64,
    pub direction: Direction,
    pub recipient: Address,
    /// Buy-token proceeds
    pub proceeds: u128,
    /// Sell-token principal returned
    pub refund: u128,
    /// The order was cleared (expired withdrawal or cancellation)
    pub cleared: bool,
}

impl OrderSettlement {
    /// Amounts paid out, indexed by token
    pub fn amounts_out(&self) -> [u128; 2] {
        let mut amounts = [0u128; 2];
        amounts[self.direction.buy_token()] = self.proceeds;
        amounts[self.direction.sell_token()] = self.refund;
        amounts
    }
}

/// Proceeds and refund an order could claim right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAmounts {
    pub order_id: u64,
    pub direction: Direction,
    pub proceeds: u128,
    /// Principal returned by cancellation (or by withdrawal once expired)
    pub refund: u128,
    pub paused: bool,
    pub expired: bool,
}

/// Order lifecycle operations over a batch
pub struct OrderBook<'p> {
    params: &'p EngineParams,
}

impl<'p> OrderBook<'p> {
    pub fn new(params: &'p EngineParams) -> Self {
        Self { params }
    }

    /// Issue a long-term order selling `amount_in` over `num_intervals` intervals
    ///
    /// The expiry lands on an interval boundary: the current block rounded up
    /// to a boundary, plus `num_intervals + 1` intervals. The sales rate is the
    /// deposit divided by the blocks until expiry, rounded down; the remainder
    /// is forfeited to the reserves.
    pub fn issue(
        &self,
        batch: &mut LedgerBatch<'_>,
        block: u64,
        owner: Address,
        delegate: Address,
        direction: Direction,
        amount_in: u128,
        num_intervals: u64,
    ) -> PoolResult<IssuedOrder> {
        if owner == NULL_ADDRESS {
            return Err(PoolError::InvalidOwner);
        }
        if amount_in == 0 {
            return Err(PoolError::ZeroAmount);
        }
        ensure_u112(amount_in, "order amount")?;

        let max = self.params.max_order_intervals();
        if num_intervals > max {
            return Err(PoolError::OrderIntervalsExceeded {
                requested: num_intervals,
                max,
            });
        }

        let interval = self.params.order_block_interval();
        let expiry_block = num_intervals
            .checked_add(1)
            .and_then(|intervals| interval.checked_mul(intervals))
            .zip(block.checked_next_multiple_of(interval))
            .and_then(|(span, start)| start.checked_add(span))
            .ok_or(PoolError::ExpiryOutOfRange {
                block,
                intervals: num_intervals,
            })?;
        let trade_blocks = expiry_block - block;

        let sales_rate = amount_in / u128::from(trade_blocks);
        if sales_rate == 0 {
            return Err(PoolError::SalesRateZero);
        }

        let token = direction.sell_token();
        batch.sales_rates[token] = ensure_u112(
            batch.sales_rates[token].saturating_add(sales_rate),
            "order pool sales rate",
        )?;
        batch.add_expiring(expiry_block, direction, sales_rate)?;

        let amount_scheduled = sales_rate * u128::from(trade_blocks);
        batch.liabilities.add_orders(token, amount_scheduled)?;

        let order_id = batch.insert_new_order(Order {
            direction,
            paused: false,
            deposit_remaining: 0,
            proceeds_accrued: 0,
            sales_rate,
            proceeds_checkpoint: batch.accumulators[token],
            owner,
            delegate,
            start_block: block,
            expiry_block,
        });

        debug!(
            "Issued order {} for {}: {} selling {}/block until {}",
            order_id,
            short_hex(&owner),
            direction,
            sales_rate,
            expiry_block
        );

        Ok(IssuedOrder {
            order_id,
            direction,
            sales_rate,
            expiry_block,
            amount_scheduled,
            amount_forfeited: amount_in - amount_scheduled,
        })
    }

    /// Extend an active order by whole intervals funded with `amounts`
    ///
    /// Only the order's sell token may be supplied. Funds beyond the last whole
    /// interval stay on the order as refundable deposit.
    pub fn extend(
        &self,
        batch: &mut LedgerBatch<'_>,
        block: u64,
        sender: &Address,
        order_id: u64,
        amounts: [u128; 2],
    ) -> PoolResult<ExtendedOrder> {
        let mut order = batch.order(order_id)?;
        order.authorize(order_id, sender, None)?;
        if order.paused {
            return Err(PoolError::OrderPaused(order_id));
        }
        if order.is_expired(block) {
            return Err(PoolError::OrderExpired(order_id));
        }

        let direction = order.direction;
        if amounts[direction.buy_token()] != 0 {
            return Err(PoolError::WrongExtensionToken);
        }
        let supplied = ensure_u112(amounts[direction.sell_token()], "extension amount")?;

        let interval = self.params.order_block_interval();
        let available = order.deposit_remaining.saturating_add(supplied);
        let per_interval = order.sales_rate.saturating_mul(u128::from(interval));
        let added_intervals = available / per_interval;
        if added_intervals == 0 {
            return Err(PoolError::InsufficientExtensionFunds);
        }

        let max = self.params.max_order_intervals();
        let added_intervals = u64::try_from(added_intervals).unwrap_or(u64::MAX);
        let new_expiry = added_intervals
            .checked_mul(interval)
            .and_then(|blocks| order.expiry_block.checked_add(blocks))
            .ok_or(PoolError::ExtensionTooLong {
                intervals: u64::MAX,
                max,
            })?;
        // measured like issuance: boundary-rounded start, one partial interval allowed
        let intervals = (new_expiry - boundary_at_or_after(block, interval)) / interval;
        if intervals.saturating_sub(1) > max {
            return Err(PoolError::ExtensionTooLong {
                intervals: intervals - 1,
                max,
            });
        }

        let consumed = u128::from(added_intervals) * per_interval;
        let previous_expiry = order.expiry_block;
        batch.sub_expiring(previous_expiry, direction, order.sales_rate)?;
        batch.add_expiring(new_expiry, direction, order.sales_rate)?;
        batch
            .liabilities
            .add_orders(direction.sell_token(), supplied)?;

        order.expiry_block = new_expiry;
        order.deposit_remaining = available - consumed;
        batch.put_order(order_id, order);

        debug!(
            "Extended order {} from {} to {} (deposit {})",
            order_id, previous_expiry, new_expiry, order.deposit_remaining
        );

        Ok(ExtendedOrder {
            order_id,
            previous_expiry,
            expiry_block: new_expiry,
            deposit_remaining: order.deposit_remaining,
        })
    }

    /// Stop selling: bank proceeds so far and set the unsold principal aside
    pub fn pause(
        &self,
        batch: &mut LedgerBatch<'_>,
        block: u64,
        sender: &Address,
        order_id: u64,
    ) -> PoolResult<Order> {
        let mut order = batch.order(order_id)?;
        order.authorize(order_id, sender, None)?;
        if order.paused {
            return Err(PoolError::OrderPaused(order_id));
        }
        if order.is_expired(block) {
            return Err(PoolError::OrderExpired(order_id));
        }

        let direction = order.direction;
        let token = direction.sell_token();
        let earned = self.live_proceeds(batch, &order)?;
        let unsold = order.sales_rate * u128::from(order.expiry_block - block);

        order.proceeds_accrued = ensure_u112(
            order.proceeds_accrued.saturating_add(earned),
            "accrued proceeds",
        )?;
        order.deposit_remaining = ensure_u112(
            order.deposit_remaining.saturating_add(unsold),
            "order deposit",
        )?;
        order.proceeds_checkpoint = batch.accumulators[token];
        order.paused = true;

        batch.sales_rates[token] =
            batch.sales_rates[token]
                .checked_sub(order.sales_rate)
                .ok_or(PoolError::SalesRateUnderflow {
                    block,
                    direction,
                })?;
        batch.sub_expiring(order.expiry_block, direction, order.sales_rate)?;
        batch.put_order(order_id, order);

        debug!("Paused order {} with {} unsold", order_id, unsold);
        Ok(order)
    }

    /// Start selling again from the set-aside principal
    pub fn resume(
        &self,
        batch: &mut LedgerBatch<'_>,
        block: u64,
        sender: &Address,
        order_id: u64,
    ) -> PoolResult<Order> {
        let mut order = batch.order(order_id)?;
        order.authorize(order_id, sender, None)?;
        if !order.paused {
            return Err(PoolError::OrderNotPaused(order_id));
        }
        if order.is_expired(block) {
            return Err(PoolError::OrderExpired(order_id));
        }

        let direction = order.direction;
        let token = direction.sell_token();
        let rescheduled = order.sales_rate * u128::from(order.expiry_block - block);
        order.deposit_remaining = order.deposit_remaining.checked_sub(rescheduled).ok_or(
            PoolError::LiabilityUnderflow {
                what: "order deposit",
                token,
            },
        )?;
        order.proceeds_checkpoint = batch.accumulators[token];
        order.paused = false;

        batch.sales_rates[token] = ensure_u112(
            batch.sales_rates[token].saturating_add(order.sales_rate),
            "order pool sales rate",
        )?;
        batch.add_expiring(order.expiry_block, direction, order.sales_rate)?;
        batch.put_order(order_id, order);

        debug!("Resumed order {} selling {}/block", order_id, order.sales_rate);
        Ok(order)
    }

    /// Withdraw proceeds; once expired also the deposit, clearing the order
    pub fn withdraw(
        &self,
        batch: &mut LedgerBatch<'_>,
        block: u64,
        sender: &Address,
        order_id: u64,
        recipient: Option<Address>,
    ) -> PoolResult<OrderSettlement> {
        let mut order = batch.order(order_id)?;
        let recipient = order.authorize(order_id, sender, recipient)?;
        let amounts = self.amounts(batch, block, order_id, &order)?;

        let (refund, cleared) = if amounts.expired {
            (amounts.refund, true)
        } else {
            (0, false)
        };
        if amounts.proceeds == 0 && refund == 0 {
            return Err(PoolError::NoFundsAvailable);
        }

        if cleared {
            order = Order::cleared();
        } else {
            order.proceeds_accrued = 0;
            order.proceeds_checkpoint = batch.accumulators[order.direction.sell_token()];
        }
        self.settle(batch, order_id, order, amounts, recipient, refund, cleared)
    }

    /// Cancel an active order, returning proceeds and all unsold principal
    pub fn cancel(
        &self,
        batch: &mut LedgerBatch<'_>,
        block: u64,
        sender: &Address,
        order_id: u64,
        recipient: Option<Address>,
    ) -> PoolResult<OrderSettlement> {
        let order = batch.order(order_id)?;
        let recipient = order.authorize(order_id, sender, recipient)?;
        if order.is_expired(block) {
            return Err(PoolError::CannotCancelCompletedOrder(order_id));
        }

        let amounts = self.amounts(batch, block, order_id, &order)?;
        if amounts.proceeds == 0 && amounts.refund == 0 {
            return Err(PoolError::NoFundsAvailable);
        }

        if !order.paused {
            let direction = order.direction;
            let token = direction.sell_token();
            batch.sales_rates[token] = batch.sales_rates[token]
                .checked_sub(order.sales_rate)
                .ok_or(PoolError::SalesRateUnderflow { block, direction })?;
            batch.sub_expiring(order.expiry_block, direction, order.sales_rate)?;
        }

        self.settle(
            batch,
            order_id,
            Order::cleared(),
            amounts,
            recipient,
            amounts.refund,
            true,
        )
    }

    /// What the order could claim at `block`, on an already caught-up batch
    pub fn amounts(
        &self,
        batch: &LedgerBatch<'_>,
        block: u64,
        order_id: u64,
        order: &Order,
    ) -> PoolResult<OrderAmounts> {
        let expired = order.is_expired(block);
        let earned = if order.paused {
            0
        } else if expired {
            let snapshot = batch
                .proceeds_at_expiry(order.expiry_block)
                .ok_or(PoolError::MissingExpirySnapshot(order.expiry_block))?;
            let token = order.direction.sell_token();
            snapshot[token].proceeds_since(
                order.proceeds_checkpoint,
                order.sales_rate,
                self.params.scaling_factor(token),
            )?
        } else {
            self.live_proceeds(batch, order)?
        };

        Ok(OrderAmounts {
            order_id,
            direction: order.direction,
            proceeds: order.proceeds_accrued.saturating_add(earned),
            refund: order.unsold_principal(block),
            paused: order.paused,
            expired,
        })
    }

    fn live_proceeds(&self, batch: &LedgerBatch<'_>, order: &Order) -> PoolResult<u128> {
        let token = order.direction.sell_token();
        batch.accumulators[token].proceeds_since(
            order.proceeds_checkpoint,
            order.sales_rate,
            self.params.scaling_factor(token),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn settle(
        &self,
        batch: &mut LedgerBatch<'_>,
        order_id: u64,
        updated: Order,
        amounts: OrderAmounts,
        recipient: Address,
        refund: u128,
        cleared: bool,
    ) -> PoolResult<OrderSettlement> {
        let direction = amounts.direction;
        batch
            .liabilities
            .sub_proceeds(direction.buy_token(), amounts.proceeds)?;
        batch.liabilities.sub_orders(direction.sell_token(), refund)?;
        batch.put_order(order_id, updated);

        debug!(
            "Settled order {} to {}: proceeds {}, refund {}, cleared {}",
            order_id,
            short_hex(&recipient),
            amounts.proceeds,
            refund,
            cleared
        );

        Ok(OrderSettlement {
            order_id,
            direction,
            recipient,
            proceeds: amounts.proceeds,
            refund,
            cleared,
        })
    }
}
