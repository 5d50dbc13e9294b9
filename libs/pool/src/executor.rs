//! Virtual order executor
//!
//! Brings the order pools up to date by replaying every interval boundary
//! between the last processed block and a target block. Each step runs the
//! aggregate virtual trade over the blocks since the previous checkpoint,
//! moves order principal into proceeds and fees, advances the proceeds
//! accumulators and then expires the sales rate scheduled for the boundary.
//!
//! The executor only ever touches a [`LedgerBatch`], so the mutating and
//! read-only paths run identical code and differ only in whether the batch
//! is committed.

use crate::error::{PoolError, PoolResult};
use crate::ledger::LedgerBatch;
use crate::params::EngineParams;
use crate::types::Direction;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use twamm_amm::{FeeShares, IntervalInput, VirtualTrade};

/// Summary of one catch-up run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub from_block: u64,
    pub to_block: u64,
    /// Virtual trade steps executed
    pub steps: u64,
    /// Order principal sold, per token
    pub sold: [u128; 2],
    /// Proceeds bought for the order pools, per token
    pub bought: [u128; 2],
    /// Long-term fees, per token
    pub fees: [FeeShares; 2],
    /// AMM reserves after the run
    pub reserves: [u128; 2],
}

pub struct VirtualOrderExecutor<'p> {
    params: &'p EngineParams,
}

impl<'p> VirtualOrderExecutor<'p> {
    pub fn new(params: &'p EngineParams) -> Self {
        Self { params }
    }

    /// Execute virtual orders up to `min(requested_block, current_block)`
    ///
    /// `balances` are the custodian balances the batch's liabilities are
    /// reconciled against. A target at or before the last processed block is
    /// a no-op.
    pub fn catch_up(
        &self,
        batch: &mut LedgerBatch<'_>,
        balances: [u128; 2],
        requested_block: u64,
        current_block: u64,
    ) -> PoolResult<ReplayReport> {
        let mut reserves = batch.liabilities.reconcile(balances)?;
        let from_block = batch.last_processed_block;
        let target = requested_block.min(current_block);

        let mut report = ReplayReport {
            from_block,
            to_block: from_block,
            reserves,
            ..ReplayReport::default()
        };
        if target <= from_block {
            return Ok(report);
        }

        let interval = self.params.order_block_interval();
        let mut checkpoint = from_block;
        let mut boundary = from_block - from_block % interval + interval;

        while boundary < target {
            self.step(batch, &mut reserves, boundary - checkpoint, &mut report)?;
            self.expire(batch, boundary)?;
            checkpoint = boundary;
            boundary += interval;
        }

        self.step(batch, &mut reserves, target - checkpoint, &mut report)?;
        self.expire(batch, target)?;

        batch.last_processed_block = target;
        report.to_block = target;
        report.reserves = reserves;

        debug!(
            "Executed virtual orders {} -> {} in {} steps: sold {:?}, bought {:?}",
            from_block, target, report.steps, report.sold, report.bought
        );
        Ok(report)
    }

    /// Run the aggregate virtual trade for `blocks` and book its effects
    fn step(
        &self,
        batch: &mut LedgerBatch<'_>,
        reserves: &mut [u128; 2],
        blocks: u64,
        report: &mut ReplayReport,
    ) -> PoolResult<()> {
        let rates = batch.sales_rates;
        if blocks == 0 || rates == [0, 0] {
            return Ok(());
        }

        let trade = VirtualTrade::execute_interval(
            &IntervalInput {
                reserves: *reserves,
                sales_rates: rates,
                blocks,
                long_term_fee_fp: self.params.long_term_fee_fp(),
            },
            self.params.splitter(),
        )?;

        for token in 0..2 {
            batch.liabilities.sub_orders(token, trade.gross_in[token])?;
            batch.liabilities.add_proceeds(token, trade.amount_out[token])?;
            batch
                .liabilities
                .add_protocol_fees(token, trade.fees[token].protocol)?;
            batch
                .liabilities
                .add_platform_fees(token, trade.fees[token].platform)?;

            report.sold[token] += trade.gross_in[token];
            report.bought[token] += trade.amount_out[token];
            report.fees[token].protocol += trade.fees[token].protocol;
            report.fees[token].lp += trade.fees[token].lp;
            report.fees[token].platform += trade.fees[token].platform;
        }

        for direction in Direction::ALL {
            let sold = direction.sell_token();
            batch.accumulators[sold] = batch.accumulators[sold].advance(
                trade.amount_out[direction.buy_token()],
                self.params.scaling_factor(sold),
                rates[sold],
            )?;
        }

        *reserves = trade.reserves;
        report.steps += 1;

        trace!(
            "Virtual step of {} blocks at rates {:?}: out {:?}, reserves {:?}",
            blocks,
            rates,
            trade.amount_out,
            trade.reserves
        );
        Ok(())
    }

    /// Remove the sales rate expiring at `block` and snapshot the accumulators
    fn expire(&self, batch: &mut LedgerBatch<'_>, block: u64) -> PoolResult<()> {
        let expiring = batch.expiring_at(block);
        if expiring == [0, 0] {
            return Ok(());
        }

        for direction in Direction::ALL {
            let token = direction.sell_token();
            batch.sales_rates[token] = batch.sales_rates[token]
                .checked_sub(expiring[token])
                .ok_or(PoolError::SalesRateUnderflow { block, direction })?;
        }
        batch.record_expiry_snapshot(block);

        trace!("Expired sales rate {:?} at block {}", expiring, block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::VirtualOrders;
    use crate::liabilities::Liabilities;
    use crate::test_support::engine_params;

    const RESERVE: u128 = 1_000_000;

    /// One 0->1 pool selling 100/block until block 30, principal 3,000
    fn seeded_batch(ledger: &VirtualOrders) -> LedgerBatch<'_> {
        let liabilities = Liabilities {
            orders: [3_000, 0],
            ..Liabilities::default()
        };
        let mut batch = LedgerBatch::new(ledger, liabilities);
        batch.sales_rates = [100, 0];
        batch.add_expiring(30, Direction::ZeroToOne, 100).unwrap();
        batch
    }

    fn balances() -> [u128; 2] {
        [RESERVE + 3_000, RESERVE]
    }

    #[test]
    fn test_replays_each_boundary_then_partial_step() {
        let params = engine_params(10);
        let ledger = VirtualOrders::new(0);
        let mut batch = seeded_batch(&ledger);

        let report = VirtualOrderExecutor::new(&params)
            .catch_up(&mut batch, balances(), 25, 25)
            .unwrap();

        assert_eq!(report.steps, 3);
        assert_eq!(report.sold, [2_500, 0]);
        assert_eq!(batch.liabilities.orders, [500, 0]);
        assert_eq!(batch.liabilities.proceeds, [0, report.bought[1]]);
        assert_eq!(batch.last_processed_block, 25);
        assert_eq!(batch.sales_rates, [100, 0]);
        // reserves always reconcile against the updated liabilities
        assert_eq!(
            report.reserves,
            batch.liabilities.reconcile(balances()).unwrap()
        );
    }

    #[test]
    fn test_expiry_removes_rate_and_snapshots() {
        let params = engine_params(10);
        let ledger = VirtualOrders::new(0);
        let mut batch = seeded_batch(&ledger);
        let executor = VirtualOrderExecutor::new(&params);

        executor.catch_up(&mut batch, balances(), 25, 25).unwrap();
        let report = executor.catch_up(&mut batch, balances(), 40, 40).unwrap();

        assert_eq!(report.from_block, 25);
        assert_eq!(report.steps, 1);
        assert_eq!(batch.sales_rates, [0, 0]);
        assert_eq!(batch.liabilities.orders, [0, 0]);
        let snapshot = batch.proceeds_at_expiry(30).unwrap();
        assert_eq!(snapshot, batch.accumulators);
    }

    #[test]
    fn test_target_clamped_to_current_block() {
        let params = engine_params(10);
        let ledger = VirtualOrders::new(0);
        let mut batch = seeded_batch(&ledger);

        let report = VirtualOrderExecutor::new(&params)
            .catch_up(&mut batch, balances(), 1_000, 12)
            .unwrap();
        assert_eq!(report.to_block, 12);
        assert_eq!(report.sold, [1_200, 0]);
    }

    #[test]
    fn test_stale_target_is_noop() {
        let params = engine_params(10);
        let ledger = VirtualOrders::new(50);
        let mut batch = LedgerBatch::new(&ledger, Liabilities::default());

        let report = VirtualOrderExecutor::new(&params)
            .catch_up(&mut batch, [10, 10], 40, 60)
            .unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(report.reserves, [10, 10]);
        assert_eq!(batch.last_processed_block, 50);
    }

    #[test]
    fn test_split_replay_matches_single_replay() {
        let params = engine_params(10);
        let ledger = VirtualOrders::new(0);
        let executor = VirtualOrderExecutor::new(&params);

        let mut once = seeded_batch(&ledger);
        executor.catch_up(&mut once, balances(), 30, 30).unwrap();

        let mut twice = seeded_batch(&ledger);
        executor.catch_up(&mut twice, balances(), 20, 20).unwrap();
        executor.catch_up(&mut twice, balances(), 30, 30).unwrap();

        // steps only ever break at boundaries, so the split is invisible
        assert_eq!(once.accumulators, twice.accumulators);
        assert_eq!(once.liabilities, twice.liabilities);
    }

    #[test]
    fn test_underflowing_expiry_is_internal_fault() {
        let params = engine_params(10);
        let ledger = VirtualOrders::new(0);
        let mut batch = seeded_batch(&ledger);
        batch.sales_rates = [40, 0];

        let err = VirtualOrderExecutor::new(&params)
            .catch_up(&mut batch, balances(), 35, 35)
            .unwrap_err();
        assert!(matches!(err, PoolError::SalesRateUnderflow { block: 30, .. }));
        assert!(err.is_internal_fault());
    }
}
