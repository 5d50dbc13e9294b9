//! Persistent virtual order ledger and its write batches
//!
//! Every pool operation runs against a [`LedgerBatch`]: a read-through overlay
//! on the committed [`VirtualOrders`] that buffers all writes. The batch is
//! either converted into [`LedgerWrites`] and applied in one step when the
//! operation succeeds, or dropped, leaving the committed ledger untouched. The
//! read-only queries run the very same catch-up on a batch they then discard.

use crate::error::{PoolError, PoolResult};
use crate::liabilities::Liabilities;
use crate::order::Order;
use crate::order_pools::{OrderPools, ProceedsAccumulator};
use crate::types::{ensure_u112, Address, Direction};
use std::collections::{BTreeMap, HashMap};

/// Committed virtual order state
#[derive(Debug, Clone)]
pub struct VirtualOrders {
    pools: OrderPools,
    last_processed_block: u64,
    next_order_id: u64,
    /// Accumulator readings at boundaries where orders expired
    proceeds_at_expiry: BTreeMap<u64, [ProceedsAccumulator; 2]>,
    orders: BTreeMap<u64, Order>,
    orders_by_owner: HashMap<Address, Vec<u64>>,
}

impl VirtualOrders {
    /// Empty ledger whose virtual orders are processed up to `start_block`
    pub fn new(start_block: u64) -> Self {
        Self {
            pools: OrderPools::default(),
            last_processed_block: start_block,
            next_order_id: 0,
            proceeds_at_expiry: BTreeMap::new(),
            orders: BTreeMap::new(),
            orders_by_owner: HashMap::new(),
        }
    }

    pub fn pools(&self) -> &OrderPools {
        &self.pools
    }

    pub fn last_processed_block(&self) -> u64 {
        self.last_processed_block
    }

    pub fn next_order_id(&self) -> u64 {
        self.next_order_id
    }

    pub fn order(&self, order_id: u64) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn proceeds_at_expiry(&self, block: u64) -> Option<[ProceedsAccumulator; 2]> {
        self.proceeds_at_expiry.get(&block).copied()
    }

    /// Page through the order ids issued to `owner`, oldest first
    pub fn order_ids_of(&self, owner: &Address, offset: usize, limit: usize) -> Vec<u64> {
        self.orders_by_owner
            .get(owner)
            .map(|ids| ids.iter().skip(offset).take(limit).copied().collect())
            .unwrap_or_default()
    }

    pub fn order_count_of(&self, owner: &Address) -> usize {
        self.orders_by_owner.get(owner).map_or(0, Vec::len)
    }

    /// Apply a finished batch
    pub fn apply(&mut self, writes: LedgerWrites) {
        self.pools.current_sales_rate = writes.sales_rates;
        self.pools.cumulative_proceeds = writes.accumulators;
        self.last_processed_block = writes.last_processed_block;
        self.next_order_id = writes.next_order_id;

        for (block, rates) in writes.expiring {
            if rates == [0, 0] {
                self.pools.sales_rate_expiring.remove(&block);
            } else {
                self.pools.sales_rate_expiring.insert(block, rates);
            }
        }
        self.proceeds_at_expiry.extend(writes.snapshots);
        self.orders.extend(writes.orders);
        for (owner, order_id) in writes.new_owner_entries {
            self.orders_by_owner.entry(owner).or_default().push(order_id);
        }
    }
}

/// Buffered writes of a finished batch
#[derive(Debug, Clone)]
pub struct LedgerWrites {
    pub sales_rates: [u128; 2],
    pub accumulators: [ProceedsAccumulator; 2],
    pub last_processed_block: u64,
    pub liabilities: Liabilities,
    next_order_id: u64,
    orders: BTreeMap<u64, Order>,
    expiring: BTreeMap<u64, [u128; 2]>,
    snapshots: BTreeMap<u64, [ProceedsAccumulator; 2]>,
    new_owner_entries: Vec<(Address, u64)>,
}

/// Read-through write overlay on the committed ledger
#[derive(Debug)]
pub struct LedgerBatch<'a> {
    base: &'a VirtualOrders,
    pub sales_rates: [u128; 2],
    pub accumulators: [ProceedsAccumulator; 2],
    pub last_processed_block: u64,
    pub liabilities: Liabilities,
    next_order_id: u64,
    orders: BTreeMap<u64, Order>,
    expiring: BTreeMap<u64, [u128; 2]>,
    snapshots: BTreeMap<u64, [ProceedsAccumulator; 2]>,
    new_owner_entries: Vec<(Address, u64)>,
}

impl<'a> LedgerBatch<'a> {
    pub fn new(base: &'a VirtualOrders, liabilities: Liabilities) -> Self {
        Self {
            base,
            sales_rates: base.pools.current_sales_rate,
            accumulators: base.pools.cumulative_proceeds,
            last_processed_block: base.last_processed_block,
            liabilities,
            next_order_id: base.next_order_id,
            orders: BTreeMap::new(),
            expiring: BTreeMap::new(),
            snapshots: BTreeMap::new(),
            new_owner_entries: Vec::new(),
        }
    }

    /// Live (not cleared) order, staged version first
    pub fn order(&self, order_id: u64) -> PoolResult<Order> {
        let order = self
            .orders
            .get(&order_id)
            .or_else(|| self.base.orders.get(&order_id))
            .copied()
            .ok_or(PoolError::OrderNotFound(order_id))?;
        if order.is_cleared() {
            return Err(PoolError::OrderNotFound(order_id));
        }
        Ok(order)
    }

    pub fn put_order(&mut self, order_id: u64, order: Order) {
        self.orders.insert(order_id, order);
    }

    /// Store a brand-new order under the next id and index it by owner
    pub fn insert_new_order(&mut self, order: Order) -> u64 {
        let order_id = self.next_order_id;
        self.next_order_id += 1;
        self.new_owner_entries.push((order.owner, order_id));
        self.orders.insert(order_id, order);
        order_id
    }

    pub fn expiring_at(&self, block: u64) -> [u128; 2] {
        self.expiring
            .get(&block)
            .copied()
            .unwrap_or_else(|| self.base.pools.expiring_at(block))
    }

    pub fn add_expiring(&mut self, block: u64, direction: Direction, rate: u128) -> PoolResult<()> {
        let mut rates = self.expiring_at(block);
        let token = direction.sell_token();
        rates[token] = ensure_u112(rates[token].saturating_add(rate), "expiring sales rate")?;
        self.expiring.insert(block, rates);
        Ok(())
    }

    pub fn sub_expiring(&mut self, block: u64, direction: Direction, rate: u128) -> PoolResult<()> {
        let mut rates = self.expiring_at(block);
        let token = direction.sell_token();
        rates[token] = rates[token]
            .checked_sub(rate)
            .ok_or(PoolError::SalesRateUnderflow { block, direction })?;
        self.expiring.insert(block, rates);
        Ok(())
    }

    pub fn proceeds_at_expiry(&self, block: u64) -> Option<[ProceedsAccumulator; 2]> {
        self.snapshots
            .get(&block)
            .copied()
            .or_else(|| self.base.proceeds_at_expiry(block))
    }

    pub fn record_expiry_snapshot(&mut self, block: u64) {
        self.snapshots.insert(block, self.accumulators);
    }

    pub fn into_writes(self) -> LedgerWrites {
        LedgerWrites {
            sales_rates: self.sales_rates,
            accumulators: self.accumulators,
            last_processed_block: self.last_processed_block,
            liabilities: self.liabilities,
            next_order_id: self.next_order_id,
            orders: self.orders,
            expiring: self.expiring,
            snapshots: self.snapshots,
            new_owner_entries: self.new_owner_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NULL_ADDRESS;

    const OWNER: Address = [9u8; 20];

    fn sample_order(expiry_block: u64) -> Order {
        Order {
            owner: OWNER,
            sales_rate: 4,
            expiry_block,
            ..Order::cleared()
        }
    }

    #[test]
    fn test_dropped_batch_leaves_ledger_untouched() {
        let ledger = VirtualOrders::new(50);
        {
            let mut batch = LedgerBatch::new(&ledger, Liabilities::default());
            batch.insert_new_order(sample_order(100));
            batch.add_expiring(100, Direction::ZeroToOne, 4).unwrap();
            batch.last_processed_block = 90;
        }
        assert_eq!(ledger.next_order_id(), 0);
        assert_eq!(ledger.last_processed_block(), 50);
        assert_eq!(ledger.pools().expiring_at(100), [0, 0]);
    }

    #[test]
    fn test_applied_batch_commits_everything() {
        let mut ledger = VirtualOrders::new(0);
        let writes = {
            let mut batch = LedgerBatch::new(&ledger, Liabilities::default());
            let id = batch.insert_new_order(sample_order(100));
            assert_eq!(id, 0);
            batch.add_expiring(100, Direction::OneToZero, 4).unwrap();
            batch.sales_rates = [0, 4];
            batch.record_expiry_snapshot(10);
            batch.into_writes()
        };
        ledger.apply(writes);

        assert_eq!(ledger.order(0).unwrap().sales_rate, 4);
        assert_eq!(ledger.pools().expiring_at(100), [0, 4]);
        assert_eq!(ledger.pools().current_sales_rate, [0, 4]);
        assert!(ledger.proceeds_at_expiry(10).is_some());
        assert_eq!(ledger.order_ids_of(&OWNER, 0, 10), vec![0]);
        assert_eq!(ledger.next_order_id(), 1);
    }

    #[test]
    fn test_emptied_expiry_entries_are_removed() {
        let mut ledger = VirtualOrders::new(0);
        let mut batch = LedgerBatch::new(&ledger, Liabilities::default());
        batch.add_expiring(100, Direction::ZeroToOne, 4).unwrap();
        let writes = batch.into_writes();
        ledger.apply(writes);

        let mut batch = LedgerBatch::new(&ledger, Liabilities::default());
        batch.sub_expiring(100, Direction::ZeroToOne, 4).unwrap();
        assert!(matches!(
            batch.sub_expiring(100, Direction::ZeroToOne, 1),
            Err(PoolError::SalesRateUnderflow { block: 100, .. })
        ));
        let writes = batch.into_writes();
        ledger.apply(writes);
        assert!(ledger.pools().sales_rate_expiring.is_empty());
    }

    #[test]
    fn test_cleared_orders_read_as_missing() {
        let mut ledger = VirtualOrders::new(0);
        let mut batch = LedgerBatch::new(&ledger, Liabilities::default());
        let id = batch.insert_new_order(sample_order(100));
        batch.put_order(id, Order::cleared());
        let writes = batch.into_writes();
        ledger.apply(writes);

        let batch = LedgerBatch::new(&ledger, Liabilities::default());
        assert_eq!(batch.order(id), Err(PoolError::OrderNotFound(id)));
        assert_eq!(ledger.order(id).unwrap().owner, NULL_ADDRESS);
        // the owner index keeps the id for enumeration
        assert_eq!(ledger.order_count_of(&OWNER), 1);
    }

    #[test]
    fn test_owner_pagination() {
        let mut ledger = VirtualOrders::new(0);
        let mut batch = LedgerBatch::new(&ledger, Liabilities::default());
        for _ in 0..5 {
            batch.insert_new_order(sample_order(100));
        }
        let writes = batch.into_writes();
        ledger.apply(writes);
        assert_eq!(ledger.order_ids_of(&OWNER, 1, 2), vec![1, 2]);
        assert_eq!(ledger.order_ids_of(&OWNER, 4, 10), vec![4]);
        assert!(ledger.order_ids_of(&OWNER, 9, 10).is_empty());
        assert!(ledger.order_ids_of(&NULL_ADDRESS, 0, 10).is_empty());
    }
}
