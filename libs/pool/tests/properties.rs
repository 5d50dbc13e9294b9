//! Randomised operation sequences against the pool's accounting invariants

mod common;

use common::*;
use proptest::prelude::*;
use twamm_pool::{Direction, JoinKind, SimError, Simulation, SwapKind};

const FUNDING: u128 = 1_000_000_000_000;

#[derive(Debug, Clone)]
enum Op {
    Issue {
        alice: bool,
        direction: Direction,
        amount: u128,
        intervals: u64,
    },
    Extend {
        order: u64,
        amount: u128,
    },
    Swap {
        direction: Direction,
        amount: u128,
    },
    Withdraw(u64),
    Cancel(u64),
    Pause(u64),
    Resume(u64),
    Advance(u64),
    Execute,
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::ZeroToOne), Just(Direction::OneToZero)]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<bool>(), direction(), 1_000u128..50_000_000, 0u64..8).prop_map(
            |(alice, direction, amount, intervals)| Op::Issue {
                alice,
                direction,
                amount,
                intervals,
            }
        ),
        1 => (0u64..6, 1_000u128..10_000_000)
            .prop_map(|(order, amount)| Op::Extend { order, amount }),
        1 => (direction(), 1u128..5_000_000)
            .prop_map(|(direction, amount)| Op::Swap { direction, amount }),
        1 => (0u64..6).prop_map(Op::Withdraw),
        1 => (0u64..6).prop_map(Op::Cancel),
        1 => (0u64..6).prop_map(Op::Pause),
        1 => (0u64..6).prop_map(Op::Resume),
        3 => (1u64..350).prop_map(Op::Advance),
        1 => Just(Op::Execute),
    ]
}

fn owner_of(sim: &Simulation, order_id: u64) -> [u8; 20] {
    sim.pool
        .order(order_id)
        .map(|order| order.owner)
        .unwrap_or(ALICE)
}

/// Apply one operation; rejections are fine, internal faults are not
fn apply(sim: &mut Simulation, op: &Op) {
    let result = match *op {
        Op::Issue {
            alice,
            direction,
            amount,
            intervals,
        } => {
            let sender = if alice { ALICE } else { BOB };
            sim.long_term_swap(sender, direction, amount, intervals, None)
                .map(|_| ())
        }
        Op::Extend { order, amount } => match sim.pool.order(order).copied() {
            Some(before) if !before.is_cleared() => {
                let mut amounts = [0u128; 2];
                amounts[before.direction.sell_token()] = amount;
                sim.join(before.owner, amounts, JoinKind::Extend { order_id: order })
                    .map(|outcome| {
                        let extended = outcome.extension.unwrap();
                        assert_eq!(extended.expiry_block % OBI, 0);
                        assert!(extended.expiry_block > before.expiry_block);
                        let added = u128::from(extended.expiry_block - before.expiry_block);
                        assert!(added * before.sales_rate <= amount + before.deposit_remaining);
                    })
            }
            _ => Ok(()),
        },
        Op::Swap { direction, amount } => sim
            .swap(LP, direction, amount, SwapKind::Regular { min_amount_out: 0 })
            .map(|_| ()),
        Op::Withdraw(order) => sim.withdraw(owner_of(sim, order), order).map(|_| ()),
        Op::Cancel(order) => sim.cancel(owner_of(sim, order), order).map(|_| ()),
        Op::Pause(order) => sim.pause_order(owner_of(sim, order), order).map(|_| ()),
        Op::Resume(order) => sim.resume_order(owner_of(sim, order), order).map(|_| ()),
        Op::Advance(blocks) => {
            sim.advance_blocks(blocks);
            Ok(())
        }
        Op::Execute => sim.execute_virtual_orders(u64::MAX).map(|_| ()),
    };

    match result {
        Ok(()) | Err(SimError::InsufficientFunds { .. }) => {}
        Err(SimError::Pool(err)) => {
            assert!(!err.is_internal_fault(), "{:?} raised {:?}", op, err);
        }
        Err(other) => panic!("{:?} raised {:?}", op, other),
    }
}

/// Aggregate sales rates equal the sum over live, unpaused orders
fn assert_rates_match_orders(sim: &Simulation) {
    let state = sim.virtual_state(sim.block()).unwrap();
    let mut expected = [0u128; 2];
    for order_id in 0..sim.pool.ledger().next_order_id() {
        let Some(order) = sim.pool.order(order_id) else {
            continue;
        };
        if order.is_cleared() || order.paused || order.expiry_block <= state.block {
            continue;
        }
        expected[order.direction.sell_token()] += order.sales_rate;
    }
    assert_eq!(state.sales_rates, expected);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_liabilities_stay_covered(ops in prop::collection::vec(op(), 1..40)) {
        let mut sim = simulation();
        sim.vault.mint(ALICE, [FUNDING, FUNDING]).unwrap();
        sim.vault.mint(BOB, [FUNDING, FUNDING]).unwrap();
        sim.vault.mint(LP, [FUNDING, FUNDING]).unwrap();

        for op in &ops {
            apply(&mut sim, op);
            assert_conserved(&sim);
            assert_rates_match_orders(&sim);
        }
    }

    #[test]
    fn prop_query_and_execution_agree(
        ops in prop::collection::vec(op(), 1..25),
        target_offset in 0u64..400,
    ) {
        let mut sim = simulation();
        sim.vault.mint(ALICE, [FUNDING, FUNDING]).unwrap();
        sim.vault.mint(BOB, [FUNDING, FUNDING]).unwrap();
        sim.vault.mint(LP, [FUNDING, FUNDING]).unwrap();
        for op in &ops {
            apply(&mut sim, op);
        }

        let target = sim.pool.last_processed_block() + target_offset;
        let snapshot = sim.virtual_state(target).unwrap();
        let report = sim.execute_virtual_orders(target).unwrap();

        prop_assert_eq!(report, snapshot.replay);
        prop_assert_eq!(sim.pool.last_processed_block(), snapshot.block);
        prop_assert_eq!(sim.pool.liabilities(), snapshot.liabilities);
    }
}
