//! Shared fixtures for pool integration tests

#![allow(dead_code)]

use twamm_config::{PoolParams, PoolType};
use twamm_pool::{Address, Custodian, JoinKind, Simulation, TwammPool};

pub const LP: Address = [0x11; 20];
pub const ALICE: Address = [0xa1; 20];
pub const BOB: Address = [0xb0; 20];
pub const DELEGATE: Address = [0xde; 20];
pub const ADMIN: Address = [0xad; 20];
pub const PLATFORM: Address = [0xf0; 20];

pub const OBI: u64 = 100;
pub const START_BLOCK: u64 = 1_000;
pub const LIQUIDITY: u128 = 1_000_000_000_000_000_000_000_000;

/// Fee-free pool with a 100-block interval
pub fn params() -> PoolParams {
    PoolParams {
        pool_type: PoolType::Liquid,
        order_block_interval: OBI,
        max_order_intervals: 50,
        short_term_fee_fp: 0,
        partner_fee_fp: 0,
        long_term_fee_fp: 0,
        protocol_fee_e18: 0,
        platform_fee_shift: 0,
        platform_fee_address: None,
        admin_address: Some(ADMIN),
        token_decimals: [18, 18],
    }
}

/// Pool seeded with `liquidity` of each token by `LP`
pub fn simulation_with(params: PoolParams, liquidity: [u128; 2]) -> Simulation {
    init_tracing();
    let pool = TwammPool::new(params, START_BLOCK).unwrap();
    let mut sim = Simulation::new(pool, START_BLOCK);
    sim.vault.mint(LP, liquidity).unwrap();
    sim.join(LP, liquidity, JoinKind::Join).unwrap();
    sim
}

pub fn simulation() -> Simulation {
    simulation_with(params(), [LIQUIDITY, LIQUIDITY])
}

/// Custodied balances cover every liability after replay to the current block
pub fn assert_conserved(sim: &Simulation) {
    let state = sim.virtual_state(sim.block()).unwrap();
    let balances = sim.vault.pool_balances();
    for token in 0..2 {
        let owed = state.liabilities.total(token).unwrap();
        assert!(
            balances[token] >= owed,
            "token {} balance {} below liabilities {}",
            token,
            balances[token],
            owed
        );
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
