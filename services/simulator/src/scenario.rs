//! Scenario files and their replay against a simulated pool
//!
//! A scenario names a few accounts, funds them, and lists steps to apply in
//! order. Token amounts are strings so values beyond the TOML integer range
//! survive parsing. Rejected steps are recorded with their error code and the
//! replay continues unless `fail_fast` is set.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use twamm_config::parse_address;
use twamm_pool::{
    Address, Direction, ExitKind, JoinKind, SimError, Simulation, SwapKind, TwammPool,
    NULL_ADDRESS,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub start_block: u64,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub partners: Vec<String>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub name: String,
    pub address: String,
    /// Initial wallet, token0 then token1
    #[serde(default)]
    pub balances: Option<[String; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Mint {
        account: String,
        amounts: [String; 2],
    },
    Join {
        account: String,
        amounts: [String; 2],
    },
    Reward {
        account: String,
        amounts: [String; 2],
    },
    Exit {
        account: String,
        shares: String,
    },
    Swap {
        account: String,
        direction: Direction,
        amount: String,
        #[serde(default)]
        min_amount_out: Option<String>,
        #[serde(default)]
        partner: bool,
    },
    LongTerm {
        account: String,
        direction: Direction,
        amount: String,
        intervals: u64,
        #[serde(default)]
        delegate: Option<String>,
    },
    Extend {
        account: String,
        order_id: u64,
        amounts: [String; 2],
    },
    Withdraw {
        account: String,
        order_id: u64,
        #[serde(default)]
        recipient: Option<String>,
    },
    Cancel {
        account: String,
        order_id: u64,
        #[serde(default)]
        recipient: Option<String>,
    },
    PauseOrder {
        account: String,
        order_id: u64,
    },
    ResumeOrder {
        account: String,
        order_id: u64,
    },
    FeeWithdraw {
        account: String,
    },
    SetPaused {
        account: String,
        paused: bool,
    },
    Advance {
        blocks: u64,
    },
    Execute {
        #[serde(default)]
        max_block: Option<u64>,
    },
    Snapshot,
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Mint { .. } => "mint",
            Step::Join { .. } => "join",
            Step::Reward { .. } => "reward",
            Step::Exit { .. } => "exit",
            Step::Swap { .. } => "swap",
            Step::LongTerm { .. } => "long_term",
            Step::Extend { .. } => "extend",
            Step::Withdraw { .. } => "withdraw",
            Step::Cancel { .. } => "cancel",
            Step::PauseOrder { .. } => "pause_order",
            Step::ResumeOrder { .. } => "resume_order",
            Step::FeeWithdraw { .. } => "fee_withdraw",
            Step::SetPaused { .. } => "set_paused",
            Step::Advance { .. } => "advance",
            Step::Execute { .. } => "execute",
            Step::Snapshot => "snapshot",
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {:?}", path))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse scenario")
    }
}

/// Result of one replayed step
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub action: &'static str,
    pub block: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl StepRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub struct ScenarioRunner {
    sim: Simulation,
    accounts: BTreeMap<String, Address>,
}

impl ScenarioRunner {
    pub fn new(pool: TwammPool, scenario: &Scenario) -> Result<Self> {
        let mut sim = Simulation::new(pool, scenario.start_block);
        let mut accounts = BTreeMap::new();

        for account in &scenario.accounts {
            let address = parse_address(&account.address)
                .with_context(|| format!("Account {}", account.name))?;
            if accounts.insert(account.name.clone(), address).is_some() {
                bail!("Account {} declared twice", account.name);
            }
            if let Some(balances) = &account.balances {
                sim.vault.mint(address, parse_amounts(balances)?)?;
            }
        }

        let mut runner = Self { sim, accounts };
        for partner in &scenario.partners {
            let address = runner.account(partner)?;
            runner.sim.vault.add_partner(address);
        }
        Ok(runner)
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Apply every step in order
    pub fn run(&mut self, steps: &[Step], fail_fast: bool) -> Result<Vec<StepRecord>> {
        let mut records = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let record = self.run_step(index, step)?;
            if fail_fast && !record.succeeded() {
                bail!(
                    "Step {} ({}) failed: {}",
                    index,
                    record.action,
                    record.error.as_deref().unwrap_or_default()
                );
            }
            records.push(record);
        }
        Ok(records)
    }

    fn run_step(&mut self, index: usize, step: &Step) -> Result<StepRecord> {
        let action = step.action();
        let result = self.apply(step);
        let block = self.sim.block();

        match result {
            Ok(outcome) => {
                debug!("Step {} {} at block {} applied", index, action, block);
                Ok(StepRecord {
                    index,
                    action,
                    block,
                    outcome: Some(outcome),
                    error: None,
                    code: None,
                })
            }
            Err(err) => {
                // malformed scenarios abort, pool rejections are part of the replay
                let sim_error = match err.downcast::<SimError>() {
                    Ok(sim_error) => sim_error,
                    Err(err) => return Err(err.context(format!("Step {} ({})", index, action))),
                };
                warn!("Step {} {} at block {} rejected: {}", index, action, block, sim_error);
                let code = match &sim_error {
                    SimError::Pool(pool_error) => Some(pool_error.code()),
                    _ => None,
                };
                Ok(StepRecord {
                    index,
                    action,
                    block,
                    outcome: None,
                    error: Some(sim_error.to_string()),
                    code,
                })
            }
        }
    }

    fn apply(&mut self, step: &Step) -> Result<Value> {
        let value = match step {
            Step::Mint { account, amounts } => {
                let address = self.account(account)?;
                self.sim.vault.mint(address, parse_amounts(amounts)?)?;
                json!({ "wallet": self.sim.vault.wallet(&address) })
            }
            Step::Join { account, amounts } => {
                let sender = self.account(account)?;
                let outcome = self
                    .sim
                    .join(sender, parse_amounts(amounts)?, JoinKind::Join)?;
                serde_json::to_value(outcome)?
            }
            Step::Reward { account, amounts } => {
                let sender = self.account(account)?;
                let outcome = self
                    .sim
                    .join(sender, parse_amounts(amounts)?, JoinKind::Reward)?;
                serde_json::to_value(outcome)?
            }
            Step::Exit { account, shares } => {
                let sender = self.account(account)?;
                let shares = parse_amount(shares)?;
                serde_json::to_value(self.sim.exit(sender, ExitKind::Exit { shares })?)?
            }
            Step::Swap {
                account,
                direction,
                amount,
                min_amount_out,
                partner,
            } => {
                let sender = self.account(account)?;
                let min_amount_out = min_amount_out
                    .as_deref()
                    .map(parse_amount)
                    .transpose()?
                    .unwrap_or(0);
                let kind = if *partner {
                    SwapKind::Partner { min_amount_out }
                } else {
                    SwapKind::Regular { min_amount_out }
                };
                let outcome = self
                    .sim
                    .swap(sender, *direction, parse_amount(amount)?, kind)?;
                serde_json::to_value(outcome)?
            }
            Step::LongTerm {
                account,
                direction,
                amount,
                intervals,
                delegate,
            } => {
                let sender = self.account(account)?;
                let delegate = delegate
                    .as_deref()
                    .map(|name| self.account(name))
                    .transpose()?;
                let outcome = self.sim.long_term_swap(
                    sender,
                    *direction,
                    parse_amount(amount)?,
                    *intervals,
                    delegate,
                )?;
                serde_json::to_value(outcome)?
            }
            Step::Extend {
                account,
                order_id,
                amounts,
            } => {
                let sender = self.account(account)?;
                let outcome = self.sim.join(
                    sender,
                    parse_amounts(amounts)?,
                    JoinKind::Extend {
                        order_id: *order_id,
                    },
                )?;
                serde_json::to_value(outcome)?
            }
            Step::Withdraw {
                account,
                order_id,
                recipient,
            } => {
                let kind = ExitKind::Withdraw {
                    order_id: *order_id,
                    recipient: self.optional_account(recipient.as_deref())?,
                };
                let sender = self.account(account)?;
                serde_json::to_value(self.sim.exit(sender, kind)?)?
            }
            Step::Cancel {
                account,
                order_id,
                recipient,
            } => {
                let kind = ExitKind::Cancel {
                    order_id: *order_id,
                    recipient: self.optional_account(recipient.as_deref())?,
                };
                let sender = self.account(account)?;
                serde_json::to_value(self.sim.exit(sender, kind)?)?
            }
            Step::PauseOrder { account, order_id } => {
                let sender = self.account(account)?;
                serde_json::to_value(self.sim.pause_order(sender, *order_id)?)?
            }
            Step::ResumeOrder { account, order_id } => {
                let sender = self.account(account)?;
                serde_json::to_value(self.sim.resume_order(sender, *order_id)?)?
            }
            Step::FeeWithdraw { account } => {
                let sender = self.account(account)?;
                serde_json::to_value(self.sim.exit(sender, ExitKind::FeeWithdraw)?)?
            }
            Step::SetPaused { account, paused } => {
                let sender = self.account(account)?;
                self.sim
                    .pool
                    .set_paused(sender, *paused)
                    .map_err(SimError::from)?;
                json!({ "paused": self.sim.pool.is_paused() })
            }
            Step::Advance { blocks } => {
                self.sim.advance_blocks(*blocks);
                json!({ "block": self.sim.block() })
            }
            Step::Execute { max_block } => {
                let max_block = max_block.unwrap_or(u64::MAX);
                serde_json::to_value(self.sim.execute_virtual_orders(max_block)?)?
            }
            Step::Snapshot => self.state()?,
        };
        Ok(value)
    }

    /// Virtual pool state at the current block plus every named wallet
    pub fn state(&self) -> Result<Value> {
        let snapshot = self.sim.virtual_state(self.sim.block())?;
        let wallets: BTreeMap<&str, Value> = self
            .accounts
            .iter()
            .map(|(name, address)| {
                (
                    name.as_str(),
                    json!({
                        "balances": self.sim.vault.wallet(address),
                        "shares": self.sim.vault.shares_of(address),
                    }),
                )
            })
            .collect();

        Ok(json!({
            "block": self.sim.block(),
            "pool_paused": self.sim.pool.is_paused(),
            "virtual_state": snapshot,
            "protocol_fees_collected": self.sim.vault.protocol_fees_collected(),
            "wallets": wallets,
        }))
    }

    fn account(&self, name: &str) -> Result<Address> {
        if name == "null" {
            return Ok(NULL_ADDRESS);
        }
        self.accounts
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Unknown account {}", name))
    }

    fn optional_account(&self, name: Option<&str>) -> Result<Option<Address>> {
        name.map(|name| self.account(name)).transpose()
    }
}

/// Parse a decimal token amount, allowing `_` separators
pub fn parse_amount(value: &str) -> Result<u128> {
    let digits: String = value.chars().filter(|c| *c != '_').collect();
    digits
        .parse::<u128>()
        .with_context(|| format!("Invalid amount {:?}", value))
}

fn parse_amounts(values: &[String; 2]) -> Result<[u128; 2]> {
    Ok([parse_amount(&values[0])?, parse_amount(&values[1])?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use twamm_config::{PoolParams, PoolType};
    use twamm_pool::PartnerRegistry;

    const SCENARIO: &str = r#"
start_block = 1000
partners = ["bob"]

[[accounts]]
name = "lp"
address = "0x1111111111111111111111111111111111111111"
balances = ["1_000_000_000", "1_000_000_000"]

[[accounts]]
name = "alice"
address = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
balances = ["100_000", "0"]

[[accounts]]
name = "bob"
address = "0xb0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0"

[[steps]]
action = "join"
account = "lp"
amounts = ["1_000_000_000", "1_000_000_000"]

[[steps]]
action = "long_term"
account = "alice"
direction = "zero_to_one"
amount = "100_000"
intervals = 4

[[steps]]
action = "advance"
blocks = 250

[[steps]]
action = "cancel"
account = "bob"
order_id = 0

[[steps]]
action = "withdraw"
account = "alice"
order_id = 0

[[steps]]
action = "advance"
blocks = 400

[[steps]]
action = "withdraw"
account = "alice"
order_id = 0

[[steps]]
action = "snapshot"
"#;

    fn pool() -> TwammPool {
        let params = PoolParams {
            pool_type: PoolType::Liquid,
            order_block_interval: 100,
            max_order_intervals: 20,
            short_term_fee_fp: 0,
            partner_fee_fp: 0,
            long_term_fee_fp: 0,
            protocol_fee_e18: 0,
            platform_fee_shift: 0,
            platform_fee_address: None,
            admin_address: None,
            token_decimals: [18, 18],
        };
        TwammPool::new(params, 1_000).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1_000").unwrap(), 1_000);
        assert_eq!(
            parse_amount("340282366920938463463374607431768211455").unwrap(),
            u128::MAX
        );
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("ten").is_err());
    }

    #[test]
    fn test_scenario_replay_records_rejections() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        let mut runner = ScenarioRunner::new(pool(), &scenario).unwrap();
        let records = runner.run(&scenario.steps, false).unwrap();

        assert_eq!(records.len(), 8);
        assert!(records[..3].iter().all(StepRecord::succeeded));

        // bob is neither owner nor delegate
        assert_eq!(records[3].code, Some(206));
        assert!(records[4].succeeded());
        assert_eq!(records[6].block, 1_650);
        assert!(records[6].succeeded());

        let alice = parse_address("0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1").unwrap();
        let wallet = runner.simulation().vault.wallet(&alice);
        assert_eq!(wallet[0], 0);
        assert!(wallet[1] > 99_000);
        assert!(runner.simulation().vault.is_partner(&runner.account("bob").unwrap()));
    }

    #[test]
    fn test_fail_fast_stops_on_rejection() {
        let scenario = Scenario::from_toml_str(SCENARIO).unwrap();
        let mut runner = ScenarioRunner::new(pool(), &scenario).unwrap();
        let err = runner.run(&scenario.steps, true).unwrap_err();
        assert!(err.to_string().contains("Step 3 (cancel)"));
    }

    #[test]
    fn test_unknown_account_aborts() {
        let scenario = Scenario::from_toml_str(
            r#"
[[steps]]
action = "pause_order"
account = "mallory"
order_id = 0
"#,
        )
        .unwrap();
        let mut runner = ScenarioRunner::new(pool(), &scenario).unwrap();
        assert!(runner.run(&scenario.steps, false).is_err());
    }

    #[test]
    fn test_mint_past_u128_is_rejected() {
        let scenario = Scenario::from_toml_str(
            r#"
[[accounts]]
name = "whale"
address = "0x0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c"
balances = ["340282366920938463463374607431768211455", "0"]

[[steps]]
action = "mint"
account = "whale"
amounts = ["1", "0"]
"#,
        )
        .unwrap();
        let mut runner = ScenarioRunner::new(pool(), &scenario).unwrap();
        let records = runner.run(&scenario.steps, false).unwrap();

        assert!(!records[0].succeeded());
        assert_eq!(records[0].code, None);
        let whale = runner.account("whale").unwrap();
        assert_eq!(runner.simulation().vault.wallet(&whale), [u128::MAX, 0]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        fs::write(&path, SCENARIO).unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.start_block, 1_000);
        assert_eq!(scenario.accounts.len(), 3);
        assert_eq!(scenario.steps[1].action(), "long_term");
    }
}
