//! Scenario runner: replays configured steps against an in-memory pool

use anyhow::{bail, Result};
use colored::Colorize;
use cpamm_math::format_units;
use cpamm_pool::{AccountId, AssetId, InMemoryLedger, Pool, PoolError, PoolEvent};
use log::{info, warn};
use serde::Serialize;
use std::path::Path;

use crate::config::{ClaimsAmount, Scenario, Step};

/// Result of a single step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub ok: bool,
    /// Human readable result, or the error message when the step failed
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub name: String,
    pub balance_a: String,
    pub balance_b: String,
    pub claims: u128,
}

/// Final pool and account state after a run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub asset_a: String,
    pub asset_b: String,
    pub reserve_a: String,
    pub reserve_b: String,
    pub total_claims: u128,
    pub price: Option<String>,
    pub conserved: bool,
    pub accounts: Vec<AccountReport>,
    pub steps: Vec<StepOutcome>,
    pub events: Vec<PoolEvent>,
}

impl Report {
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|step| !step.ok)
    }
}

pub struct Runner {
    pool: Pool<InMemoryLedger>,
    accounts: Vec<AccountId>,
}

impl Runner {
    /// Create the pool and fund every declared account
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let asset_a = AssetId::new(scenario.pool.asset_a.as_str());
        let asset_b = AssetId::new(scenario.pool.asset_b.as_str());

        let mut ledger = InMemoryLedger::new();
        let mut accounts = Vec::with_capacity(scenario.accounts.len());
        for account in &scenario.accounts {
            let id = AccountId::new(account.name.as_str());
            ledger.credit(&asset_a, &id, account.balance_a.0)?;
            ledger.credit(&asset_b, &id, account.balance_b.0)?;
            if account.approve {
                ledger.approve(&asset_a, &id, u128::MAX);
                ledger.approve(&asset_b, &id, u128::MAX);
            }
            accounts.push(id);
        }

        Ok(Self {
            pool: Pool::new(asset_a, asset_b, ledger)?,
            accounts,
        })
    }

    /// Run `steps` in order, stopping at the first failure unless `keep_going`
    pub fn execute(&mut self, steps: &[Step], keep_going: bool) -> Vec<StepOutcome> {
        let mut outcomes = Vec::with_capacity(steps.len());
        for (offset, step) in steps.iter().enumerate() {
            let index = offset + 1;
            let outcome = match self.apply(step) {
                Ok(detail) => {
                    info!("step {} ({}): {}", index, step.name(), detail);
                    StepOutcome {
                        index,
                        op: step.name(),
                        ok: true,
                        detail,
                    }
                }
                Err(err) => {
                    warn!("step {} ({}) failed: {}", index, step.name(), err);
                    StepOutcome {
                        index,
                        op: step.name(),
                        ok: false,
                        detail: err.to_string(),
                    }
                }
            };
            let failed = !outcome.ok;
            outcomes.push(outcome);
            if failed && !keep_going {
                break;
            }
        }
        outcomes
    }

    fn apply(&mut self, step: &Step) -> std::result::Result<String, PoolError> {
        let (asset_a, asset_b) = self.asset_names();
        match step {
            Step::AddLiquidity {
                account,
                amount_a,
                amount_b,
            } => {
                let provider = AccountId::new(account.as_str());
                let minted = self.pool.add_liquidity(amount_a.0, amount_b.0, &provider)?;
                Ok(format!(
                    "{} deposited {} {} and {} {}, minted {} claims",
                    account,
                    format_units(amount_a.0),
                    asset_a,
                    format_units(amount_b.0),
                    asset_b,
                    minted
                ))
            }
            Step::RemoveLiquidity { account, claims } => {
                let owner = AccountId::new(account.as_str());
                let claims = self.resolve_claims(*claims, &owner);
                let (out_a, out_b) = self.pool.remove_liquidity(claims, &owner)?;
                Ok(format!(
                    "{} burned {} claims for {} {} and {} {}",
                    account,
                    claims,
                    format_units(out_a),
                    asset_a,
                    format_units(out_b),
                    asset_b
                ))
            }
            Step::Swap {
                account,
                amount_in,
                direction,
            } => {
                let trader = AccountId::new(account.as_str());
                let amount_out = self.pool.swap(amount_in.0, *direction, &trader)?;
                Ok(format!(
                    "{} swapped {} for {} ({})",
                    account,
                    format_units(amount_in.0),
                    format_units(amount_out),
                    direction
                ))
            }
            Step::TransferClaims { from, to, claims } => {
                let sender = AccountId::new(from.as_str());
                let claims = self.resolve_claims(*claims, &sender);
                self.pool
                    .transfer_claims(&sender, &AccountId::new(to.as_str()), claims)?;
                Ok(format!("{} sent {} claims to {}", from, claims, to))
            }
            Step::Price => {
                let price = self.pool.price()?;
                Ok(format!("1 {} = {} {}", asset_a, format_units(price), asset_b))
            }
            Step::Reserves => {
                let (reserve_a, reserve_b) = self.pool.reserves();
                Ok(format!(
                    "{} {} / {} {}",
                    format_units(reserve_a),
                    asset_a,
                    format_units(reserve_b),
                    asset_b
                ))
            }
            Step::Claims { account } => {
                let held = self.pool.claims_of(&AccountId::new(account.as_str()));
                Ok(format!(
                    "{} holds {} of {} claims",
                    account,
                    held,
                    self.pool.total_claims()
                ))
            }
        }
    }

    fn resolve_claims(&self, claims: ClaimsAmount, owner: &AccountId) -> u128 {
        match claims {
            ClaimsAmount::All => self.pool.claims_of(owner),
            ClaimsAmount::Exact(amount) => amount,
        }
    }

    fn asset_names(&self) -> (String, String) {
        let (a, b) = self.pool.assets();
        (a.to_string(), b.to_string())
    }

    pub fn report(&self, steps: Vec<StepOutcome>) -> Report {
        let (asset_a, asset_b) = self.pool.assets();
        let (reserve_a, reserve_b) = self.pool.reserves();
        let ledger = self.pool.ledger();

        let accounts = self
            .accounts
            .iter()
            .map(|id| AccountReport {
                name: id.to_string(),
                balance_a: format_units(ledger.balance_of(asset_a, id)),
                balance_b: format_units(ledger.balance_of(asset_b, id)),
                claims: self.pool.claims_of(id),
            })
            .collect();

        Report {
            asset_a: asset_a.to_string(),
            asset_b: asset_b.to_string(),
            reserve_a: format_units(reserve_a),
            reserve_b: format_units(reserve_b),
            total_claims: self.pool.total_claims(),
            price: self.pool.price().ok().map(format_units),
            conserved: self.pool.check_conservation(),
            accounts,
            steps,
            events: self.pool.events().to_vec(),
        }
    }
}

/// Load, run and print a scenario file
pub fn run_scenario(path: &Path, json: bool, keep_going: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let mut runner = Runner::new(&scenario)?;
    let outcomes = runner.execute(&scenario.steps, keep_going);
    let report = runner.report(outcomes);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}",
            format!("=== Scenario: {} ===", path.display()).bright_green().bold()
        );
        print_report(&report);
    }

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} of {} executed steps failed", failed, report.steps.len());
    }
    Ok(())
}

fn print_report(report: &Report) {
    println!("\n{}", "Steps".bright_yellow().bold());
    for step in &report.steps {
        if step.ok {
            println!("{} [{}] {}: {}", "✓".bright_green(), step.index, step.op, step.detail);
        } else {
            println!(
                "{} [{}] {}: {}",
                "✗".bright_red(),
                step.index,
                step.op,
                step.detail.red()
            );
        }
    }

    println!("\n{}", "Pool".bright_yellow().bold());
    println!("{} {} {}", "Reserve A:".bright_cyan(), report.reserve_a, report.asset_a);
    println!("{} {} {}", "Reserve B:".bright_cyan(), report.reserve_b, report.asset_b);
    println!("{} {}", "Total claims:".bright_cyan(), report.total_claims);
    match &report.price {
        Some(price) => println!("{} {} {}", "Price:".bright_cyan(), price, report.asset_b),
        None => println!("{} {}", "Price:".bright_cyan(), "undefined (empty pool)".dimmed()),
    }
    if !report.conserved {
        println!("{}", "Conservation check FAILED".bright_red().bold());
    }

    println!("\n{}", "Accounts".bright_yellow().bold());
    for account in &report.accounts {
        println!(
            "{} {} {} / {} {} / {} claims",
            format!("{}:", account.name).bright_cyan(),
            account.balance_a,
            report.asset_a,
            account.balance_b,
            report.asset_b,
            account.claims
        );
    }
}
