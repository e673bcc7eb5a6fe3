//! Scenario files: pool pair, funded accounts and the steps to run

use anyhow::{bail, Context, Result};
use cpamm_math::parse_units;
use cpamm_pool::Direction;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Asset quantity written as whole or decimal units ("12.5" or 12)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAmount")]
pub struct Amount(pub u128);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Whole(u64),
    Text(String),
}

impl TryFrom<RawAmount> for Amount {
    type Error = String;

    fn try_from(raw: RawAmount) -> std::result::Result<Self, Self::Error> {
        let text = match raw {
            RawAmount::Whole(n) => n.to_string(),
            RawAmount::Text(s) => s,
        };
        parse_units(&text)
            .map(Amount)
            .map_err(|e| format!("invalid amount {:?}: {}", text, e))
    }
}

/// Raw claim count, or every claim the account holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawClaims")]
pub enum ClaimsAmount {
    All,
    Exact(u128),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawClaims {
    Count(u64),
    Text(String),
}

impl TryFrom<RawClaims> for ClaimsAmount {
    type Error = String;

    fn try_from(raw: RawClaims) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawClaims::Count(n) => Ok(ClaimsAmount::Exact(u128::from(n))),
            RawClaims::Text(s) if s == "all" => Ok(ClaimsAmount::All),
            RawClaims::Text(s) => s
                .parse::<u128>()
                .map(ClaimsAmount::Exact)
                .map_err(|_| format!("invalid claim amount {:?}, expected an integer or \"all\"", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    pub asset_a: String,
    pub asset_b: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub name: String,
    #[serde(default)]
    pub balance_a: Amount,
    #[serde(default)]
    pub balance_b: Amount,
    /// Whether the pool may pull this account's assets
    #[serde(default = "default_approve")]
    pub approve: bool,
}

fn default_approve() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    AddLiquidity {
        account: String,
        amount_a: Amount,
        amount_b: Amount,
    },
    RemoveLiquidity {
        account: String,
        claims: ClaimsAmount,
    },
    Swap {
        account: String,
        amount_in: Amount,
        direction: Direction,
    },
    TransferClaims {
        from: String,
        to: String,
        claims: ClaimsAmount,
    },
    Price,
    Reserves,
    Claims {
        account: String,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::AddLiquidity { .. } => "add_liquidity",
            Step::RemoveLiquidity { .. } => "remove_liquidity",
            Step::Swap { .. } => "swap",
            Step::TransferClaims { .. } => "transfer_claims",
            Step::Price => "price",
            Step::Reserves => "reserves",
            Step::Claims { .. } => "claims",
        }
    }

    fn accounts(&self) -> Vec<&str> {
        match self {
            Step::AddLiquidity { account, .. }
            | Step::RemoveLiquidity { account, .. }
            | Step::Swap { account, .. }
            | Step::Claims { account } => vec![account.as_str()],
            Step::TransferClaims { from, to, .. } => vec![from.as_str(), to.as_str()],
            Step::Price | Step::Reserves => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub pool: PoolConfig,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load and validate a scenario from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid scenario: {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(text).context("Failed to parse scenario TOML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.pool.asset_a == self.pool.asset_b {
            bail!("Pool assets must differ, both are {:?}", self.pool.asset_a);
        }

        let mut names = BTreeSet::new();
        for account in &self.accounts {
            if !names.insert(account.name.as_str()) {
                bail!("Account {:?} declared twice", account.name);
            }
        }

        for (index, step) in self.steps.iter().enumerate() {
            for account in step.accounts() {
                if !names.contains(account) {
                    bail!(
                        "Step {} ({}) references undeclared account {:?}",
                        index + 1,
                        step.name(),
                        account
                    );
                }
            }
        }
        Ok(())
    }
}
