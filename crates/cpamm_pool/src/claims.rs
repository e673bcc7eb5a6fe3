//! Liquidity claim balances
//!
//! A minimal fungible-balance book: per-account balances plus the total
//! supply. Every public mutation either applies fully or returns an error
//! without touching state, and keeps `sum(balances) == total_supply`.

use std::collections::BTreeMap;

use crate::{AccountId, PoolError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimsLedger {
    balances: BTreeMap<AccountId, u128>,
    total_supply: u128,
}

impl ClaimsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim balance of `account`, zero when unknown
    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Iterate over accounts holding a non-zero balance
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, u128)> {
        self.balances.iter().map(|(account, balance)| (account, *balance))
    }

    /// Issue `amount` new claims to `to`
    pub fn mint(&mut self, to: &AccountId, amount: u128) -> Result<()> {
        let new_total = self
            .total_supply
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        // balance <= total, so the per-account add cannot overflow once the total fits
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        self.total_supply = new_total;
        self.prune(to);
        Ok(())
    }

    /// Destroy `amount` claims held by `from`
    pub fn burn(&mut self, from: &AccountId, amount: u128) -> Result<()> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(PoolError::InsufficientClaims);
        }
        self.balances.insert(from.clone(), balance - amount);
        self.total_supply -= amount;
        self.prune(from);
        Ok(())
    }

    /// Move `amount` claims from one holder to another; supply is unchanged
    pub fn move_claims(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<()> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(PoolError::InsufficientClaims);
        }
        if from == to {
            return Ok(());
        }
        self.balances.insert(from.clone(), balance - amount);
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        self.prune(from);
        self.prune(to);
        Ok(())
    }

    /// Reverse a successful `mint`
    pub(crate) fn unwind_mint(&mut self, to: &AccountId, amount: u128) {
        if let Some(balance) = self.balances.get_mut(to) {
            *balance = balance.saturating_sub(amount);
        }
        self.total_supply = self.total_supply.saturating_sub(amount);
        self.prune(to);
    }

    /// Reverse a successful `burn`
    pub(crate) fn unwind_burn(&mut self, from: &AccountId, amount: u128) {
        *self.balances.entry(from.clone()).or_insert(0) += amount;
        self.total_supply = self.total_supply.saturating_add(amount);
        self.prune(from);
    }

    /// sum(balances) == total_supply
    pub fn is_consistent(&self) -> bool {
        let mut sum: u128 = 0;
        for balance in self.balances.values() {
            match sum.checked_add(*balance) {
                Some(next) => sum = next,
                None => return false,
            }
        }
        sum == self.total_supply
    }

    fn prune(&mut self, account: &AccountId) {
        if self.balances.get(account) == Some(&0) {
            self.balances.remove(account);
        }
    }
}
