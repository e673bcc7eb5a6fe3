//! External asset ledger capability
//!
//! The pool never holds assets itself; it asks a ledger to move value between
//! accounts and the pool's external balance. `InMemoryLedger` is the reference
//! implementation used by tests and the CLI.

use std::collections::BTreeMap;

use crate::{AccountId, AssetId};

/// Errors reported by an asset ledger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{owner} holds {available} of {asset}, needs {required}")]
    InsufficientBalance {
        asset: AssetId,
        owner: AccountId,
        available: u128,
        required: u128,
    },

    #[error("{owner} has authorized {allowance} of {asset} for the pool, needs {required}")]
    NotAuthorized {
        asset: AssetId,
        owner: AccountId,
        allowance: u128,
        required: u128,
    },

    #[error("pool holds {available} of {asset}, needs {required}")]
    PoolBalanceShort {
        asset: AssetId,
        available: u128,
        required: u128,
    },

    #[error("balance overflow for {asset}")]
    Overflow { asset: AssetId },
}

/// Trait for pluggable asset ledgers
///
/// Implementers move value on behalf of the pool. Each call either completes
/// or fails without effect; the pool sequences calls and unwinds completed
/// ones when a later call in the same operation fails.
pub trait AssetLedger {
    /// Debit `amount` of `asset` from `owner` and credit the pool
    ///
    /// Fails when `owner` lacks the balance or has not authorized the pool.
    fn move_in(&mut self, asset: &AssetId, owner: &AccountId, amount: u128)
        -> Result<(), LedgerError>;

    /// Debit the pool's `asset` balance and credit `recipient`
    ///
    /// A failure here means the pool's tracked reserves disagree with the
    /// ledger, which is a bookkeeping bug rather than a user error.
    fn move_out(
        &mut self,
        asset: &AssetId,
        amount: u128,
        recipient: &AccountId,
    ) -> Result<(), LedgerError>;

    /// Undo a completed `move_in`: return `amount` to `owner` and restore
    /// the authorization it consumed
    fn refund_in(&mut self, asset: &AssetId, owner: &AccountId, amount: u128)
        -> Result<(), LedgerError>;

    /// Undo a completed `move_out`: take `amount` back from `recipient`
    ///
    /// Needs no authorization from `recipient`; the value only just arrived.
    fn reclaim_out(
        &mut self,
        asset: &AssetId,
        amount: u128,
        recipient: &AccountId,
    ) -> Result<(), LedgerError>;

    /// Pool's externally held balance of `asset`
    fn pool_balance(&self, asset: &AssetId) -> u128;
}

/// Heap-backed ledger with per-account balances and pool authorizations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryLedger {
    balances: BTreeMap<(AssetId, AccountId), u128>,
    allowances: BTreeMap<(AssetId, AccountId), u128>,
    pool: BTreeMap<AssetId, u128>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` of `asset` out of thin air for `account`
    pub fn credit(
        &mut self,
        asset: &AssetId,
        account: &AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let next = self
            .balance_of(asset, account)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow { asset: asset.clone() })?;
        put(&mut self.balances, (asset.clone(), account.clone()), next);
        Ok(())
    }

    /// Authorize the pool to pull up to `amount` of `asset` from `owner`
    ///
    /// `u128::MAX` is an unlimited authorization and is never consumed.
    pub fn approve(&mut self, asset: &AssetId, owner: &AccountId, amount: u128) {
        put(&mut self.allowances, (asset.clone(), owner.clone()), amount);
    }

    pub fn balance_of(&self, asset: &AssetId, account: &AccountId) -> u128 {
        self.balances
            .get(&(asset.clone(), account.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn allowance(&self, asset: &AssetId, owner: &AccountId) -> u128 {
        self.allowances
            .get(&(asset.clone(), owner.clone()))
            .copied()
            .unwrap_or(0)
    }
}

impl AssetLedger for InMemoryLedger {
    fn move_in(
        &mut self,
        asset: &AssetId,
        owner: &AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let allowance = self.allowance(asset, owner);
        if allowance < amount {
            return Err(LedgerError::NotAuthorized {
                asset: asset.clone(),
                owner: owner.clone(),
                allowance,
                required: amount,
            });
        }
        let balance = self.balance_of(asset, owner);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                asset: asset.clone(),
                owner: owner.clone(),
                available: balance,
                required: amount,
            });
        }
        let pool_balance = self
            .pool_balance(asset)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow { asset: asset.clone() })?;

        put(&mut self.balances, (asset.clone(), owner.clone()), balance - amount);
        if allowance != u128::MAX {
            put(&mut self.allowances, (asset.clone(), owner.clone()), allowance - amount);
        }
        put(&mut self.pool, asset.clone(), pool_balance);
        Ok(())
    }

    fn move_out(
        &mut self,
        asset: &AssetId,
        amount: u128,
        recipient: &AccountId,
    ) -> Result<(), LedgerError> {
        let available = self.pool_balance(asset);
        if available < amount {
            return Err(LedgerError::PoolBalanceShort {
                asset: asset.clone(),
                available,
                required: amount,
            });
        }
        let recipient_balance = self
            .balance_of(asset, recipient)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow { asset: asset.clone() })?;

        put(&mut self.pool, asset.clone(), available - amount);
        put(&mut self.balances, (asset.clone(), recipient.clone()), recipient_balance);
        Ok(())
    }

    fn refund_in(
        &mut self,
        asset: &AssetId,
        owner: &AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.move_out(asset, amount, owner)?;
        let allowance = self.allowance(asset, owner);
        if allowance != u128::MAX {
            // Saturate rather than fail: the value is already back with the owner
            put(
                &mut self.allowances,
                (asset.clone(), owner.clone()),
                allowance.saturating_add(amount),
            );
        }
        Ok(())
    }

    fn reclaim_out(
        &mut self,
        asset: &AssetId,
        amount: u128,
        recipient: &AccountId,
    ) -> Result<(), LedgerError> {
        let balance = self.balance_of(asset, recipient);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                asset: asset.clone(),
                owner: recipient.clone(),
                available: balance,
                required: amount,
            });
        }
        let pool_balance = self
            .pool_balance(asset)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow { asset: asset.clone() })?;

        put(&mut self.balances, (asset.clone(), recipient.clone()), balance - amount);
        put(&mut self.pool, asset.clone(), pool_balance);
        Ok(())
    }

    fn pool_balance(&self, asset: &AssetId) -> u128 {
        self.pool.get(asset).copied().unwrap_or(0)
    }
}

/// Store `value`, dropping the entry when it reaches zero
fn put<K: Ord>(map: &mut BTreeMap<K, u128>, key: K, value: u128) {
    if value == 0 {
        map.remove(&key);
    } else {
        map.insert(key, value);
    }
}
