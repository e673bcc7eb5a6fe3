//! Thread-safe handle serializing every operation on one pool

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{AccountId, AssetLedger, Direction, Pool, PoolError, PoolEvent, Result};

/// Cloneable handle to a pool guarded by a single mutex
///
/// Each call holds the lock for the whole operation, including its ledger
/// transfers, so no caller can observe a partially applied update.
#[derive(Debug)]
pub struct SharedPool<L: AssetLedger> {
    inner: Arc<Mutex<Pool<L>>>,
}

impl<L: AssetLedger> Clone for SharedPool<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: AssetLedger> SharedPool<L> {
    pub fn new(pool: Pool<L>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Pool<L>>> {
        self.inner.lock().map_err(|_| PoolError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the pool
    pub fn with<T>(&self, f: impl FnOnce(&mut Pool<L>) -> Result<T>) -> Result<T> {
        let mut pool = self.lock()?;
        f(&mut pool)
    }

    pub fn add_liquidity(&self, amount_a: u128, amount_b: u128, provider: &AccountId) -> Result<u128> {
        self.with(|pool| pool.add_liquidity(amount_a, amount_b, provider))
    }

    pub fn remove_liquidity(&self, claim_amount: u128, owner: &AccountId) -> Result<(u128, u128)> {
        self.with(|pool| pool.remove_liquidity(claim_amount, owner))
    }

    pub fn swap(&self, amount_in: u128, direction: Direction, trader: &AccountId) -> Result<u128> {
        self.with(|pool| pool.swap(amount_in, direction, trader))
    }

    pub fn transfer_claims(&self, from: &AccountId, to: &AccountId, amount: u128) -> Result<()> {
        self.with(|pool| pool.transfer_claims(from, to, amount))
    }

    pub fn reserves(&self) -> Result<(u128, u128)> {
        Ok(self.lock()?.reserves())
    }

    pub fn price(&self) -> Result<u128> {
        self.lock()?.price()
    }

    pub fn claims_of(&self, account: &AccountId) -> Result<u128> {
        Ok(self.lock()?.claims_of(account))
    }

    pub fn quote(&self, amount_in: u128, direction: Direction) -> Result<u128> {
        self.lock()?.quote(amount_in, direction)
    }

    pub fn drain_events(&self) -> Result<Vec<PoolEvent>> {
        Ok(self.lock()?.drain_events())
    }

    pub fn check_conservation(&self) -> Result<bool> {
        Ok(self.lock()?.check_conservation())
    }
}
