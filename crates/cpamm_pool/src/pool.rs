//! Pool state and operations

use cpamm_math::{self as math, FeeRate, DEFAULT_FEE};
use log::{debug, error, info, warn};

use crate::{
    AccountId, AssetId, AssetLedger, ClaimsLedger, Direction, LedgerError, PoolError, PoolEvent,
    Result,
};

/// One asset movement requested by an operation
#[derive(Debug, Clone, PartialEq, Eq)]
enum Transfer {
    In {
        asset: AssetId,
        from: AccountId,
        amount: u128,
    },
    Out {
        asset: AssetId,
        to: AccountId,
        amount: u128,
    },
}

/// Constant product pool for one asset pair
///
/// # Invariants
/// - `claims.total_supply()` equals the sum of every holder's balance
/// - Reserves are non-zero whenever claims are outstanding
/// - `reserve_a · reserve_b` never decreases across a swap
/// - The ledger's pool balance of each asset covers the tracked reserve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool<L: AssetLedger> {
    asset_a: AssetId,
    asset_b: AssetId,
    reserve_a: u128,
    reserve_b: u128,
    claims: ClaimsLedger,
    fee: FeeRate,
    ledger: L,
    events: Vec<PoolEvent>,
}

// ============================================================================
// Construction and Queries
// ============================================================================

impl<L: AssetLedger> Pool<L> {
    /// Create an empty pool permanently bound to `asset_a` and `asset_b`
    pub fn new(asset_a: AssetId, asset_b: AssetId, ledger: L) -> Result<Self> {
        if asset_a == asset_b {
            return Err(PoolError::SameAsset);
        }
        Ok(Self {
            asset_a,
            asset_b,
            reserve_a: 0,
            reserve_b: 0,
            claims: ClaimsLedger::new(),
            fee: DEFAULT_FEE,
            ledger,
            events: Vec::new(),
        })
    }

    pub fn assets(&self) -> (&AssetId, &AssetId) {
        (&self.asset_a, &self.asset_b)
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.fee
    }

    /// Current `(reserve_a, reserve_b)`
    pub fn reserves(&self) -> (u128, u128) {
        (self.reserve_a, self.reserve_b)
    }

    /// Price of one A in B, scaled by SCALE
    pub fn price(&self) -> Result<u128> {
        if self.reserve_a == 0 {
            return Err(PoolError::ZeroReserve);
        }
        Ok(math::spot_price(self.reserve_a, self.reserve_b)?)
    }

    /// Claim balance of `account`, zero when unknown
    pub fn claims_of(&self, account: &AccountId) -> u128 {
        self.claims.balance_of(account)
    }

    pub fn total_claims(&self) -> u128 {
        self.claims.total_supply()
    }

    pub fn claims(&self) -> &ClaimsLedger {
        &self.claims
    }

    /// Output for `amount_in` against arbitrary reserves at this pool's fee
    pub fn quote_output(&self, amount_in: u128, reserve_in: u128, reserve_out: u128) -> Result<u128> {
        Ok(math::quote_output(amount_in, reserve_in, reserve_out, self.fee)?)
    }

    /// Output a swap of `amount_in` would receive right now
    pub fn quote(&self, amount_in: u128, direction: Direction) -> Result<u128> {
        let (reserve_in, reserve_out) = self.oriented_reserves(direction);
        if reserve_in == 0 || reserve_out == 0 {
            return Err(PoolError::ZeroReserve);
        }
        self.quote_output(amount_in, reserve_in, reserve_out)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct access to the backing ledger, e.g. to fund accounts
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// Events emitted so far, oldest first
    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check claims and reserve bookkeeping against each other and the ledger
    pub fn check_conservation(&self) -> bool {
        if !self.claims.is_consistent() {
            return false;
        }
        if self.claims.total_supply() > 0 && (self.reserve_a == 0 || self.reserve_b == 0) {
            return false;
        }
        self.ledger.pool_balance(&self.asset_a) >= self.reserve_a
            && self.ledger.pool_balance(&self.asset_b) >= self.reserve_b
    }

    fn oriented_reserves(&self, direction: Direction) -> (u128, u128) {
        match direction {
            Direction::AToB => (self.reserve_a, self.reserve_b),
            Direction::BToA => (self.reserve_b, self.reserve_a),
        }
    }
}

// ============================================================================
// Liquidity Operations
// ============================================================================

impl<L: AssetLedger> Pool<L> {
    /// Deposit both assets and receive claims
    ///
    /// The first deposit mints `floor(sqrt(a · b / SCALE))` and sets the
    /// price; later deposits mint the smaller of the two proportional shares.
    /// A deposit small enough to floor to zero claims is still accepted.
    pub fn add_liquidity(
        &mut self,
        amount_a: u128,
        amount_b: u128,
        provider: &AccountId,
    ) -> Result<u128> {
        if amount_a == 0 || amount_b == 0 {
            return Err(PoolError::InvalidAmount);
        }

        let total = self.claims.total_supply();
        let minted = if total == 0 {
            math::initial_claims(amount_a, amount_b)?
        } else {
            math::proportional_claims(amount_a, amount_b, self.reserve_a, self.reserve_b, total)?
        };
        let new_reserve_a = self.reserve_a.checked_add(amount_a).ok_or(PoolError::Overflow)?;
        let new_reserve_b = self.reserve_b.checked_add(amount_b).ok_or(PoolError::Overflow)?;
        debug!(
            "add_liquidity: provider={} amount_a={} amount_b={} minted={} total={}",
            provider, amount_a, amount_b, minted, total
        );
        if minted == 0 {
            warn!("add_liquidity: deposit from {} mints no claims", provider);
        }

        self.claims.mint(provider, minted)?;
        let transfers = [
            Transfer::In {
                asset: self.asset_a.clone(),
                from: provider.clone(),
                amount: amount_a,
            },
            Transfer::In {
                asset: self.asset_b.clone(),
                from: provider.clone(),
                amount: amount_b,
            },
        ];
        if let Err(err) = self.settle(&transfers) {
            self.claims.unwind_mint(provider, minted);
            return Err(err);
        }

        self.reserve_a = new_reserve_a;
        self.reserve_b = new_reserve_b;
        self.emit(PoolEvent::LiquidityAdded {
            provider: provider.clone(),
            amount_a,
            amount_b,
            claims_minted: minted,
        });
        Ok(minted)
    }

    /// Burn claims and receive the pro-rata share of both reserves
    pub fn remove_liquidity(
        &mut self,
        claim_amount: u128,
        owner: &AccountId,
    ) -> Result<(u128, u128)> {
        if claim_amount == 0 {
            return Err(PoolError::InvalidAmount);
        }
        if self.claims.balance_of(owner) < claim_amount {
            return Err(PoolError::InsufficientClaims);
        }

        let total = self.claims.total_supply();
        let amount_a = math::pro_rata_share(claim_amount, self.reserve_a, total)?;
        let amount_b = math::pro_rata_share(claim_amount, self.reserve_b, total)?;
        debug!(
            "remove_liquidity: owner={} claims={} amount_a={} amount_b={} total={}",
            owner, claim_amount, amount_a, amount_b, total
        );

        self.claims.burn(owner, claim_amount)?;
        let transfers = [
            Transfer::Out {
                asset: self.asset_a.clone(),
                to: owner.clone(),
                amount: amount_a,
            },
            Transfer::Out {
                asset: self.asset_b.clone(),
                to: owner.clone(),
                amount: amount_b,
            },
        ];
        if let Err(err) = self.settle(&transfers) {
            self.claims.unwind_burn(owner, claim_amount);
            return Err(err);
        }

        // claim_amount <= total, so each share is bounded by its reserve
        self.reserve_a -= amount_a;
        self.reserve_b -= amount_b;
        self.emit(PoolEvent::LiquidityRemoved {
            provider: owner.clone(),
            amount_a,
            amount_b,
            claims_burned: claim_amount,
        });
        Ok((amount_a, amount_b))
    }

    /// Hand claims to another account without touching reserves
    ///
    /// A transfer to oneself is validated like any other but records no event.
    pub fn transfer_claims(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<()> {
        if amount == 0 {
            return Err(PoolError::InvalidAmount);
        }
        self.claims.move_claims(from, to, amount)?;
        if from == to {
            debug!("transfer_claims: {} sent {} claims to itself", from, amount);
            return Ok(());
        }
        self.emit(PoolEvent::ClaimsTransferred {
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }
}

// ============================================================================
// Swaps
// ============================================================================

impl<L: AssetLedger> Pool<L> {
    /// Sell `amount_in` of one asset for the other
    ///
    /// The fee stays in the input reserve, so the reserve product never
    /// decreases. Tiny inputs may floor to zero output.
    pub fn swap(&mut self, amount_in: u128, direction: Direction, trader: &AccountId) -> Result<u128> {
        if amount_in == 0 {
            return Err(PoolError::InvalidAmount);
        }
        let (reserve_in, reserve_out) = self.oriented_reserves(direction);
        if reserve_in == 0 || reserve_out == 0 {
            return Err(PoolError::ZeroReserve);
        }

        let amount_out = math::quote_output(amount_in, reserve_in, reserve_out, self.fee)?;
        let new_reserve_in = reserve_in.checked_add(amount_in).ok_or(PoolError::Overflow)?;
        // quote_output is strictly below reserve_out when reserve_in > 0
        let new_reserve_out = reserve_out - amount_out;
        debug!(
            "swap: trader={} direction={} amount_in={} amount_out={}",
            trader, direction, amount_in, amount_out
        );

        let (asset_in, asset_out) = match direction {
            Direction::AToB => (self.asset_a.clone(), self.asset_b.clone()),
            Direction::BToA => (self.asset_b.clone(), self.asset_a.clone()),
        };
        let transfers = [
            Transfer::In {
                asset: asset_in,
                from: trader.clone(),
                amount: amount_in,
            },
            Transfer::Out {
                asset: asset_out,
                to: trader.clone(),
                amount: amount_out,
            },
        ];
        self.settle(&transfers)?;

        match direction {
            Direction::AToB => {
                self.reserve_a = new_reserve_in;
                self.reserve_b = new_reserve_out;
            }
            Direction::BToA => {
                self.reserve_b = new_reserve_in;
                self.reserve_a = new_reserve_out;
            }
        }
        self.emit(PoolEvent::Swap {
            trader: trader.clone(),
            amount_in,
            amount_out,
            direction,
        });
        Ok(amount_out)
    }
}

// ============================================================================
// Settlement
// ============================================================================

impl<L: AssetLedger> Pool<L> {
    /// Run the ledger transfers of one operation, all or nothing
    ///
    /// Outbound amounts are checked against the pool balance plus this
    /// operation's inbound amounts before anything moves. If the ledger still
    /// rejects a transfer, the ones already completed are reversed.
    fn settle(&mut self, transfers: &[Transfer]) -> Result<()> {
        for asset in [&self.asset_a, &self.asset_b] {
            let mut inbound: u128 = 0;
            let mut outbound: u128 = 0;
            for transfer in transfers {
                match transfer {
                    Transfer::In { asset: a, amount, .. } if a == asset => {
                        inbound = inbound.saturating_add(*amount);
                    }
                    Transfer::Out { asset: a, amount, .. } if a == asset => {
                        outbound = outbound.saturating_add(*amount);
                    }
                    _ => {}
                }
            }
            let available = self.ledger.pool_balance(asset).saturating_add(inbound);
            if outbound > available {
                let err = LedgerError::PoolBalanceShort {
                    asset: asset.clone(),
                    available,
                    required: outbound,
                };
                warn!("settle: {}", err);
                return Err(PoolError::TransferFailure(err));
            }
        }

        let mut completed: Vec<&Transfer> = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            let outcome = match transfer {
                Transfer::In { amount: 0, .. } | Transfer::Out { amount: 0, .. } => continue,
                Transfer::In { asset, from, amount } => self.ledger.move_in(asset, from, *amount),
                Transfer::Out { asset, to, amount } => self.ledger.move_out(asset, *amount, to),
            };
            if let Err(err) = outcome {
                warn!("settle: transfer rejected: {}", err);
                self.unwind(&completed);
                return Err(PoolError::TransferFailure(err));
            }
            completed.push(transfer);
        }
        Ok(())
    }

    fn unwind(&mut self, completed: &[&Transfer]) {
        for transfer in completed.iter().rev() {
            let outcome = match transfer {
                Transfer::In { asset, from, amount } => self.ledger.refund_in(asset, from, *amount),
                Transfer::Out { asset, to, amount } => self.ledger.reclaim_out(asset, *amount, to),
            };
            if let Err(err) = outcome {
                error!("unwind of {:?} failed, ledger and pool disagree: {}", transfer, err);
            }
        }
    }

    fn emit(&mut self, event: PoolEvent) {
        info!("{:?}", event);
        self.events.push(event);
    }
}
