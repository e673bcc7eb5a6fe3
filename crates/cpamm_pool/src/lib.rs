//! Constant product liquidity pool for a single asset pair
//!
//! The pool tracks two reserves and a book of liquidity claims, prices swaps
//! with the x·y=k formula minus a fixed input fee, and delegates the actual
//! movement of assets to an [`AssetLedger`].
//!
//! Every mutating operation is all-or-nothing: claims, reserves and ledger
//! transfers either all take effect or the pool is left exactly as it was.
//! Operations take `&mut self`, so a ledger cannot call back into the pool
//! mid-operation; [`SharedPool`] serializes access across threads.

#![forbid(unsafe_code)]

pub mod claims;
pub mod ledger;
pub mod pool;
pub mod shared;
pub mod types;

pub use claims::ClaimsLedger;
pub use ledger::{AssetLedger, InMemoryLedger, LedgerError};
pub use pool::Pool;
pub use shared::SharedPool;
pub use types::{AccountId, AssetId, Direction, PoolEvent};

pub use cpamm_math::{FeeRate, MathError, DEFAULT_FEE, SCALE};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Zero or otherwise disallowed amount argument
    #[error("invalid amount")]
    InvalidAmount,

    /// Withdrawal or claim move exceeds the caller's claim balance
    #[error("insufficient claims")]
    InsufficientClaims,

    /// Pricing against an empty reserve
    #[error("pool reserve is zero")]
    ZeroReserve,

    /// The asset ledger rejected a transfer
    #[error("asset transfer failed: {0}")]
    TransferFailure(#[from] LedgerError),

    /// Result not representable in 128 bits
    #[error("arithmetic overflow")]
    Overflow,

    /// Both sides of the pair name the same asset
    #[error("pool assets must differ")]
    SameAsset,

    /// A thread panicked while holding the pool lock
    #[error("pool lock poisoned")]
    LockPoisoned,
}

impl From<MathError> for PoolError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InvalidAmount | MathError::Malformed => PoolError::InvalidAmount,
            MathError::DivisionByZero => PoolError::ZeroReserve,
            MathError::Overflow => PoolError::Overflow,
        }
    }
}

pub type Result<T> = core::result::Result<T, PoolError>;
