//! cpamm math - integer fixed-point arithmetic for the constant product pool
//!
//! Every quantity is an unsigned integer scaled by 10^18. Products of two
//! reserve-sized values are formed in 256 bits and floored on division, so no
//! precision is lost to an early divide and nothing silently wraps.

#![forbid(unsafe_code)]

pub mod math;
pub mod units;

pub use math::{
    initial_claims, isqrt, mul_div, pro_rata_share, proportional_claims, quote_output, spot_price,
    U256,
};
pub use units::{format_units, parse_units};

/// Number of fractional decimal digits carried by every quantity
pub const DECIMALS: u32 = 18;

/// Fixed-point unit (1e18)
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Fraction of swap input retained by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRate {
    pub numerator: u128,
    pub denominator: u128,
}

impl FeeRate {
    /// Portion of the input that is priced against the curve (`denominator - numerator`)
    pub fn retained_complement(&self) -> u128 {
        self.denominator - self.numerator
    }
}

/// 0.3% swap fee
pub const DEFAULT_FEE: FeeRate = FeeRate {
    numerator: 3,
    denominator: 1_000,
};

/// Error types for pool arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// Zero amount where a positive one is required
    #[error("amount must be greater than zero")]
    InvalidAmount,
    /// Division by a zero reserve or zero supply
    #[error("division by zero")]
    DivisionByZero,
    /// Result does not fit in 128 bits
    #[error("arithmetic overflow")]
    Overflow,
    /// Decimal text could not be parsed as an 18-decimal quantity
    #[error("malformed decimal amount")]
    Malformed,
}

pub type Result<T> = core::result::Result<T, MathError>;
