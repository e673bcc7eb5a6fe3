//! Identities, swap direction and event records

use core::fmt;

use serde::{Deserialize, Serialize};

/// Identity of an account that holds assets or claims
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identity of one of the two pooled assets
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Which asset the trader sells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sell A, receive B
    AToB,
    /// Sell B, receive A
    BToA,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AToB => f.write_str("A->B"),
            Direction::BToA => f.write_str("B->A"),
        }
    }
}

/// Records emitted by committed operations, in commit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    LiquidityAdded {
        provider: AccountId,
        amount_a: u128,
        amount_b: u128,
        claims_minted: u128,
    },
    LiquidityRemoved {
        provider: AccountId,
        amount_a: u128,
        amount_b: u128,
        claims_burned: u128,
    },
    Swap {
        trader: AccountId,
        amount_in: u128,
        amount_out: u128,
        direction: Direction,
    },
    ClaimsTransferred {
        from: AccountId,
        to: AccountId,
        amount: u128,
    },
}
