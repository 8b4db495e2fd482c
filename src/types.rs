// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, logical timestamps, and Money. each is a newtype so the compiler catches type mixups.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferingId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

// 1.1: millisecond timestamp. engine operations only ever consume timestamps
// supplied by the caller; now() is a convenience for callers, not the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.2: money: a 256-bit unsigned amount in smallest units (wei-like).
// arithmetic never wraps: every operation is checked and overflow is a hard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(U256);

impl Money {
    pub const ZERO: Money = Money(U256::ZERO);

    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn value(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    pub fn checked_add(self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(MoneyError::Overflow { op: "add" })
    }

    pub fn checked_sub(self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or(MoneyError::Underflow { op: "sub" })
    }

    pub fn checked_mul(self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_mul(other.0)
            .map(Money)
            .ok_or(MoneyError::Overflow { op: "mul" })
    }

    pub fn checked_div(self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_div(other.0)
            .map(Money)
            .ok_or(MoneyError::DivisionByZero)
    }

    /// floor(self * num / den). the one rounding rule in this domain:
    /// interest and pro-rata shares always round down.
    pub fn mul_div_floor(self, num: Money, den: Money) -> Result<Money, MoneyError> {
        self.checked_mul(num)?.checked_div(den)
    }
}

impl From<u64> for Money {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for Money {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Arithmetic overflow in {op}")]
    Overflow { op: &'static str },

    #[error("Arithmetic underflow in {op}")]
    Underflow { op: &'static str },

    #[error("Division by zero")]
    DivisionByZero,
}
