//! Order types and the per-offering order book.
//!
//! An order is a sealed interest-rate bid: principal plus the yearly rate the
//! investor asks for. Bids collect in an [`OrderBook`] while the offering is
//! open; the book's iteration order is the clearing priority (cheapest capital
//! first) used at close time.

use crate::offering::Offering;
use crate::types::{Money, MoneyError, OfferingId, OrderId, Timestamp};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Rates are integer percentage points: interest = floor(amount * rate / 100).
pub const RATE_DIVISOR: u64 = 100;

/// Order lifecycle. An order is immutable once submitted except for the state
/// transitions below and the amount shrink on partial acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    Accepted,
    PartiallyAccepted,
    Rejected,
    Settled,
    SettledByCollateral,
    Cancelled,
}

impl OrderState {
    /// Accepted or partially accepted: the order won the clearing and is owed
    /// principal + interest.
    pub fn is_winning(&self) -> bool {
        matches!(self, OrderState::Accepted | OrderState::PartiallyAccepted)
    }

    /// The complete transition table, mirrored from the offering lifecycle.
    pub fn can_transition(self, next: OrderState) -> bool {
        matches!(
            (self, next),
            (OrderState::Pending, OrderState::Accepted)
                | (OrderState::Pending, OrderState::PartiallyAccepted)
                | (OrderState::Pending, OrderState::Rejected)
                | (OrderState::Pending, OrderState::Cancelled)
                | (OrderState::Accepted, OrderState::Settled)
                | (OrderState::Accepted, OrderState::SettledByCollateral)
                | (OrderState::PartiallyAccepted, OrderState::Settled)
                | (OrderState::PartiallyAccepted, OrderState::SettledByCollateral)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Order amount cannot be zero")]
    ZeroAmount,

    #[error("Order interest rate cannot be zero")]
    ZeroRate,

    #[error("Invalid investor address")]
    InvalidInvestor,

    #[error("Order {0:?} not found")]
    NotFound(OrderId),

    #[error("Order {0:?} already in the book")]
    Duplicate(OrderId),

    #[error("Order {0:?} is not pending")]
    NotPending(OrderId),

    #[error("Order {id:?} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: OrderId,
        from: OrderState,
        to: OrderState,
    },

    #[error("Rate {rate} exceeds offering cap {cap}")]
    RateAboveCap { rate: Money, cap: Money },

    #[error("Order {id:?} belongs to offering {actual:?}, not {expected:?}")]
    WrongOffering {
        id: OrderId,
        actual: OfferingId,
        expected: OfferingId,
    },

    #[error("Bidding closed at {closes_at}, now is {now}")]
    BiddingClosed { closes_at: Timestamp, now: Timestamp },

    #[error("Order {0:?} can only be cancelled by its investor")]
    NotOrderOwner(OrderId),
}

/// One investor bid against an offering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub offering_id: OfferingId,
    pub investor: Address,
    pub amount: Money,
    pub interest_rate: Money,
    pub state: OrderState,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    pub fn new(
        id: OrderId,
        offering_id: OfferingId,
        investor: Address,
        amount: Money,
        interest_rate: Money,
        created_at: Timestamp,
    ) -> Result<Self, OrderError> {
        if investor == Address::ZERO {
            return Err(OrderError::InvalidInvestor);
        }
        if amount.is_zero() {
            return Err(OrderError::ZeroAmount);
        }
        if interest_rate.is_zero() {
            return Err(OrderError::ZeroRate);
        }
        Ok(Self {
            id,
            offering_id,
            investor,
            amount,
            interest_rate,
            state: OrderState::Pending,
            created_at,
            updated_at: created_at,
        })
    }

    /// Interest owed on the current amount: floor(amount * rate / 100).
    pub fn interest(&self) -> Result<Money, MoneyError> {
        self.amount
            .mul_div_floor(self.interest_rate, Money::from(RATE_DIVISOR))
    }

    /// Principal + interest. Clearing, settlement and liquidation all price an
    /// order through this one function, so the three stay bit-identical.
    pub fn obligation(&self) -> Result<Money, MoneyError> {
        self.amount.checked_add(self.interest()?)
    }

    pub fn is_winning(&self) -> bool {
        self.state.is_winning()
    }

    /// Validated state change; the engines never assign `state` directly.
    pub fn transition(&mut self, next: OrderState, now: Timestamp) -> Result<(), OrderError> {
        if !self.state.can_transition(next) {
            return Err(OrderError::InvalidTransition {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = now;
        Ok(())
    }
}

/// Clearing priority key: rate ascending, amount descending at equal rate
/// (larger bids win ties), order id ascending as the final deterministic
/// tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearingKey {
    pub interest_rate: Money,
    pub amount: Money,
    pub id: OrderId,
}

impl ClearingKey {
    pub fn of(order: &Order) -> Self {
        Self {
            interest_rate: order.interest_rate,
            amount: order.amount,
            id: order.id,
        }
    }
}

impl PartialOrd for ClearingKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClearingKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.interest_rate
            .cmp(&other.interest_rate)
            .then(other.amount.cmp(&self.amount))
            .then(self.id.cmp(&other.id))
    }
}

/// The pending bids of one offering, ordered by clearing priority.
///
/// The book enforces the submission rules (window, rate cap, one entry per
/// order id); once a bid is in, it only leaves by cancellation or by being
/// handed to the clearing engine.
#[derive(Debug, Clone)]
pub struct OrderBook {
    offering_id: OfferingId,
    max_interest_rate: Money,
    closes_at: Timestamp,
    bids: BTreeMap<ClearingKey, Order>,
    index: HashMap<OrderId, ClearingKey>,
}

impl OrderBook {
    pub fn new(offering_id: OfferingId, max_interest_rate: Money, closes_at: Timestamp) -> Self {
        Self {
            offering_id,
            max_interest_rate,
            closes_at,
            bids: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn for_offering<O: Offering>(offering: &O) -> Self {
        Self::new(
            offering.id(),
            offering.max_interest_rate(),
            offering.closes_at(),
        )
    }

    pub fn offering_id(&self) -> OfferingId {
        self.offering_id
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    /// Accept a pending bid into the book.
    pub fn submit(&mut self, order: Order, now: Timestamp) -> Result<(), OrderError> {
        if now >= self.closes_at {
            return Err(OrderError::BiddingClosed {
                closes_at: self.closes_at,
                now,
            });
        }
        if order.offering_id != self.offering_id {
            return Err(OrderError::WrongOffering {
                id: order.id,
                actual: order.offering_id,
                expected: self.offering_id,
            });
        }
        if order.state != OrderState::Pending {
            return Err(OrderError::NotPending(order.id));
        }
        if order.interest_rate > self.max_interest_rate {
            return Err(OrderError::RateAboveCap {
                rate: order.interest_rate,
                cap: self.max_interest_rate,
            });
        }
        if self.index.contains_key(&order.id) {
            return Err(OrderError::Duplicate(order.id));
        }
        let key = ClearingKey::of(&order);
        self.index.insert(order.id, key);
        self.bids.insert(key, order);
        Ok(())
    }

    /// Withdraw a pending bid before the close. Only the submitting investor
    /// may cancel; the returned order is `Cancelled` so the caller can refund.
    pub fn cancel(
        &mut self,
        order_id: OrderId,
        investor: Address,
        now: Timestamp,
    ) -> Result<Order, OrderError> {
        if now >= self.closes_at {
            return Err(OrderError::BiddingClosed {
                closes_at: self.closes_at,
                now,
            });
        }
        let key = self
            .index
            .get(&order_id)
            .copied()
            .ok_or(OrderError::NotFound(order_id))?;
        let owner = self
            .bids
            .get(&key)
            .map(|o| o.investor)
            .ok_or(OrderError::NotFound(order_id))?;
        if owner != investor {
            return Err(OrderError::NotOrderOwner(order_id));
        }
        self.index.remove(&order_id);
        let mut order = self.bids.remove(&key).ok_or(OrderError::NotFound(order_id))?;
        order.transition(OrderState::Cancelled, now)?;
        Ok(order)
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.index.get(&order_id).and_then(|key| self.bids.get(key))
    }

    /// Bids in clearing priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.bids.values()
    }

    /// Total principal currently bid.
    pub fn total_pending(&self) -> Result<Money, MoneyError> {
        self.bids
            .values()
            .try_fold(Money::ZERO, |acc, o| acc.checked_add(o.amount))
    }

    /// Hand the bids to the clearing engine, in clearing priority order.
    pub fn into_orders(self) -> Vec<Order> {
        self.bids.into_values().collect()
    }
}
