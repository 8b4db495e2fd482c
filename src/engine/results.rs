// 5.0.1: result types and errors for engine operations.

use crate::offering::OfferingError;
use crate::order::OrderError;
use crate::types::{Money, MoneyError, OfferingId, OrderId, Timestamp};
use alloy_primitives::Address;

/// Outcome of a successful clearing: the offering closed funded.
/// The mutated offering and orders carry the authoritative state; this report
/// summarizes it for the caller's persistence and refund logic.
#[derive(Debug, Clone)]
pub struct ClearingReport {
    pub offering_id: OfferingId,
    pub total_raised: Money,
    pub total_obligation: Money,
    /// Fully accepted orders, in clearing priority order.
    pub accepted: Vec<OrderId>,
    /// The one order shrunk to fit the cap, if any.
    pub partially_accepted: Option<OrderId>,
    /// Rejected orders (cap exhausted), in clearing priority order.
    pub rejected: Vec<OrderId>,
    /// The freshly created sibling order holding a partial fill's remainder.
    pub remainder: Option<OrderId>,
}

/// What one settled order is owed: principal + floor(principal * rate / 100).
#[derive(Debug, Clone)]
pub struct Payout {
    pub order_id: OrderId,
    pub investor: Address,
    pub principal: Money,
    pub interest: Money,
    pub total: Money,
}

#[derive(Debug, Clone)]
pub struct SettlementReport {
    pub offering_id: OfferingId,
    pub total_obligation: Money,
    pub payouts: Vec<Payout>,
}

/// One winner's slice of the executed collateral, pro-rata by final obligation.
#[derive(Debug, Clone)]
pub struct CollateralShare {
    pub order_id: OrderId,
    pub investor: Address,
    pub obligation: Money,
    pub share: Money,
}

#[derive(Debug, Clone)]
pub struct LiquidationReport {
    pub offering_id: OfferingId,
    pub collateral_amount: Money,
    pub distributed: Money,
    /// Floor-division remainder. Never redistributed by the engine; the caller
    /// accounts for it.
    pub dust: Money,
    pub shares: Vec<CollateralShare>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Offering cannot close before {closes_at}, now is {now}")]
    NotYetClosable { closes_at: Timestamp, now: Timestamp },

    #[error("Maturity {matures_at} has passed, now is {now}")]
    MaturityPassed { matures_at: Timestamp, now: Timestamp },

    #[error("Maturity {matures_at} not reached, now is {now}")]
    MaturityNotReached { matures_at: Timestamp, now: Timestamp },

    #[error("Insufficient subscription: required {required}, got {got}")]
    InsufficientSubscription { required: Money, got: Money },

    #[error("Deposit below total obligation: required {required}, got {got}")]
    InsufficientDeposit { required: Money, got: Money },

    #[error("Only the offering creator may settle: expected {expected}, got {got}")]
    NotCreator { expected: Address, got: Address },

    #[error("Offering {0:?} has no winning orders to distribute collateral to")]
    NoWinningOrders(OfferingId),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] OfferingError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] MoneyError),
}
