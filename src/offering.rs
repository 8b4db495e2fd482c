// 3.0: offering entity and lifecycle. an offering is a time-boxed debt raise:
// a creator posts collateral and a debt cap, investors bid until closes_at,
// and the raise either settles by matures_at or the collateral is executed.
// the Offering trait is the seam the engine operations are generic over, so
// host applications can run their own offering rows through the same engine.

use crate::types::{Money, OfferingId, Timestamp};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Offering lifecycle. Canceled, Settled and CollateralExecuted are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferingState {
    Ongoing,
    Closed,
    Canceled,
    Settled,
    CollateralExecuted,
}

impl OfferingState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OfferingState::Canceled | OfferingState::Settled | OfferingState::CollateralExecuted
        )
    }

    /// The complete transition table. Every state change in the engine goes
    /// through this check; there is no other way to move an offering.
    pub fn can_transition(self, next: OfferingState) -> bool {
        matches!(
            (self, next),
            (OfferingState::Ongoing, OfferingState::Closed)
                | (OfferingState::Ongoing, OfferingState::Canceled)
                | (OfferingState::Closed, OfferingState::Settled)
                | (OfferingState::Closed, OfferingState::CollateralExecuted)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OfferingError {
    #[error("Offering {id:?} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: OfferingId,
        from: OfferingState,
        to: OfferingState,
    },

    #[error("Invalid creator address")]
    InvalidCreator,

    #[error("Debt cap cannot be zero")]
    ZeroDebtCap,

    #[error("Max interest rate cannot be zero")]
    ZeroMaxRate,

    #[error("Collateral amount cannot be zero")]
    ZeroCollateral,

    #[error("Offering must close before it matures: closes_at {closes_at}, matures_at {matures_at}")]
    CloseAfterMaturity {
        closes_at: Timestamp,
        matures_at: Timestamp,
    },
}

/// What the engine needs from an offering. Host applications with their own
/// offering rows (different cosmetic fields, same economics) implement this
/// and run through the same clearing, settlement and liquidation code.
pub trait Offering {
    fn id(&self) -> OfferingId;
    fn creator(&self) -> Address;
    fn debt_cap(&self) -> Money;
    fn max_interest_rate(&self) -> Money;
    fn collateral_amount(&self) -> Money;
    fn closes_at(&self) -> Timestamp;
    fn matures_at(&self) -> Timestamp;
    fn state(&self) -> OfferingState;
    fn total_raised(&self) -> Money;
    fn total_obligation(&self) -> Money;

    fn set_state(&mut self, next: OfferingState);
    /// Write-once: called exactly at the Ongoing -> Closed transition.
    fn set_totals(&mut self, raised: Money, obligation: Money);
    fn touch(&mut self, now: Timestamp);

    /// Validated state change. The engines never call set_state directly.
    fn try_transition(&mut self, next: OfferingState, now: Timestamp) -> Result<(), OfferingError> {
        let from = self.state();
        if !from.can_transition(next) {
            return Err(OfferingError::InvalidTransition {
                id: self.id(),
                from,
                to: next,
            });
        }
        self.set_state(next);
        self.touch(now);
        Ok(())
    }
}

/// The canonical offering entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtOffering {
    pub id: OfferingId,
    pub creator: Address,
    pub debt_cap: Money,
    pub max_interest_rate: Money,
    pub collateral_amount: Money,
    pub total_raised: Money,
    pub total_obligation: Money,
    pub state: OfferingState,
    pub closes_at: Timestamp,
    pub matures_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DebtOffering {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OfferingId,
        creator: Address,
        debt_cap: Money,
        max_interest_rate: Money,
        collateral_amount: Money,
        closes_at: Timestamp,
        matures_at: Timestamp,
        created_at: Timestamp,
    ) -> Result<Self, OfferingError> {
        if creator == Address::ZERO {
            return Err(OfferingError::InvalidCreator);
        }
        if debt_cap.is_zero() {
            return Err(OfferingError::ZeroDebtCap);
        }
        if max_interest_rate.is_zero() {
            return Err(OfferingError::ZeroMaxRate);
        }
        if collateral_amount.is_zero() {
            return Err(OfferingError::ZeroCollateral);
        }
        if closes_at >= matures_at {
            return Err(OfferingError::CloseAfterMaturity {
                closes_at,
                matures_at,
            });
        }
        Ok(Self {
            id,
            creator,
            debt_cap,
            max_interest_rate,
            collateral_amount,
            total_raised: Money::ZERO,
            total_obligation: Money::ZERO,
            state: OfferingState::Ongoing,
            closes_at,
            matures_at,
            created_at,
            updated_at: created_at,
        })
    }
}

impl Offering for DebtOffering {
    fn id(&self) -> OfferingId {
        self.id
    }

    fn creator(&self) -> Address {
        self.creator
    }

    fn debt_cap(&self) -> Money {
        self.debt_cap
    }

    fn max_interest_rate(&self) -> Money {
        self.max_interest_rate
    }

    fn collateral_amount(&self) -> Money {
        self.collateral_amount
    }

    fn closes_at(&self) -> Timestamp {
        self.closes_at
    }

    fn matures_at(&self) -> Timestamp {
        self.matures_at
    }

    fn state(&self) -> OfferingState {
        self.state
    }

    fn total_raised(&self) -> Money {
        self.total_raised
    }

    fn total_obligation(&self) -> Money {
        self.total_obligation
    }

    fn set_state(&mut self, next: OfferingState) {
        self.state = next;
    }

    fn set_totals(&mut self, raised: Money, obligation: Money) {
        self.total_raised = raised;
        self.total_obligation = obligation;
    }

    fn touch(&mut self, now: Timestamp) {
        self.updated_at = now;
    }
}
