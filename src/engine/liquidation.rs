//! Collateral execution after default: maturity has passed without repayment,
//! so the posted collateral is distributed pro-rata across the unpaid winners
//! by their final obligation.

use super::results::{CollateralShare, EngineError, LiquidationReport};
use crate::events::{
    CollateralExecutedEvent, CollateralShareAssignedEvent, EventCollector, EventPayload,
};
use crate::offering::{Offering, OfferingState};
use crate::order::{Order, OrderState};
use crate::types::{Money, Timestamp};

/// Execute the collateral of a defaulted offering. May succeed exactly once.
///
/// Each winner's share is floor(obligation * collateral / total_obligations);
/// the floor remainder is reported as dust and never redistributed. Fails
/// before any mutation if the offering is not `Closed`, maturity has not
/// passed, or there are no winners to distribute to.
pub fn execute_collateral<O: Offering>(
    offering: &mut O,
    orders: &mut [Order],
    now: Timestamp,
    events: &mut EventCollector,
) -> Result<LiquidationReport, EngineError> {
    if now < offering.matures_at() {
        return Err(EngineError::MaturityNotReached {
            matures_at: offering.matures_at(),
            now,
        });
    }
    let from = offering.state();
    if !from.can_transition(OfferingState::CollateralExecuted) {
        return Err(crate::offering::OfferingError::InvalidTransition {
            id: offering.id(),
            from,
            to: OfferingState::CollateralExecuted,
        }
        .into());
    }

    // stage: price every winner, then split the collateral. nothing is
    // written until all shares are known to compute cleanly.
    let mut winners: Vec<(usize, Money)> = Vec::new();
    let mut total_obligations = Money::ZERO;
    for (i, order) in orders.iter().enumerate() {
        if order.is_winning() {
            let obligation = order.obligation()?;
            total_obligations = total_obligations.checked_add(obligation)?;
            winners.push((i, obligation));
        }
    }
    if total_obligations.is_zero() {
        return Err(EngineError::NoWinningOrders(offering.id()));
    }

    let collateral = offering.collateral_amount();
    let mut shares = Vec::with_capacity(winners.len());
    let mut distributed = Money::ZERO;
    for &(i, obligation) in &winners {
        let share = obligation.mul_div_floor(collateral, total_obligations)?;
        distributed = distributed.checked_add(share)?;
        shares.push(CollateralShare {
            order_id: orders[i].id,
            investor: orders[i].investor,
            obligation,
            share,
        });
    }
    let dust = collateral.checked_sub(distributed)?;

    for &(i, _) in &winners {
        orders[i].transition(OrderState::SettledByCollateral, now)?;
    }
    offering.try_transition(OfferingState::CollateralExecuted, now)?;

    for share in &shares {
        events.record(
            now,
            EventPayload::CollateralShareAssigned(CollateralShareAssignedEvent {
                offering_id: offering.id(),
                order_id: share.order_id,
                investor: share.investor,
                share: share.share,
            }),
        );
    }
    events.record(
        now,
        EventPayload::CollateralExecuted(CollateralExecutedEvent {
            offering_id: offering.id(),
            distributed,
            dust,
        }),
    );

    Ok(LiquidationReport {
        offering_id: offering.id(),
        collateral_amount: collateral,
        distributed,
        dust,
        shares,
    })
}
