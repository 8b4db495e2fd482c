//! On-time repayment: the creator deposits principal + interest before
//! maturity and every winning order is paid out.

use super::results::{EngineError, Payout, SettlementReport};
use crate::events::{EventCollector, EventPayload, OfferingSettledEvent, PayoutDueEvent};
use crate::offering::{Offering, OfferingState};
use crate::order::{Order, OrderState};
use crate::types::{Money, Timestamp};
use alloy_primitives::Address;

/// Settle a closed offering against a repayment deposit.
///
/// Preconditions (all checked before any mutation): the offering is `Closed`,
/// maturity has not passed, the deposit covers the total obligation, and
/// `sender` is the recorded creator. On success every winning order becomes
/// `Settled` and the report lists each payout, recomputed from the order's
/// amount and rate with the same floor rule the clearing used.
pub fn settle<O: Offering>(
    offering: &mut O,
    orders: &mut [Order],
    deposit: Money,
    sender: Address,
    now: Timestamp,
    events: &mut EventCollector,
) -> Result<SettlementReport, EngineError> {
    if now > offering.matures_at() {
        return Err(EngineError::MaturityPassed {
            matures_at: offering.matures_at(),
            now,
        });
    }
    let from = offering.state();
    if !from.can_transition(OfferingState::Settled) {
        return Err(crate::offering::OfferingError::InvalidTransition {
            id: offering.id(),
            from,
            to: OfferingState::Settled,
        }
        .into());
    }
    if deposit < offering.total_obligation() {
        return Err(EngineError::InsufficientDeposit {
            required: offering.total_obligation(),
            got: deposit,
        });
    }
    if sender != offering.creator() {
        return Err(EngineError::NotCreator {
            expected: offering.creator(),
            got: sender,
        });
    }

    // price every winner before touching any state.
    let mut payouts = Vec::new();
    for order in orders.iter().filter(|o| o.is_winning()) {
        let interest = order.interest()?;
        let total = order.amount.checked_add(interest)?;
        payouts.push(Payout {
            order_id: order.id,
            investor: order.investor,
            principal: order.amount,
            interest,
            total,
        });
    }

    for order in orders.iter_mut().filter(|o| o.is_winning()) {
        order.transition(OrderState::Settled, now)?;
    }
    offering.try_transition(OfferingState::Settled, now)?;

    for payout in &payouts {
        events.record(
            now,
            EventPayload::PayoutDue(PayoutDueEvent {
                offering_id: offering.id(),
                order_id: payout.order_id,
                investor: payout.investor,
                amount: payout.total,
            }),
        );
    }
    events.record(
        now,
        EventPayload::OfferingSettled(OfferingSettledEvent {
            offering_id: offering.id(),
            total_obligation: offering.total_obligation(),
            orders_settled: payouts.len(),
        }),
    );

    Ok(SettlementReport {
        offering_id: offering.id(),
        total_obligation: offering.total_obligation(),
        payouts,
    })
}
