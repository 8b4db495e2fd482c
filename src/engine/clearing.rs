//! Close-time clearing: select winning bids lowest-rate-first up to the debt
//! cap, enforce the two-thirds subscription threshold, and fix the offering's
//! raised/obligation totals.

use super::results::{ClearingReport, EngineError};
use crate::events::{
    EventCollector, EventPayload, OfferingCanceledEvent, OfferingClosedEvent, OrderAcceptedEvent,
    OrderPartiallyAcceptedEvent, OrderRejectedEvent, RejectReason,
};
use crate::offering::{Offering, OfferingState};
use crate::order::{ClearingKey, Order, OrderState};
use crate::types::{Money, OrderId, Timestamp};

/// Per-order allocation, staged before any state is touched.
#[derive(Debug, Clone, Copy)]
enum Allocation {
    Accept { obligation: Money },
    PartialAccept { accept: Money, remainder: Money },
    Reject,
}

/// Run the clearing for one offering over its pending bids.
///
/// `orders` must be exactly the offering's pending orders; they are mutated in
/// place and a remainder sibling (id `next_order_id`) is appended on a partial
/// fill. On `InsufficientSubscription` the committed effect is the
/// cancellation itself: every bid `Rejected`, the offering `Canceled`. Every
/// other error commits nothing.
pub fn clear<O: Offering>(
    offering: &mut O,
    orders: &mut Vec<Order>,
    now: Timestamp,
    next_order_id: OrderId,
    events: &mut EventCollector,
) -> Result<ClearingReport, EngineError> {
    let from = offering.state();
    if !from.can_transition(OfferingState::Closed) {
        return Err(crate::offering::OfferingError::InvalidTransition {
            id: offering.id(),
            from,
            to: OfferingState::Closed,
        }
        .into());
    }
    if now < offering.closes_at() {
        return Err(EngineError::NotYetClosable {
            closes_at: offering.closes_at(),
            now,
        });
    }
    for order in orders.iter() {
        if order.state != OrderState::Pending {
            return Err(crate::order::OrderError::NotPending(order.id).into());
        }
        if order.offering_id != offering.id() {
            return Err(crate::order::OrderError::WrongOffering {
                id: order.id,
                actual: order.offering_id,
                expected: offering.id(),
            }
            .into());
        }
    }

    // stage every decision first: an arithmetic failure below must leave the
    // offering and its orders exactly as they came in.
    let mut priority: Vec<usize> = (0..orders.len()).collect();
    priority.sort_by_key(|&i| ClearingKey::of(&orders[i]));

    let mut debt_remaining = offering.debt_cap();
    let mut total_raised = Money::ZERO;
    let mut total_obligation = Money::ZERO;
    let mut allocations: Vec<(usize, Allocation)> = Vec::with_capacity(priority.len());

    for &i in &priority {
        let order = &orders[i];
        if debt_remaining.is_zero() {
            allocations.push((i, Allocation::Reject));
            continue;
        }

        let accept = order.amount.min(debt_remaining);
        let interest = accept.mul_div_floor(
            order.interest_rate,
            Money::from(crate::order::RATE_DIVISOR),
        )?;
        let obligation = accept.checked_add(interest)?;
        total_raised = total_raised.checked_add(accept)?;
        total_obligation = total_obligation.checked_add(obligation)?;

        if accept == order.amount {
            debt_remaining = debt_remaining.checked_sub(accept)?;
            allocations.push((i, Allocation::Accept { obligation }));
        } else {
            let remainder = order.amount.checked_sub(accept)?;
            debt_remaining = Money::ZERO;
            allocations.push((i, Allocation::PartialAccept { accept, remainder }));
        }
    }

    // subscription threshold: at least two thirds of the cap, or the whole
    // raise is off and every bid is refunded.
    let required = offering
        .debt_cap()
        .checked_mul(Money::from(2))?
        .checked_div(Money::from(3))?;
    if total_raised < required {
        for order in orders.iter_mut() {
            order.transition(OrderState::Rejected, now)?;
            events.record(
                now,
                EventPayload::OrderRejected(OrderRejectedEvent {
                    offering_id: offering.id(),
                    order_id: order.id,
                    investor: order.investor,
                    amount: order.amount,
                    reason: RejectReason::InsufficientSubscription,
                }),
            );
        }
        offering.try_transition(OfferingState::Canceled, now)?;
        events.record(
            now,
            EventPayload::OfferingCanceled(OfferingCanceledEvent {
                offering_id: offering.id(),
                required,
                raised: total_raised,
            }),
        );
        return Err(EngineError::InsufficientSubscription {
            required,
            got: total_raised,
        });
    }

    // commit, in clearing priority order.
    let mut report = ClearingReport {
        offering_id: offering.id(),
        total_raised,
        total_obligation,
        accepted: Vec::new(),
        partially_accepted: None,
        rejected: Vec::new(),
        remainder: None,
    };

    let mut sibling: Option<Order> = None;
    for (i, allocation) in allocations {
        match allocation {
            Allocation::Accept { obligation } => {
                orders[i].transition(OrderState::Accepted, now)?;
                events.record(
                    now,
                    EventPayload::OrderAccepted(OrderAcceptedEvent {
                        offering_id: offering.id(),
                        order_id: orders[i].id,
                        investor: orders[i].investor,
                        amount: orders[i].amount,
                        obligation,
                    }),
                );
                report.accepted.push(orders[i].id);
            }
            Allocation::PartialAccept { accept, remainder } => {
                // the unaccepted remainder becomes a new sibling order so the
                // refund is a plain rejected-order refund; the original keeps
                // its submission timestamp and shrinks to the accepted amount.
                let mut rest = Order::new(
                    next_order_id,
                    orders[i].offering_id,
                    orders[i].investor,
                    remainder,
                    orders[i].interest_rate,
                    orders[i].created_at,
                )?;
                rest.transition(OrderState::Rejected, now)?;

                orders[i].amount = accept;
                orders[i].transition(OrderState::PartiallyAccepted, now)?;

                events.record(
                    now,
                    EventPayload::OrderPartiallyAccepted(OrderPartiallyAcceptedEvent {
                        offering_id: offering.id(),
                        order_id: orders[i].id,
                        investor: orders[i].investor,
                        accepted_amount: accept,
                        remainder_order_id: rest.id,
                        remainder_amount: remainder,
                    }),
                );
                events.record(
                    now,
                    EventPayload::OrderRejected(OrderRejectedEvent {
                        offering_id: offering.id(),
                        order_id: rest.id,
                        investor: rest.investor,
                        amount: rest.amount,
                        reason: RejectReason::CapExhausted,
                    }),
                );

                report.partially_accepted = Some(orders[i].id);
                report.remainder = Some(rest.id);
                sibling = Some(rest);
            }
            Allocation::Reject => {
                orders[i].transition(OrderState::Rejected, now)?;
                events.record(
                    now,
                    EventPayload::OrderRejected(OrderRejectedEvent {
                        offering_id: offering.id(),
                        order_id: orders[i].id,
                        investor: orders[i].investor,
                        amount: orders[i].amount,
                        reason: RejectReason::CapExhausted,
                    }),
                );
                report.rejected.push(orders[i].id);
            }
        }
    }
    if let Some(rest) = sibling {
        orders.push(rest);
    }

    // write-once totals, fixed exactly at Ongoing -> Closed.
    offering.set_totals(total_raised, total_obligation);
    offering.try_transition(OfferingState::Closed, now)?;
    events.record(
        now,
        EventPayload::OfferingClosed(OfferingClosedEvent {
            offering_id: offering.id(),
            total_raised,
            total_obligation,
        }),
    );

    Ok(report)
}
