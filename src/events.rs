// 4.0: every state change produces an event. used for audit trails and for the
// host application to trigger the external transfers (refunds, repayments,
// collateral shares) this engine only computes. the EventPayload enum lists
// all event types.

use crate::types::{Money, OfferingId, OrderId, Timestamp};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // clearing events
    OrderAccepted(OrderAcceptedEvent),
    OrderPartiallyAccepted(OrderPartiallyAcceptedEvent),
    OrderRejected(OrderRejectedEvent),
    OfferingClosed(OfferingClosedEvent),
    OfferingCanceled(OfferingCanceledEvent),

    // settlement events
    PayoutDue(PayoutDueEvent),
    OfferingSettled(OfferingSettledEvent),

    // liquidation events
    CollateralShareAssigned(CollateralShareAssignedEvent),
    CollateralExecuted(CollateralExecutedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAcceptedEvent {
    pub offering_id: OfferingId,
    pub order_id: OrderId,
    pub investor: Address,
    pub amount: Money,
    pub obligation: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPartiallyAcceptedEvent {
    pub offering_id: OfferingId,
    pub order_id: OrderId,
    pub investor: Address,
    pub accepted_amount: Money,
    pub remainder_order_id: OrderId,
    pub remainder_amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRejectedEvent {
    pub offering_id: OfferingId,
    pub order_id: OrderId,
    pub investor: Address,
    pub amount: Money,
    pub reason: RejectReason,
}

/// Why a bid was rejected. A refund is due either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The debt cap was already filled by cheaper bids.
    CapExhausted,
    /// The whole offering fell below the subscription threshold.
    InsufficientSubscription,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferingClosedEvent {
    pub offering_id: OfferingId,
    pub total_raised: Money,
    pub total_obligation: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferingCanceledEvent {
    pub offering_id: OfferingId,
    pub required: Money,
    pub raised: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutDueEvent {
    pub offering_id: OfferingId,
    pub order_id: OrderId,
    pub investor: Address,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferingSettledEvent {
    pub offering_id: OfferingId,
    pub total_obligation: Money,
    pub orders_settled: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralShareAssignedEvent {
    pub offering_id: OfferingId,
    pub order_id: OrderId,
    pub investor: Address,
    pub share: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralExecutedEvent {
    pub offering_id: OfferingId,
    pub distributed: Money,
    pub dust: Money,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

/// Collects engine events with sequential ids. The caller passes one into each
/// engine operation and drains it afterwards.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
        }
    }

    pub fn record(&mut self, at: Timestamp, payload: EventPayload) {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push(Event::new(id, at, payload));
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
