//! End-to-end offering lifecycle scenarios: bid collection through clearing
//! into settlement or collateral execution, and the terminality guarantees.

use alloy_primitives::Address;
use offering_core::*;

fn creator() -> Address {
    Address::repeat_byte(0xc0)
}

fn investor(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

const CLOSES_AT: Timestamp = Timestamp(1_000);
const MATURES_AT: Timestamp = Timestamp(2_000);

fn offering(debt_cap: u64, collateral: u64) -> DebtOffering {
    DebtOffering::new(
        OfferingId(1),
        creator(),
        Money::from(debt_cap),
        Money::from(10),
        Money::from(collateral),
        CLOSES_AT,
        MATURES_AT,
        Timestamp::from_millis(0),
    )
    .unwrap()
}

fn bid(id: u64, amount: u64, rate: u64, at: i64) -> Order {
    Order::new(
        OrderId(id),
        OfferingId(1),
        investor(id as u8),
        Money::from(amount),
        Money::from(rate),
        Timestamp::from_millis(at),
    )
    .unwrap()
}

/// The canonical worked example, in thousandths so every figure is an
/// integer: cap 100_000, bids 60_000 @ 5% and 60_000 @ 3%.
#[test]
fn funded_offering_settles_on_time() {
    let mut o = offering(100_000, 50_000);

    let mut book = OrderBook::for_offering(&o);
    book.submit(bid(1, 60_000, 5, 10), Timestamp::from_millis(10)).unwrap();
    book.submit(bid(2, 60_000, 3, 20), Timestamp::from_millis(20)).unwrap();

    let mut orders = book.into_orders();
    // book order: cheaper bid first
    assert_eq!(orders[0].id, OrderId(2));

    let mut events = EventCollector::new();
    let report = clear(&mut o, &mut orders, CLOSES_AT, OrderId(3), &mut events).unwrap();

    // B fully accepted at 60_000, A shrunk to 40_000, remainder 20_000 rejected
    assert_eq!(report.total_raised, Money::from(100_000));
    assert_eq!(report.total_obligation, Money::from(103_800)); // 61_800 + 42_000
    assert_eq!(o.state, OfferingState::Closed);
    assert_eq!(orders.len(), 3);

    // threshold floor(100_000 * 2 / 3) = 66_666 was met
    assert!(report.total_raised >= Money::from(66_666));

    let report = settle(
        &mut o,
        &mut orders,
        Money::from(103_800),
        creator(),
        Timestamp::from_millis(1_500),
        &mut events,
    )
    .unwrap();

    assert_eq!(o.state, OfferingState::Settled);
    let payout = |id: u64| {
        report
            .payouts
            .iter()
            .find(|p| p.order_id == OrderId(id))
            .unwrap()
            .total
    };
    assert_eq!(payout(2), Money::from(61_800));
    assert_eq!(payout(1), Money::from(42_000));

    // the rejected remainder is refunded, not paid out
    assert!(report.payouts.iter().all(|p| p.order_id != OrderId(3)));
}

#[test]
fn defaulted_offering_executes_collateral() {
    let mut o = offering(100_000, 50_000);
    let mut orders = vec![bid(1, 60_000, 5, 10), bid(2, 60_000, 3, 20)];
    let mut events = EventCollector::new();

    clear(&mut o, &mut orders, CLOSES_AT, OrderId(3), &mut events).unwrap();

    // maturity passes with no repayment
    let report = execute_collateral(
        &mut o,
        &mut orders,
        Timestamp::from_millis(2_500),
        &mut events,
    )
    .unwrap();

    assert_eq!(o.state, OfferingState::CollateralExecuted);
    // shares pro-rata by obligation: floor(61_800 * 50_000 / 103_800) and
    // floor(42_000 * 50_000 / 103_800)
    let share = |id: u64| {
        report
            .shares
            .iter()
            .find(|s| s.order_id == OrderId(id))
            .unwrap()
            .share
    };
    assert_eq!(share(2), Money::from(29_768));
    assert_eq!(share(1), Money::from(20_231));
    assert_eq!(report.distributed, Money::from(49_999));
    assert_eq!(report.dust, Money::from(1));

    let winner = orders.iter().find(|o| o.id == OrderId(2)).unwrap();
    assert_eq!(winner.state, OrderState::SettledByCollateral);
}

#[test]
fn undersubscribed_offering_cancels_and_refunds_everyone() {
    let mut o = offering(100_000, 50_000);
    let mut orders = vec![bid(1, 20_000, 5, 10), bid(2, 10_000, 3, 20)];
    let mut events = EventCollector::new();

    let err = clear(&mut o, &mut orders, CLOSES_AT, OrderId(3), &mut events).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientSubscription { .. }));
    assert_eq!(o.state, OfferingState::Canceled);
    assert!(orders.iter().all(|o| o.state == OrderState::Rejected));

    // a canceled offering is terminal for all three operations
    let err = clear(&mut o, &mut orders, Timestamp::from_millis(1_100), OrderId(4), &mut events);
    assert!(err.is_err());
    let err = settle(
        &mut o,
        &mut orders,
        Money::from(1_000_000),
        creator(),
        Timestamp::from_millis(1_100),
        &mut events,
    );
    assert!(err.is_err());
    let err = execute_collateral(&mut o, &mut orders, Timestamp::from_millis(2_500), &mut events);
    assert!(err.is_err());
}

#[test]
fn terminal_states_reject_every_operation_without_mutation() {
    // settled offering
    let mut o = offering(100_000, 50_000);
    let mut orders = vec![bid(1, 80_000, 4, 10)];
    let mut events = EventCollector::new();
    clear(&mut o, &mut orders, CLOSES_AT, OrderId(2), &mut events).unwrap();
    settle(
        &mut o,
        &mut orders,
        Money::from(83_200),
        creator(),
        Timestamp::from_millis(1_500),
        &mut events,
    )
    .unwrap();

    let snapshot_state = o.state;
    let snapshot_updated = o.updated_at;
    let order_states: Vec<OrderState> = orders.iter().map(|o| o.state).collect();

    assert!(clear(&mut o, &mut orders, Timestamp::from_millis(1_600), OrderId(9), &mut events).is_err());
    assert!(settle(
        &mut o,
        &mut orders,
        Money::from(83_200),
        creator(),
        Timestamp::from_millis(1_600),
        &mut events
    )
    .is_err());
    assert!(execute_collateral(&mut o, &mut orders, Timestamp::from_millis(2_500), &mut events).is_err());

    assert_eq!(o.state, snapshot_state);
    assert_eq!(o.updated_at, snapshot_updated);
    assert_eq!(
        orders.iter().map(|o| o.state).collect::<Vec<_>>(),
        order_states
    );
}

#[test]
fn cancelled_bids_never_reach_clearing() {
    let mut o = offering(100_000, 50_000);
    let mut book = OrderBook::for_offering(&o);
    book.submit(bid(1, 80_000, 4, 10), Timestamp::from_millis(10)).unwrap();
    book.submit(bid(2, 30_000, 2, 20), Timestamp::from_millis(20)).unwrap();

    let cancelled = book
        .cancel(OrderId(2), investor(2), Timestamp::from_millis(30))
        .unwrap();
    assert_eq!(cancelled.state, OrderState::Cancelled);

    let mut orders = book.into_orders();
    assert_eq!(orders.len(), 1);

    let mut events = EventCollector::new();
    let report = clear(&mut o, &mut orders, CLOSES_AT, OrderId(3), &mut events).unwrap();
    assert_eq!(report.total_raised, Money::from(80_000));
    assert_eq!(report.accepted, vec![OrderId(1)]);
}

/// A host application's own offering row, run through the same engine via the
/// Offering trait. Only the economic fields matter to the engine.
#[derive(Debug)]
struct CampaignRow {
    id: OfferingId,
    title: String,
    creator: Address,
    debt_cap: Money,
    max_interest_rate: Money,
    collateral_amount: Money,
    total_raised: Money,
    total_obligation: Money,
    state: OfferingState,
    closes_at: Timestamp,
    matures_at: Timestamp,
    updated_at: Timestamp,
}

impl Offering for CampaignRow {
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

#[test]
fn foreign_offering_rows_clear_through_the_same_engine() {
    let mut campaign = CampaignRow {
        id: OfferingId(1),
        title: "series A notes".to_string(),
        creator: creator(),
        debt_cap: Money::from(100_000),
        max_interest_rate: Money::from(10),
        collateral_amount: Money::from(50_000),
        total_raised: Money::ZERO,
        total_obligation: Money::ZERO,
        state: OfferingState::Ongoing,
        closes_at: CLOSES_AT,
        matures_at: MATURES_AT,
        updated_at: Timestamp::from_millis(0),
    };

    let mut orders = vec![bid(1, 60_000, 5, 10), bid(2, 60_000, 3, 20)];
    let mut events = EventCollector::new();

    let report = clear(&mut campaign, &mut orders, CLOSES_AT, OrderId(3), &mut events).unwrap();
    assert_eq!(report.total_raised, Money::from(100_000));
    assert_eq!(campaign.state, OfferingState::Closed);
    assert_eq!(campaign.total_obligation, Money::from(103_800));
    assert_eq!(campaign.title, "series A notes");

    settle(
        &mut campaign,
        &mut orders,
        Money::from(103_800),
        creator(),
        Timestamp::from_millis(1_500),
        &mut events,
    )
    .unwrap();
    assert_eq!(campaign.state, OfferingState::Settled);
}

#[test]
fn clearing_events_cover_every_transition() {
    let mut o = offering(100_000, 50_000);
    let mut orders = vec![bid(1, 60_000, 5, 10), bid(2, 60_000, 3, 20)];
    let mut events = EventCollector::new();

    clear(&mut o, &mut orders, CLOSES_AT, OrderId(3), &mut events).unwrap();
    settle(
        &mut o,
        &mut orders,
        Money::from(103_800),
        creator(),
        Timestamp::from_millis(1_500),
        &mut events,
    )
    .unwrap();

    let payloads: Vec<&EventPayload> = events.events().iter().map(|e| &e.payload).collect();
    assert!(payloads.iter().any(|p| matches!(p, EventPayload::OrderAccepted(_))));
    assert!(payloads.iter().any(|p| matches!(p, EventPayload::OrderPartiallyAccepted(_))));
    assert!(payloads.iter().any(|p| matches!(p, EventPayload::OrderRejected(_))));
    assert!(payloads.iter().any(|p| matches!(p, EventPayload::OfferingClosed(_))));
    assert!(payloads.iter().any(|p| matches!(p, EventPayload::PayoutDue(_))));
    assert!(payloads.iter().any(|p| matches!(p, EventPayload::OfferingSettled(_))));

    // ids are strictly increasing across both operations
    let ids: Vec<u64> = events.events().iter().map(|e| e.id.0).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}
