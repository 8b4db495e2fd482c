// offering-core: fixed-term debt offering engine.
// invariant-first architecture: exact integer math and validated state
// transitions take priority. all computation is deterministic with no
// external I/O; persistence and token movement belong to the caller.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: OfferingId, OrderId, Timestamp, Money (U256)
//   2.x  order.rs: investor bids, order states, clearing priority, order book
//   3.x  offering.rs: Offering trait, DebtOffering, lifecycle state machine
//   4.x  events.rs: state transition events for audit and external transfers
//   5.x  engine/: clearing, settlement, collateral liquidation

pub mod engine;
pub mod events;
pub mod offering;
pub mod order;
pub mod types;

// re exports for convenience
pub use engine::*;
pub use events::*;
pub use offering::*;
pub use order::*;
pub use types::*;
