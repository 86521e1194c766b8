//! # Adapters Layer (Hexagonal Architecture)
//!
//! Concrete implementations of the messaging ports: the enforced-options
//! table, an in-process transport, the return-leg treasury and the
//! nonce-ordering receiver decorator.

mod enforced_options;
mod memory_transport;
mod ordered_receiver;
mod treasury;

pub use enforced_options::EnforcedOptionsStore;
pub use memory_transport::{
    DeliveryReport, FeeSchedule, InFlightPacket, InMemoryNetwork, InMemoryTransport,
    MAX_FLUSH_DELIVERIES,
};
pub use ordered_receiver::{OrderedReceiver, DEFAULT_REORDER_WINDOW};
pub use treasury::InMemoryTreasury;
