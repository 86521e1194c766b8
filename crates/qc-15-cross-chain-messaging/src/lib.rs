//! # QC-15 Cross-Chain Messaging
//!
//! Round-trip (ABA) messaging between application instances on different
//! channels.
//!
//! **Subsystem ID:** 15  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! An application on channel A sends a message to its peer on channel B.
//! If the message is a `RoundTrip`, B applies it and immediately sends an
//! acknowledgment back to A, paying for that return leg from its own
//! treasury with options the original sender embedded in the envelope.
//!
//! ## Security Properties
//!
//! | Defense | Description |
//! |---------|-------------|
//! | Trusted peers | Deliveries from unregistered senders are rejected before decoding |
//! | Strict decoding | Every envelope length field is checked against the buffer |
//! | Bounded payloads | Payloads over 32 bytes never reach the wire |
//! | No reply loops | Return legs are always `Plain` |
//! | Baseline floors | Enforced options are prepended to caller options |
//!
//! ## Module Structure
//!
//! ```text
//! qc-15-cross-chain-messaging/
//! ├── domain/          # Options, config, requests, outcomes, errors
//! ├── algorithms/      # Envelope codec, options combiner
//! ├── ports/           # MessageSender/Receiver, Transport, sinks
//! ├── service/         # Dispatcher, router, quoter, RoundTripMessenger
//! └── adapters/        # Enforced options, in-memory transport, treasury
//! ```
//!
//! ## Example
//!
//! ```ignore
//! let network = InMemoryNetwork::new(FeeSchedule::default());
//! let transport = network.register_endpoint(ChannelId(1), alice);
//!
//! let messenger = RoundTripMessenger::builder(config)
//!     .transport(Arc::new(transport))
//!     .state_sink(sink)
//!     .build()?;
//!
//! let request = MessageRequest::round_trip(ChannelId(2), "ping")
//!     .return_options(Options::new_type3().add_executor_receive(50_000, 0));
//! let fee = messenger.quote(&request, false).await?;
//! messenger.send(&request, fee, alice).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    DeliveryReport, EnforcedOptionsStore, FeeSchedule, InFlightPacket, InMemoryNetwork,
    InMemoryTransport, InMemoryTreasury, OrderedReceiver, DEFAULT_REORDER_WINDOW,
};
pub use algorithms::{
    combine_options, decode_envelope, encode_envelope, encode_return_message, return_options,
    validate_type3, RETURN_MESSAGE_LEN, RETURN_OPTIONS_OFFSET,
};
pub use domain::{
    invariant_known_kind, invariant_payload_within_bound, invariant_return_leg_kind,
    invariant_trusted_peer, AppliedMessage, DecodedEnvelope, DispatchReceipt,
    EnforcedOptionParam, ExecutionBudget, ExecutorOption, MessageRequest, MessagingConfig,
    MessagingError, Options, Origin, OutboundPacket, PeerConfig, PreparedMessage,
    ReceiveOutcome, ReturnLeg, WorkerOption, MAX_OPTION_PARAMS_LEN, MAX_PAYLOAD_LEN,
};
pub use ports::{
    ApplicationStateSink, FixedAcknowledgment, MessageReceiver, MessageSender, MockTransport,
    OptionsPolicy, RecordingStateSink, Responder, ReturnLegFunding, Transport,
};
pub use service::{
    FeeQuoter, MessageDispatcher, MessageRouter, MessagingContext, RoundTripMessenger,
    RoundTripMessengerBuilder,
};
pub use shared_types::{AppIdentity, ChannelId, Fee, MessageKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
