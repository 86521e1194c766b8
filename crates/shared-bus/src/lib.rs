//! # Shared Bus
//!
//! Observable signals of the cross-chain messaging core.
//!
//! | Signal                 | Topic      | Emitted when                                |
//! |------------------------|------------|---------------------------------------------|
//! | `MessageSent`          | `Outbound` | the transport accepted an envelope (either leg) |
//! | `MessageReceived`      | `Inbound`  | a delivered envelope reached application state |
//! | `ReturnDispatchFailed` | `Failures` | an automatic reply could not be sent        |
//!
//! The core publishes through [`EventPublisher`]; monitors hold a
//! [`Subscription`] (or an [`EventStream`]) from [`InMemoryEventBus`].
//! Signals are fire-and-forget: a slow or absent monitor never blocks the
//! messenger.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, Leg, MessagingEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Unread signals a subscriber may hold before it starts missing them.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
