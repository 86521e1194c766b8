//! # Quantum-Chain Messaging Test Suite
//!
//! Unified test crate for the round-trip messaging core.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Codec, combiner and dispatch throughput
//! │   └── qc_15_messaging.rs
//! │
//! └── integration/      # Two messengers talking over one in-memory network
//!     ├── fixtures.rs
//!     ├── round_trip_flows.rs
//!     └── ordered_delivery.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # By category
//! cargo test -p qc-tests integration::
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]
