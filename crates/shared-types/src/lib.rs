//! # Shared Types Crate
//!
//! Primitive types shared by the cross-chain messaging core and the
//! signal bus.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Canonical Identity**: Application identities are fixed 32-byte values,
//!   independent of any chain's native address width.
//! - **Closed Kinds**: `MessageKind` has no catch-all variant; unknown wire
//!   codes are rejected by the caller, never coerced.

pub mod entities;

pub use entities::*;
