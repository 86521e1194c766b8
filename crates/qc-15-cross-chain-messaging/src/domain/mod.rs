//! # Domain Module
//!
//! Core domain types for round-trip messaging.

pub mod config;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod options;
pub mod value_objects;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use options::*;
pub use value_objects::*;
