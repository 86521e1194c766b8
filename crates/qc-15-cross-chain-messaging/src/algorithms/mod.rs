//! # Algorithms Module
//!
//! Pure functions behind the messenger: envelope framing and options
//! combination.

pub mod combiner;
pub mod envelope;

pub use combiner::{combine_options, validate_type3};
pub use envelope::{
    decode_envelope, encode_envelope, encode_return_message, return_options,
    RETURN_MESSAGE_LEN, RETURN_OPTIONS_OFFSET,
};
