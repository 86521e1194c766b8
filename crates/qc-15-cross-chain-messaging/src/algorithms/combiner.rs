//! # Options Combiner
//!
//! Merges caller options with an enforced baseline.
//!
//! The baseline's entries come first and the caller's entries are appended.
//! Executors sum repeated receive entries, so the effective budget can only
//! grow past the baseline, never shrink below it.

use crate::domain::{MessagingError, Options, TYPE_HEADER_LEN};
use tracing::debug;

/// Combine an optional baseline with caller options.
///
/// - no baseline: caller options unchanged
/// - empty caller options: the baseline
/// - otherwise: baseline followed by the caller's entries
///
/// Non-empty caller options must be type 3 whenever a baseline applies.
pub fn combine_options(
    enforced: Option<&Options>,
    caller: &Options,
) -> Result<Options, MessagingError> {
    let Some(baseline) = enforced.filter(|options| !options.is_empty()) else {
        return Ok(caller.clone());
    };

    if caller.is_empty() {
        return Ok(baseline.clone());
    }

    validate_type3(caller)?;

    let mut combined = Vec::with_capacity(baseline.len() + caller.len() - TYPE_HEADER_LEN);
    combined.extend_from_slice(baseline.as_bytes());
    combined.extend_from_slice(caller.entries_bytes());

    debug!(
        baseline_len = baseline.len(),
        caller_len = caller.len(),
        combined_len = combined.len(),
        "[qc-15] Options combined with baseline"
    );
    Ok(Options::from_bytes(combined))
}

/// Reject anything other than a well-formed type-3 bundle.
pub fn validate_type3(options: &Options) -> Result<(), MessagingError> {
    if !options.is_type3() {
        return Err(MessagingError::InvalidOptions(format!(
            "expected type 3 options, got {}",
            options
        )));
    }
    options.worker_options().map(|_| ())
}
