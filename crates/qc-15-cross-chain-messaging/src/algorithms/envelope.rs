//! # Envelope Codec
//!
//! Deterministic framing of payload, kind and embedded return options.
//!
//! ## Layout (big-endian)
//!
//! ```text
//! off 0        u8       payload length (0..=32)
//! off 1        [u8;32]  payload, zero padded
//! off 33       u16      message kind
//! off 35       u32      return options length (copy 1)
//! off 39       bytes    return options
//! off 39+n     u32      return options length (copy 2)
//! ```
//!
//! A return-leg envelope is the 35-byte prefix alone and decodes with an
//! options length of zero. Decoding is strict: anything that `encode` would
//! not have produced is rejected.

use crate::domain::{
    invariant_payload_within_bound, DecodedEnvelope, MessagingError, MAX_PAYLOAD_LEN,
};
use shared_types::MessageKind;
use tracing::debug;

/// Width of the payload length prefix.
pub const PAYLOAD_LEN_WIDTH: usize = 1;
/// Width of the fixed payload slot.
pub const PAYLOAD_SLOT_WIDTH: usize = MAX_PAYLOAD_LEN;
/// Width of the kind field.
pub const KIND_WIDTH: usize = 2;
/// Width of each options length copy.
pub const OPTIONS_LEN_WIDTH: usize = 4;

/// Offset of the kind field.
pub const KIND_OFFSET: usize = PAYLOAD_LEN_WIDTH + PAYLOAD_SLOT_WIDTH;

/// Length of a return-leg envelope (no options section).
pub const RETURN_MESSAGE_LEN: usize = KIND_OFFSET + KIND_WIDTH;

/// Offset of the first options length copy.
pub const OPTIONS_LEN_OFFSET: usize = RETURN_MESSAGE_LEN;

/// Offset where the embedded return options begin.
pub const RETURN_OPTIONS_OFFSET: usize = OPTIONS_LEN_OFFSET + OPTIONS_LEN_WIDTH;

/// Smallest envelope carrying an options section (empty options).
pub const MIN_FULL_ENVELOPE_LEN: usize = RETURN_OPTIONS_OFFSET + OPTIONS_LEN_WIDTH;

/// Encode a forward envelope.
///
/// `return_options` is carried for every kind; only `RoundTrip` receivers
/// act on it.
pub fn encode_envelope(
    payload: &[u8],
    kind: MessageKind,
    return_options: &[u8],
) -> Result<Vec<u8>, MessagingError> {
    let options_len = u32::try_from(return_options.len()).map_err(|_| {
        MessagingError::InvalidOptions(format!(
            "return options of {} bytes exceed the length field",
            return_options.len()
        ))
    })?;

    let mut envelope =
        Vec::with_capacity(MIN_FULL_ENVELOPE_LEN + return_options.len());
    write_prefix(&mut envelope, payload, kind)?;
    envelope.extend_from_slice(&options_len.to_be_bytes());
    envelope.extend_from_slice(return_options);
    envelope.extend_from_slice(&options_len.to_be_bytes());

    debug!(
        payload_len = payload.len(),
        kind = %kind,
        options_len,
        envelope_len = envelope.len(),
        "[qc-15] Envelope encoded"
    );
    Ok(envelope)
}

/// Encode a return-leg envelope: always `Plain`, never carries options.
pub fn encode_return_message(payload: &[u8]) -> Result<Vec<u8>, MessagingError> {
    let mut envelope = Vec::with_capacity(RETURN_MESSAGE_LEN);
    write_prefix(&mut envelope, payload, MessageKind::Plain)?;
    Ok(envelope)
}

fn write_prefix(
    buf: &mut Vec<u8>,
    payload: &[u8],
    kind: MessageKind,
) -> Result<(), MessagingError> {
    invariant_payload_within_bound(payload.len())?;

    let mut slot = [0u8; PAYLOAD_SLOT_WIDTH];
    slot[..payload.len()].copy_from_slice(payload);

    buf.push(payload.len() as u8);
    buf.extend_from_slice(&slot);
    buf.extend_from_slice(&kind.code().to_be_bytes());
    Ok(())
}

/// Decode an envelope, validating every structural rule.
pub fn decode_envelope(bytes: &[u8]) -> Result<DecodedEnvelope, MessagingError> {
    let prefix = bytes.get(..RETURN_MESSAGE_LEN).ok_or_else(|| {
        MessagingError::MalformedEnvelope(format!(
            "{} bytes is shorter than the {RETURN_MESSAGE_LEN}-byte header",
            bytes.len()
        ))
    })?;

    let payload_len = prefix[0] as usize;
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(MessagingError::MalformedEnvelope(format!(
            "payload length {payload_len} exceeds {MAX_PAYLOAD_LEN}"
        )));
    }

    let slot = &prefix[PAYLOAD_LEN_WIDTH..KIND_OFFSET];
    if slot[payload_len..].iter().any(|b| *b != 0) {
        return Err(MessagingError::MalformedEnvelope(
            "non-zero payload padding".into(),
        ));
    }

    let code = u16::from_be_bytes([prefix[KIND_OFFSET], prefix[KIND_OFFSET + 1]]);
    let kind = MessageKind::from_code(code)
        .ok_or_else(|| MessagingError::MalformedEnvelope(format!("unknown kind {code}")))?;

    let options_len = if bytes.len() == RETURN_MESSAGE_LEN {
        0
    } else {
        decode_options_section(bytes)?
    };

    debug!(
        payload_len,
        kind = %kind,
        options_len,
        "[qc-15] Envelope decoded"
    );

    Ok(DecodedEnvelope {
        payload: slot[..payload_len].to_vec(),
        kind,
        options_offset: RETURN_OPTIONS_OFFSET,
        options_len,
    })
}

/// Validate the options section and return its declared length.
fn decode_options_section(bytes: &[u8]) -> Result<usize, MessagingError> {
    let declared = read_u32_be(bytes, OPTIONS_LEN_OFFSET)? as usize;

    let trailer_offset = RETURN_OPTIONS_OFFSET
        .checked_add(declared)
        .ok_or_else(|| MessagingError::MalformedEnvelope("options length overflow".into()))?;
    let expected_len = trailer_offset + OPTIONS_LEN_WIDTH;

    if bytes.len() < expected_len {
        return Err(MessagingError::MalformedEnvelope(format!(
            "declared options length {declared} overruns {}-byte envelope",
            bytes.len()
        )));
    }
    if bytes.len() > expected_len {
        return Err(MessagingError::MalformedEnvelope(format!(
            "{} trailing bytes",
            bytes.len() - expected_len
        )));
    }

    let trailer = read_u32_be(bytes, trailer_offset)? as usize;
    if trailer != declared {
        return Err(MessagingError::MalformedEnvelope(format!(
            "options length copies disagree ({declared} vs {trailer})"
        )));
    }
    Ok(declared)
}

fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32, MessagingError> {
    let field = bytes
        .get(offset..offset + OPTIONS_LEN_WIDTH)
        .ok_or_else(|| MessagingError::MalformedEnvelope(format!("truncated at {offset}")))?;
    Ok(u32::from_be_bytes([field[0], field[1], field[2], field[3]]))
}

/// Borrow the embedded return options of a decoded envelope.
pub fn return_options<'a>(
    bytes: &'a [u8],
    decoded: &DecodedEnvelope,
) -> Result<&'a [u8], MessagingError> {
    if decoded.options_len == 0 {
        return Ok(&[]);
    }
    bytes
        .get(decoded.options_offset..decoded.options_offset + decoded.options_len)
        .ok_or_else(|| MessagingError::MalformedEnvelope("return options out of range".into()))
}
