//! # Execution Options
//!
//! Opaque per-message execution parameters, in the type-3 worker format.
//!
//! ## Layout
//!
//! ```text
//! [u16 type = 3]
//! repeated:
//!   [u8 worker_id][u16 size][u8 option_type][params; size - 1]
//! ```
//!
//! All integers are big-endian. Worker `1` is the executor; its option
//! types are `1` (receive gas/value), `2` (native drop) and `4` (ordered
//! execution). Entries addressed to other workers are carried untouched.

use super::errors::MessagingError;
use super::value_objects::ExecutionBudget;
use serde::{Deserialize, Serialize};
use shared_types::AppIdentity;
use std::fmt;

/// Options format tag understood by the combiner.
pub const TYPE_3: u16 = 3;

/// Width of the format tag.
pub const TYPE_HEADER_LEN: usize = 2;

/// Worker id of the executor.
pub const EXECUTOR_WORKER_ID: u8 = 1;

/// Executor option: gas (and optional value) for the receive handler.
pub const OPTION_TYPE_RECEIVE: u8 = 1;
/// Executor option: native airdrop to a receiver.
pub const OPTION_TYPE_NATIVE_DROP: u8 = 2;
/// Executor option: deliver in nonce order.
pub const OPTION_TYPE_ORDERED_EXECUTION: u8 = 4;

/// Largest params slice one entry can carry; the u16 size field also
/// counts the option type byte.
pub const MAX_OPTION_PARAMS_LEN: usize = u16::MAX as usize - 1;

const U128_WIDTH: u16 = 16;
const IDENTITY_WIDTH: u16 = 32;

/// Opaque byte string of execution parameters.
///
/// The empty value means "no options".
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Options(Vec<u8>);

/// One raw worker entry of a type-3 bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerOption {
    /// Worker the entry is addressed to.
    pub worker_id: u8,
    /// Worker-specific option type.
    pub option_type: u8,
    /// Option parameters.
    pub params: Vec<u8>,
}

/// Decoded executor entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutorOption {
    /// Gas and native value for the receive handler.
    Receive {
        /// Gas limit.
        gas: u128,
        /// Native value forwarded with the call.
        value: u128,
    },
    /// Native airdrop to a third party.
    NativeDrop {
        /// Amount dropped.
        amount: u128,
        /// Recipient.
        receiver: AppIdentity,
    },
    /// Deliver strictly in nonce order.
    OrderedExecution,
}

impl Options {
    /// The empty options value.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// A type-3 header with no entries.
    pub fn new_type3() -> Self {
        Self(TYPE_3.to_be_bytes().to_vec())
    }

    /// Wrap raw bytes without validation.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse from a hex string (with or without `0x`).
    pub fn from_hex(s: &str) -> Result<Self, MessagingError> {
        hex::decode(s.trim_start_matches("0x"))
            .map(Self)
            .map_err(|e| MessagingError::InvalidOptions(format!("bad hex: {e}")))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the empty value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Format tag, if at least two bytes are present.
    pub fn options_type(&self) -> Option<u16> {
        let header = self.0.get(..TYPE_HEADER_LEN)?;
        Some(u16::from_be_bytes([header[0], header[1]]))
    }

    /// Whether the bundle carries the type-3 tag.
    pub fn is_type3(&self) -> bool {
        self.options_type() == Some(TYPE_3)
    }

    /// Entry bytes following the format tag.
    pub fn entries_bytes(&self) -> &[u8] {
        self.0.get(TYPE_HEADER_LEN..).unwrap_or(&[])
    }

    // =========================================================================
    // BUILDER
    // =========================================================================

    /// Append an executor receive entry.
    ///
    /// A zero `value` is omitted from the encoding.
    pub fn add_executor_receive(self, gas: u128, value: u128) -> Self {
        let mut params = gas.to_be_bytes().to_vec();
        if value > 0 {
            params.extend_from_slice(&value.to_be_bytes());
        }
        let size = if value > 0 { 1 + 2 * U128_WIDTH } else { 1 + U128_WIDTH };
        self.push_entry(EXECUTOR_WORKER_ID, OPTION_TYPE_RECEIVE, size, &params)
    }

    /// Append an executor native-drop entry.
    pub fn add_executor_native_drop(self, amount: u128, receiver: AppIdentity) -> Self {
        let mut params = amount.to_be_bytes().to_vec();
        params.extend_from_slice(receiver.as_bytes());
        self.push_entry(
            EXECUTOR_WORKER_ID,
            OPTION_TYPE_NATIVE_DROP,
            1 + U128_WIDTH + IDENTITY_WIDTH,
            &params,
        )
    }

    /// Append an ordered-execution entry.
    pub fn add_executor_ordered_execution(self) -> Self {
        self.push_entry(EXECUTOR_WORKER_ID, OPTION_TYPE_ORDERED_EXECUTION, 1, &[])
    }

    /// Append an executor entry with raw parameters.
    pub fn add_executor_option(
        self,
        option_type: u8,
        params: &[u8],
    ) -> Result<Self, MessagingError> {
        self.add_worker_option(EXECUTOR_WORKER_ID, option_type, params)
    }

    /// Append an entry for any worker. Starts a type-3 header when empty.
    ///
    /// Fails with `InvalidOptions` when `params` exceed [`MAX_OPTION_PARAMS_LEN`].
    pub fn add_worker_option(
        self,
        worker_id: u8,
        option_type: u8,
        params: &[u8],
    ) -> Result<Self, MessagingError> {
        // Size covers the option type byte plus params
        let size = u16::try_from(params.len() + 1).map_err(|_| {
            MessagingError::InvalidOptions(format!(
                "{} byte params exceed the {MAX_OPTION_PARAMS_LEN} byte entry limit",
                params.len()
            ))
        })?;
        Ok(self.push_entry(worker_id, option_type, size, params))
    }

    fn push_entry(mut self, worker_id: u8, option_type: u8, size: u16, params: &[u8]) -> Self {
        if self.0.is_empty() {
            self.0.extend_from_slice(&TYPE_3.to_be_bytes());
        }
        self.0.push(worker_id);
        self.0.extend_from_slice(&size.to_be_bytes());
        self.0.push(option_type);
        self.0.extend_from_slice(params);
        self
    }

    // =========================================================================
    // PARSER
    // =========================================================================

    /// Split the bundle into raw worker entries.
    ///
    /// The empty value yields no entries. Anything else must be type 3.
    pub fn worker_options(&self) -> Result<Vec<WorkerOption>, MessagingError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        match self.options_type() {
            Some(TYPE_3) => {}
            Some(other) => {
                return Err(MessagingError::InvalidOptions(format!(
                    "unsupported options type {other}"
                )))
            }
            None => {
                return Err(MessagingError::InvalidOptions(
                    "options shorter than type header".into(),
                ))
            }
        }

        let bytes = self.entries_bytes();
        let mut entries = Vec::new();
        let mut cursor = 0usize;
        while cursor < bytes.len() {
            let head = bytes
                .get(cursor..cursor + 4)
                .ok_or_else(|| MessagingError::InvalidOptions("truncated entry header".into()))?;
            let worker_id = head[0];
            let size = u16::from_be_bytes([head[1], head[2]]) as usize;
            let option_type = head[3];
            if size == 0 {
                return Err(MessagingError::InvalidOptions(format!(
                    "zero-sized entry for worker {worker_id}"
                )));
            }
            let params_start = cursor + 4;
            let params_end = cursor + 3 + size;
            let params = bytes.get(params_start..params_end).ok_or_else(|| {
                MessagingError::InvalidOptions(format!(
                    "entry for worker {worker_id} overruns options"
                ))
            })?;
            entries.push(WorkerOption {
                worker_id,
                option_type,
                params: params.to_vec(),
            });
            cursor = params_end;
        }
        Ok(entries)
    }

    /// Decode every executor entry. Entries for other workers are skipped.
    pub fn executor_options(&self) -> Result<Vec<ExecutorOption>, MessagingError> {
        self.worker_options()?
            .into_iter()
            .filter(|entry| entry.worker_id == EXECUTOR_WORKER_ID)
            .map(|entry| decode_executor_option(&entry))
            .collect()
    }

    /// Sum the executor resources the bundle requests.
    pub fn execution_budget(&self) -> Result<ExecutionBudget, MessagingError> {
        let mut budget = ExecutionBudget::default();
        for option in self.executor_options()? {
            match option {
                ExecutorOption::Receive { gas, value } => {
                    budget.gas = budget.gas.saturating_add(gas);
                    budget.value = budget.value.saturating_add(value);
                }
                ExecutorOption::NativeDrop { amount, .. } => {
                    budget.native_drop = budget.native_drop.saturating_add(amount);
                }
                ExecutorOption::OrderedExecution => budget.ordered = true,
            }
        }
        Ok(budget)
    }
}

fn read_u128(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    buf.copy_from_slice(bytes);
    u128::from_be_bytes(buf)
}

fn decode_executor_option(entry: &WorkerOption) -> Result<ExecutorOption, MessagingError> {
    let params = entry.params.as_slice();
    match (entry.option_type, params.len()) {
        (OPTION_TYPE_RECEIVE, 16) => Ok(ExecutorOption::Receive {
            gas: read_u128(params),
            value: 0,
        }),
        (OPTION_TYPE_RECEIVE, 32) => Ok(ExecutorOption::Receive {
            gas: read_u128(&params[..16]),
            value: read_u128(&params[16..]),
        }),
        (OPTION_TYPE_NATIVE_DROP, 48) => {
            let receiver = AppIdentity::from_slice(&params[16..]).ok_or_else(|| {
                MessagingError::InvalidOptions("bad native drop receiver".into())
            })?;
            Ok(ExecutorOption::NativeDrop {
                amount: read_u128(&params[..16]),
                receiver,
            })
        }
        (OPTION_TYPE_ORDERED_EXECUTION, 0) => Ok(ExecutorOption::OrderedExecution),
        (option_type, len) => Err(MessagingError::InvalidOptions(format!(
            "executor option {option_type} with {len} parameter bytes"
        ))),
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Options(0x{})", hex::encode(&self.0))
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for Options {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Options {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Options {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Options {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
