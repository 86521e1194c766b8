//! # Core Messaging Entities
//!
//! Primitive types shared by the messaging core and the signal bus.
//!
//! ## Clusters
//!
//! - **Routing**: `ChannelId`, `AppIdentity`
//! - **Messages**: `MessageKind`, `Guid`
//! - **Accounting**: `Fee`

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte hash (SHA-256).
pub type Hash = [u8; 32];

/// Globally unique identifier assigned to one dispatched message leg.
pub type Guid = Hash;

// =============================================================================
// CLUSTER A: ROUTING
// =============================================================================

/// Opaque identifier of an endpoint's channel (remote chain or route).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u32);

impl ChannelId {
    /// Raw numeric route identifier.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel-{}", self.0)
    }
}

impl From<u32> for ChannelId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Canonical 32-byte identity of an application instance.
///
/// Independent of any execution environment's native address width: shorter
/// native addresses are left-padded with zeros.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AppIdentity(pub [u8; 32]);

impl AppIdentity {
    /// The all-zero identity.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create from raw bytes.
    #[must_use]
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Widen a 20-byte native address into the canonical form.
    #[must_use]
    pub fn from_address(address: [u8; 20]) -> Self {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(&address);
        Self(bytes)
    }

    /// Create from a slice (must be exactly 32 bytes).
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 32] = slice.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw identity bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable
        write!(f, "AppIdentity(0x{}..)", hex::encode(&self.0[..4]))
    }
}

// Serialized as a hex string so config files stay human editable
impl Serialize for AppIdentity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for AppIdentity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).ok_or_else(|| serde::de::Error::custom("identity must be 32 bytes"))
    }
}

// =============================================================================
// CLUSTER B: MESSAGES
// =============================================================================

/// The closed set of message kinds carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Terminal message; no reply is generated.
    Plain,
    /// Obligates the receiver to send a `Plain` reply back to the origin.
    RoundTrip,
}

impl MessageKind {
    /// Wire code of `Plain`.
    pub const PLAIN_CODE: u16 = 1;
    /// Wire code of `RoundTrip`.
    pub const ROUND_TRIP_CODE: u16 = 2;

    /// Wire code for this kind.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::Plain => Self::PLAIN_CODE,
            Self::RoundTrip => Self::ROUND_TRIP_CODE,
        }
    }

    /// Parse a wire code. Unknown codes yield `None`, never a default.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            Self::PLAIN_CODE => Some(Self::Plain),
            Self::ROUND_TRIP_CODE => Some(Self::RoundTrip),
            _ => None,
        }
    }

    /// Whether the receiver must answer this kind.
    #[must_use]
    pub fn expects_return(&self) -> bool {
        matches!(self, Self::RoundTrip)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("Plain"),
            Self::RoundTrip => f.write_str("RoundTrip"),
        }
    }
}

// =============================================================================
// CLUSTER C: ACCOUNTING
// =============================================================================

/// Two-part delivery cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fee {
    /// Cost in the channel's native settlement asset.
    pub primary: u128,
    /// Cost in the alternate settlement asset (zero when unsupported).
    pub secondary: u128,
}

impl Fee {
    /// A zero fee.
    pub const ZERO: Self = Self {
        primary: 0,
        secondary: 0,
    };

    /// Fee payable in the native asset only.
    #[must_use]
    pub fn native(primary: u128) -> Self {
        Self {
            primary,
            secondary: 0,
        }
    }

    /// Whether `self` covers `required` in both assets.
    #[must_use]
    pub fn covers(&self, required: &Fee) -> bool {
        self.primary >= required.primary && self.secondary >= required.secondary
    }

    /// Component-wise saturating subtraction.
    #[must_use]
    pub fn saturating_sub(&self, other: &Fee) -> Fee {
        Fee {
            primary: self.primary.saturating_sub(other.primary),
            secondary: self.secondary.saturating_sub(other.secondary),
        }
    }

    /// Component-wise saturating addition.
    #[must_use]
    pub fn saturating_add(&self, other: &Fee) -> Fee {
        Fee {
            primary: self.primary.saturating_add(other.primary),
            secondary: self.secondary.saturating_add(other.secondary),
        }
    }

    /// Whether both components are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.primary == 0 && self.secondary == 0
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.primary, self.secondary)
    }
}
