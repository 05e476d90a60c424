//! Unified error types for the remote GUI core.
//!
//! A single `Error` enum that every subsystem converts into, with small
//! `Copy` sub-enums per concern. None of these are fatal: the protocol
//! layer turns them into "nothing observable happens" plus a diagnostic
//! event, so the peripheral stays alive indefinitely.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An outbound message could not be handed to the transport.
    Transmit(TransmitError),
    /// Inbound bytes could not be decoded.
    Decode(DecodeError),
    /// Worker or platform initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transmit(e) => write!(f, "transmit: {e}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transmit errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitError {
    /// No link is connected, so there is no content budget.
    NoLink,
    /// The negotiated content budget cannot hold an envelope header plus
    /// at least one payload byte.
    BudgetTooSmall { budget: u16 },
    /// Nobody is subscribed to notifications.
    NoSubscribers,
    /// The payload length does not fit the 32-bit length field.
    PayloadTooLarge { len: usize },
}

impl fmt::Display for TransmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLink => write!(f, "no client link"),
            Self::BudgetTooSmall { budget } => write!(
                f,
                "need at least {} bytes content budget, client reported {budget}",
                crate::protocol::fragment::MIN_CONTENT_BUDGET
            ),
            Self::NoSubscribers => write!(f, "no subscribers"),
            Self::PayloadTooLarge { len } => write!(f, "payload of {len} bytes exceeds length field"),
        }
    }
}

impl From<TransmitError> for Error {
    fn from(e: TransmitError) -> Self {
        Self::Transmit(e)
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Zero-length message.
    Empty,
    /// Message kind tag outside the known taxonomy.
    UnknownKind(u8),
    /// Value type tag outside the known taxonomy.
    UnknownValueType(u8),
    /// Fewer bytes remain than a fixed-size field needs.
    Truncated,
    /// A declared length exceeds the bytes remaining (or the allowed cap).
    LengthOverflow { declared: u32, available: usize },
    /// A length-prefixed string is not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty message"),
            Self::UnknownKind(k) => write!(f, "unknown message kind 0x{k:02x}"),
            Self::UnknownValueType(t) => write!(f, "unknown value type {t}"),
            Self::Truncated => write!(f, "message truncated"),
            Self::LengthOverflow {
                declared,
                available,
            } => write!(f, "declared length {declared} exceeds {available} available bytes"),
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
