//! Envelope framing for payloads larger than one transport message.
//!
//! ```text
//! Envelope:      [kind:1][request id:4 BE][total len:4 BE][payload part 1]
//! Continuation:  [payload part N]                (no header)
//! ```
//!
//! The envelope is exactly `min(B, 9 + L)` bytes for a content budget `B`
//! and payload length `L`; continuations carry up to `B` bytes each. The
//! receiver reads the declared total from the envelope and concatenates
//! following messages until that many payload bytes have arrived.

use log::debug;

use crate::error::TransmitError;

/// Envelope header size: kind + request id + total length.
pub const ENVELOPE_HEADER_LEN: usize = 9;

/// Smallest content budget that carries a header plus one payload byte.
pub const MIN_CONTENT_BUDGET: u16 = 10;

/// Default cap on a reassembled payload.
pub const DEFAULT_MAX_TRANSFER_LEN: usize = 64 * 1024;

/// Split one logical message into transport messages of at most `budget` bytes.
pub fn frame_message(
    kind: u8,
    request_id: u32,
    payload: &[u8],
    budget: u16,
) -> Result<Vec<Vec<u8>>, TransmitError> {
    if budget < MIN_CONTENT_BUDGET {
        return Err(TransmitError::BudgetTooSmall { budget });
    }
    let total = u32::try_from(payload.len())
        .map_err(|_| TransmitError::PayloadTooLarge { len: payload.len() })?;

    let budget = usize::from(budget);
    let first_len = payload.len().min(budget - ENVELOPE_HEADER_LEN);
    let (first, rest) = payload.split_at(first_len);

    let mut envelope = Vec::with_capacity(ENVELOPE_HEADER_LEN + first_len);
    envelope.push(kind);
    envelope.extend_from_slice(&request_id.to_be_bytes());
    envelope.extend_from_slice(&total.to_be_bytes());
    envelope.extend_from_slice(first);

    let mut parts = Vec::with_capacity(1 + rest.len().div_ceil(budget));
    parts.push(envelope);
    parts.extend(rest.chunks(budget).map(<[u8]>::to_vec));
    Ok(parts)
}

/// Parsed envelope header plus the payload bytes it carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub kind: u8,
    pub request_id: u32,
    pub total_len: u32,
    pub first: &'a [u8],
}

pub fn parse_envelope(msg: &[u8]) -> Option<Envelope<'_>> {
    let (header, first) = msg.split_at_checked(ENVELOPE_HEADER_LEN)?;
    let request_id = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    let total_len = u32::from_be_bytes([header[5], header[6], header[7], header[8]]);
    Some(Envelope {
        kind: header[0],
        request_id,
        total_len,
        first,
    })
}

// ── Receive side ─────────────────────────────────────────────

/// A complete logical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub kind: u8,
    pub request_id: u32,
    pub payload: Vec<u8>,
}

/// One in-flight transfer.
#[derive(Debug)]
pub struct PendingTransfer {
    kind: u8,
    request_id: u32,
    expected: usize,
    buffer: Vec<u8>,
}

impl PendingTransfer {
    fn remaining(&self) -> usize {
        self.expected - self.buffer.len()
    }

    pub fn request_id(&self) -> u32 {
        self.request_id
    }
}

/// Receive-side reassembly, one transfer in flight at a time.
///
/// A message longer than the bytes still outstanding cannot be a
/// continuation, so it starts a new transfer and the partial one is
/// discarded. Malformed or oversized envelopes are dropped.
pub struct Reassembler {
    pending: Option<PendingTransfer>,
    max_transfer_len: usize,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRANSFER_LEN)
    }
}

impl Reassembler {
    pub fn new(max_transfer_len: usize) -> Self {
        Self {
            pending: None,
            max_transfer_len,
        }
    }

    /// Feed one transport message. Returns a message once it is complete.
    pub fn feed(&mut self, msg: &[u8]) -> Option<Assembled> {
        if let Some(p) = self.pending.as_mut() {
            if msg.len() <= p.remaining() {
                p.buffer.extend_from_slice(msg);
                if p.remaining() == 0 {
                    return self.pending.take().map(|p| Assembled {
                        kind: p.kind,
                        request_id: p.request_id,
                        payload: p.buffer,
                    });
                }
                return None;
            }
            debug!(
                "reassembly: discarding partial transfer {:#010x} ({}/{} bytes)",
                p.request_id,
                p.buffer.len(),
                p.expected
            );
            self.pending = None;
        }

        let env = parse_envelope(msg)?;
        let expected = env.total_len as usize;
        if expected > self.max_transfer_len {
            debug!("reassembly: declared length {expected} over cap, dropped");
            return None;
        }
        if env.first.len() > expected {
            debug!("reassembly: envelope carries more than declared, dropped");
            return None;
        }

        if env.first.len() == expected {
            return Some(Assembled {
                kind: env.kind,
                request_id: env.request_id,
                payload: env.first.to_vec(),
            });
        }

        let mut buffer = Vec::with_capacity(expected);
        buffer.extend_from_slice(env.first);
        self.pending = Some(PendingTransfer {
            kind: env.kind,
            request_id: env.request_id,
            expected,
            buffer,
        });
        None
    }

    pub fn pending(&self) -> Option<&PendingTransfer> {
        self.pending.as_ref()
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }
}
