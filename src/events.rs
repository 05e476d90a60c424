//! Diagnostic events and the sink port they are emitted through.
//!
//! Nothing in the GUI core is fatal: failures degrade to "nothing
//! observable happens" on the wire. What did happen is reported here so
//! an adapter can log it, count it or surface it elsewhere.
//!
//! ```text
//!   GuiServer / OutboundQueue ──▶ EventSink ──▶ LogEventSink (serial log)
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::error::{DecodeError, TransmitError};
use crate::protocol::transport::{SendError, SubscriberId};

/// Structured events emitted by the server and its delivery worker.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiEvent {
    /// A response or broadcast was not sent.
    TransmitSkipped { request_id: u32, reason: TransmitError },

    /// An inbound message could not be decoded and was dropped.
    RequestDropped(DecodeError),

    /// A SetValue named an unknown path, hit a missing handler or a
    /// read-only element. No reply is sent.
    WriteRejected { path: String },

    /// A client subscribed to or unsubscribed from notifications.
    SubscriberChanged { subscriber: SubscriberId, subscribed: bool },

    /// Delivery to one subscriber failed permanently; the message was
    /// skipped for that subscriber only.
    DeliveryFailed { subscriber: SubscriberId, error: SendError },

    /// The delivery worker has exited.
    WorkerStopped,
}

/// Receives [`GuiEvent`]s. Called from the transport event context and
/// from the delivery worker, so implementations must be thread-safe and
/// must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &GuiEvent);
}

/// Optional, swappable sink shared by the server and its delivery worker.
///
/// Without an installed sink events are still logged at debug level.
#[derive(Clone, Default)]
pub struct EventHub {
    sink: Arc<RwLock<Option<Arc<dyn EventSink>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sink(&self, sink: Arc<dyn EventSink>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    pub fn clear_sink(&self) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn emit(&self, event: GuiEvent) {
        let guard = self.sink.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(sink) => sink.emit(&event),
            None => debug!("event: {event:?}"),
        }
    }
}
