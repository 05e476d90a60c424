//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing GUI events to the `log` facade
//! (the ESP-IDF logger on target, UART / USB-CDC in production).

use log::{debug, info, warn};

use crate::error::TransmitError;
use crate::events::{EventSink, GuiEvent};

/// Adapter that logs every [`GuiEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &GuiEvent) {
        match event {
            GuiEvent::TransmitSkipped { request_id, reason } => match reason {
                // Routine while nobody is connected.
                TransmitError::NoLink | TransmitError::NoSubscribers => {
                    debug!("TX | skipped id={request_id:#010x}: {reason}");
                }
                _ => warn!("TX | refused id={request_id:#010x}: {reason}"),
            },
            GuiEvent::RequestDropped(e) => {
                warn!("RX | dropped malformed request: {e}");
            }
            GuiEvent::WriteRejected { path } => {
                info!("RX | write to '{path}' rejected");
            }
            GuiEvent::SubscriberChanged {
                subscriber,
                subscribed,
            } => {
                info!(
                    "SUB | conn {subscriber} {}",
                    if *subscribed { "subscribed" } else { "unsubscribed" }
                );
            }
            GuiEvent::DeliveryFailed { subscriber, error } => {
                warn!("TX | delivery to conn {subscriber} failed: {error}");
            }
            GuiEvent::WorkerStopped => {
                info!("TX | delivery worker stopped");
            }
        }
    }
}
