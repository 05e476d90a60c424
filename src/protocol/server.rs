//! GUI server: decodes client requests, applies them to the tree and
//! queues framed replies.
//!
//! **Transport-decoupled**: the server never reads from the link. The
//! transport adapter feeds it received messages via
//! [`GuiServer::on_incoming_message`] and subscription changes via
//! [`GuiServer::on_subscribe`]; replies leave through the
//! [`OutboundQueue`] worker.
//!
//! Every outbound message passes three gates before it is queued:
//!
//! 1. **Link**: no content budget means no client; skipped silently.
//! 2. **Budget**: a budget below the configured minimum is refused and
//!    reported through the event hub.
//! 3. **Audience**: nobody subscribed means nothing to send.
//!
//! Value updates are framed and queued while the tree lock is still held,
//! so subscribers see them in the order the writes were committed. Lock
//! order is always tree, then queue.

use std::sync::Arc;

use log::debug;

use super::codec::{self, BROADCAST_REQUEST_ID, ClientRequest, ServerKind, ServerMessage};
use super::fragment::frame_message;
use super::queue::OutboundQueue;
use super::transport::{GattTransport, SubscriberId};
use crate::config::GuiConfig;
use crate::error::{Error, TransmitError};
use crate::events::{EventHub, EventSink, GuiEvent};
use crate::gui::{SharedGui, path as wire_path};
use crate::value::Value;

pub struct GuiServer<T: GattTransport + 'static> {
    gui: SharedGui,
    transport: Arc<T>,
    queue: OutboundQueue<T>,
    events: EventHub,
    min_budget: u16,
}

impl<T: GattTransport + 'static> GuiServer<T> {
    /// Bind `gui` to `transport` and start the delivery worker.
    pub fn new(gui: SharedGui, transport: Arc<T>, config: &GuiConfig) -> Result<Self, Error> {
        config.validate()?;
        let events = EventHub::new();
        let queue = OutboundQueue::start(transport.clone(), events.clone(), config.queue_config())
            .map_err(|_| Error::Init("delivery worker spawn failed"))?;
        Ok(Self {
            gui,
            transport,
            queue,
            events,
            min_budget: config.effective_min_budget(),
        })
    }

    pub fn gui(&self) -> &SharedGui {
        &self.gui
    }

    pub fn queue(&self) -> &OutboundQueue<T> {
        &self.queue
    }

    pub fn set_event_sink(&self, sink: Arc<dyn EventSink>) {
        self.events.set_sink(sink);
    }

    // ── Inbound ──────────────────────────────────────────────

    /// Handle one received transport message. Malformed input is dropped
    /// without a reply.
    pub fn on_incoming_message(&self, msg: &[u8]) {
        let request = match codec::decode_request(msg) {
            Ok(r) => r,
            Err(e) => {
                self.events.emit(GuiEvent::RequestDropped(e));
                return;
            }
        };

        match request.body {
            ClientRequest::RequestGui => {
                debug!("RX: RequestGUI id={:#010x}", request.request_id);
                let dump = self.gui.describe();
                self.send(request.request_id, &ServerMessage::GuiData(dump));
            }
            ClientRequest::SetValue { path, value } => {
                debug!("RX: SetValue id={:#010x} '{path}'", request.request_id);
                self.apply_set_value(request.request_id, path, &value);
            }
        }
    }

    fn apply_set_value(&self, request_id: u32, path: String, value: &Value) {
        let segments = wire_path::split(&path);
        let replied = self.gui.set_and_publish(&segments, value, |value| {
            self.send(
                request_id,
                &ServerMessage::UpdateValue {
                    path: path.clone(),
                    value,
                },
            );
        });
        if replied.is_none() {
            self.events.emit(GuiEvent::WriteRejected { path });
        }
    }

    /// Subscription change reported by the transport.
    pub fn on_subscribe(&self, subscriber: SubscriberId, subscribed: bool) {
        let changed = if subscribed {
            self.queue.add_subscriber(subscriber)
        } else {
            self.queue.remove_subscriber(subscriber)
        };
        if changed {
            self.events.emit(GuiEvent::SubscriberChanged {
                subscriber,
                subscribed,
            });
        }
    }

    // ── Outbound ─────────────────────────────────────────────

    /// Broadcast the current value at `path` to every subscriber.
    /// Returns `false` if the path does not resolve to a readable value.
    pub fn notify_value_change<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.gui
            .publish_value(path, |value| self.broadcast(path, value))
            .is_some()
    }

    /// Write from the application side and broadcast the result.
    pub fn set_value_and_notify<S: AsRef<str>>(&self, path: &[S], value: &Value) -> bool {
        self.gui
            .set_and_publish(path, value, |value| self.broadcast(path, value))
            .is_some()
    }

    fn broadcast<S: AsRef<str>>(&self, path: &[S], value: Value) {
        self.send(
            BROADCAST_REQUEST_ID,
            &ServerMessage::UpdateValue {
                path: wire_path::join(path),
                value,
            },
        );
    }

    fn send(&self, request_id: u32, msg: &ServerMessage) {
        if let Err(reason) = self.transmit(msg.kind(), request_id, &msg.encode_body()) {
            self.events
                .emit(GuiEvent::TransmitSkipped { request_id, reason });
        }
    }

    fn transmit(&self, kind: ServerKind, request_id: u32, payload: &[u8]) -> Result<(), TransmitError> {
        let budget = self.transport.content_budget().ok_or(TransmitError::NoLink)?;
        if budget < self.min_budget {
            return Err(TransmitError::BudgetTooSmall { budget });
        }
        if self.queue.subscriber_count() == 0 {
            return Err(TransmitError::NoSubscribers);
        }
        let parts = frame_message(kind as u8, request_id, payload, budget)?;
        if !self.queue.enqueue(parts) {
            debug!("TX: queue shut down, dropping {kind:?}");
        }
        Ok(())
    }

    /// Stop the delivery worker. Pending replies are discarded.
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}
