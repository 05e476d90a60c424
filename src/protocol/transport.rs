//! Transport abstraction: a notification channel to subscribed clients.
//!
//! The GUI server is generic over [`GattTransport`], so the protocol
//! logic runs unchanged against the Bluedroid adapter on target and
//! against an in-memory mock in host tests.
//!
//! Inbound traffic flows the other way: the transport delivers each
//! received message and each subscribe/unsubscribe event to the server
//! (`GuiServer::on_incoming_message`, `GuiServer::on_subscribe`).

use core::fmt;

/// Transport-level handle of one subscribed client (a connection id).
pub type SubscriberId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Transmit buffer full right now; retry the same message later.
    BufferFull,
    /// The subscriber is gone.
    NotConnected,
    /// Any other transport failure (carries the platform error code).
    Io(i32),
}

impl SendError {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::BufferFull)
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferFull => write!(f, "send buffer full"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Io(code) => write!(f, "transport error {code}"),
        }
    }
}

/// Outbound side of a message-oriented link.
pub trait GattTransport: Send + Sync {
    /// Content budget of one message on the current link, or `None` when
    /// no client is connected.
    fn content_budget(&self) -> Option<u16>;

    /// Send one message to one subscriber.
    fn notify(&self, subscriber: SubscriberId, data: &[u8]) -> Result<(), SendError>;
}

/// A transport with no link. Every transmit is skipped.
pub struct NullTransport;

impl GattTransport for NullTransport {
    fn content_budget(&self) -> Option<u16> {
        None
    }

    fn notify(&self, _subscriber: SubscriberId, _data: &[u8]) -> Result<(), SendError> {
        Err(SendError::NotConnected)
    }
}

impl<T: GattTransport + ?Sized> GattTransport for std::sync::Arc<T> {
    fn content_budget(&self) -> Option<u16> {
        (**self).content_budget()
    }

    fn notify(&self, subscriber: SubscriberId, data: &[u8]) -> Result<(), SendError> {
        (**self).notify(subscriber, data)
    }
}
