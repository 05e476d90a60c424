//! Wire protocol: message codec, envelope framing, the transport port,
//! the outbound delivery queue and the request-dispatching server.

pub mod client;
pub mod codec;
pub mod fragment;
pub mod queue;
pub mod server;
pub mod transport;

pub use client::{ClientEvent, GuiClient};
pub use codec::BROADCAST_REQUEST_ID;
pub use queue::{OutboundQueue, QueueConfig, QueuePhase};
pub use server::GuiServer;
pub use transport::{GattTransport, NullTransport, SendError, SubscriberId};
