//! Client side of the GUI protocol.
//!
//! Builds requests with fresh correlation ids and turns received
//! transport messages back into events. Used by host tools and tests
//! that talk to a peripheral.

use std::collections::VecDeque;

use log::debug;

use super::codec::{self, BROADCAST_REQUEST_ID, ClientRequest, ServerMessage};
use super::fragment::Reassembler;
use crate::config::GuiConfig;
use crate::gui::path as wire_path;
use crate::value::Value;

/// Requests remembered for answer matching.
const MAX_OUTSTANDING: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Structural dump of the peripheral's tree.
    GuiData {
        request_id: u32,
        /// Whether this answers one of our own requests.
        own: bool,
        tree: serde_json::Value,
    },
    /// A value changed, either as a reply or as a broadcast.
    Update {
        request_id: u32,
        own: bool,
        path: Vec<String>,
        value: Value,
    },
}

pub struct GuiClient {
    next_id: u32,
    outstanding: VecDeque<u32>,
    reassembler: Reassembler,
}

impl Default for GuiClient {
    fn default() -> Self {
        Self::new(Reassembler::default())
    }
}

impl GuiClient {
    pub fn new(reassembler: Reassembler) -> Self {
        Self {
            next_id: 1,
            outstanding: VecDeque::with_capacity(MAX_OUTSTANDING),
            reassembler,
        }
    }

    /// Client whose reassembly cap is `config.max_transfer_len`.
    pub fn from_config(config: &GuiConfig) -> Self {
        let cap = usize::try_from(config.max_transfer_len).unwrap_or(usize::MAX);
        Self::new(Reassembler::new(cap))
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        if self.next_id == BROADCAST_REQUEST_ID {
            self.next_id = 0;
        }
        if self.outstanding.len() == MAX_OUTSTANDING {
            self.outstanding.pop_front();
        }
        self.outstanding.push_back(id);
        id
    }

    /// Encoded RequestGUI message and its correlation id.
    pub fn request_gui(&mut self) -> (u32, Vec<u8>) {
        let id = self.alloc_id();
        (id, codec::encode_request(id, &ClientRequest::RequestGui))
    }

    /// Encoded SetValue message and its correlation id.
    pub fn set_value<S: AsRef<str>>(&mut self, path: &[S], value: Value) -> (u32, Vec<u8>) {
        let id = self.alloc_id();
        let body = ClientRequest::SetValue {
            path: wire_path::join(path),
            value,
        };
        (id, codec::encode_request(id, &body))
    }

    fn answered(&mut self, request_id: u32) -> bool {
        if request_id == BROADCAST_REQUEST_ID {
            return false;
        }
        match self.outstanding.iter().position(|id| *id == request_id) {
            Some(pos) => {
                self.outstanding.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Feed one received transport message.
    pub fn feed(&mut self, msg: &[u8]) -> Option<ClientEvent> {
        let assembled = self.reassembler.feed(msg)?;
        let message = match codec::decode_server_message(assembled.kind, &assembled.payload) {
            Ok(m) => m,
            Err(e) => {
                debug!("client: dropped server message: {e}");
                return None;
            }
        };
        let request_id = assembled.request_id;
        let own = self.answered(request_id);

        match message {
            ServerMessage::GuiData(dump) => match serde_json::from_str(&dump) {
                Ok(tree) => Some(ClientEvent::GuiData {
                    request_id,
                    own,
                    tree,
                }),
                Err(e) => {
                    debug!("client: GUI dump is not valid JSON: {e}");
                    None
                }
            },
            ServerMessage::UpdateValue { path, value } => Some(ClientEvent::Update {
                request_id,
                own,
                path: wire_path::split(&path).into_iter().map(str::to_owned).collect(),
                value,
            }),
        }
    }

    /// Drop any partial transfer, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.reassembler.reset();
        self.outstanding.clear();
    }
}
