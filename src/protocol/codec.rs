//! Binary message codec.
//!
//! Client requests arrive as single transport messages:
//! ```text
//! ┌──────────┬───────────────────┬──────────────────────┐
//! │ Kind (1B)│ Request id (4B BE)│ Body                 │
//! └──────────┴───────────────────┴──────────────────────┘
//! ```
//! Server messages carry the same kind/request id pair inside the
//! envelope header (see [`super::fragment`]); only the body is encoded here.
//!
//! Bodies:
//! - `RequestGUI`: empty.
//! - `SetValue` / `UpdateValue`: `[path len:4 BE][path][value]`, path
//!   segments comma-joined.
//! - `GUIData`: UTF-8 structural dump.
//!
//! Values are `[type tag:1][payload]`: Integer and Float 4 bytes BE,
//! Boolean 1 byte, String length-prefixed, Color 4 bytes `w,r,g,b`.
//!
//! Every length is checked against the remaining buffer before slicing.

use crate::error::DecodeError;
use crate::value::{Rgbw, Value, ValueType};

/// Request id marking unsolicited server pushes.
pub const BROADCAST_REQUEST_ID: u32 = 0xFFFF_FFFF;

/// Kind byte + request id.
pub const REQUEST_HEADER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientKind {
    RequestGui = 0x00,
    SetValue = 0x01,
}

impl ClientKind {
    pub fn from_tag(tag: u8) -> Result<Self, DecodeError> {
        match tag {
            0x00 => Ok(Self::RequestGui),
            0x01 => Ok(Self::SetValue),
            other => Err(DecodeError::UnknownKind(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerKind {
    GuiData = 0x00,
    UpdateValue = 0x01,
}

impl ServerKind {
    pub fn from_tag(tag: u8) -> Result<Self, DecodeError> {
        match tag {
            0x00 => Ok(Self::GuiData),
            0x01 => Ok(Self::UpdateValue),
            other => Err(DecodeError::UnknownKind(other)),
        }
    }
}

/// Decoded client request body.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    RequestGui,
    SetValue { path: String, value: Value },
}

impl ClientRequest {
    pub fn kind(&self) -> ClientKind {
        match self {
            Self::RequestGui => ClientKind::RequestGui,
            Self::SetValue { .. } => ClientKind::SetValue,
        }
    }
}

/// A client request with its correlation id.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub request_id: u32,
    pub body: ClientRequest,
}

/// Decoded server message body.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    GuiData(String),
    UpdateValue { path: String, value: Value },
}

impl ServerMessage {
    pub fn kind(&self) -> ServerKind {
        match self {
            Self::GuiData(_) => ServerKind::GuiData,
            Self::UpdateValue { .. } => ServerKind::UpdateValue,
        }
    }

    pub fn encode_body(&self) -> Vec<u8> {
        match self {
            Self::GuiData(dump) => dump.as_bytes().to_vec(),
            Self::UpdateValue { path, value } => encode_path_value(path, value),
        }
    }
}

// ── Reader ───────────────────────────────────────────────────

/// Bounds-checked cursor over a received buffer.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated);
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        self.array().map(u32::from_be_bytes)
    }

    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        self.array().map(i32::from_be_bytes)
    }

    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        self.array().map(f32::from_be_bytes)
    }

    /// Length-prefixed UTF-8 string.
    pub fn string(&mut self) -> Result<String, DecodeError> {
        let declared = self.u32()?;
        let available = self.remaining();
        if declared as usize > available {
            return Err(DecodeError::LengthOverflow {
                declared,
                available,
            });
        }
        let bytes = self.take(declared as usize)?;
        core::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }
}

// ── Values ───────────────────────────────────────────────────

pub fn put_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

pub fn encode_value(value: &Value, out: &mut Vec<u8>) {
    out.push(value.value_type().tag());
    match value {
        Value::Integer(v) => out.extend_from_slice(&v.to_be_bytes()),
        Value::Text(v) => put_string(out, v),
        Value::Boolean(v) => out.push(u8::from(*v)),
        Value::Color(v) => out.extend_from_slice(&v.wire_bytes()),
        Value::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
    }
}

pub fn decode_value(r: &mut Reader<'_>) -> Result<Value, DecodeError> {
    let tag = r.u8()?;
    let ty = ValueType::from_tag(tag).ok_or(DecodeError::UnknownValueType(tag))?;
    Ok(match ty {
        ValueType::Integer => Value::Integer(r.i32()?),
        ValueType::String => Value::Text(r.string()?),
        ValueType::Boolean => Value::Boolean(r.u8()? != 0),
        ValueType::Color => Value::Color(Rgbw::from_wire_bytes(r.array()?)),
        ValueType::Float => Value::Float(r.f32()?),
    })
}

/// `SetValue` / `UpdateValue` body.
pub fn encode_path_value(path: &str, value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + path.len() + 5);
    put_string(&mut out, path);
    encode_value(value, &mut out);
    out
}

pub fn decode_path_value(body: &[u8]) -> Result<(String, Value), DecodeError> {
    let mut r = Reader::new(body);
    let path = r.string()?;
    let value = decode_value(&mut r)?;
    Ok((path, value))
}

// ── Requests ─────────────────────────────────────────────────

pub fn decode_request(msg: &[u8]) -> Result<Request, DecodeError> {
    if msg.is_empty() {
        return Err(DecodeError::Empty);
    }
    let mut r = Reader::new(msg);
    let kind = ClientKind::from_tag(r.u8()?)?;
    let request_id = r.u32()?;
    let body = match kind {
        ClientKind::RequestGui => ClientRequest::RequestGui,
        ClientKind::SetValue => {
            let (path, value) = decode_path_value(r.rest())?;
            ClientRequest::SetValue { path, value }
        }
    };
    Ok(Request { request_id, body })
}

pub fn encode_request(request_id: u32, body: &ClientRequest) -> Vec<u8> {
    let mut out = Vec::with_capacity(REQUEST_HEADER_LEN);
    out.push(body.kind() as u8);
    out.extend_from_slice(&request_id.to_be_bytes());
    if let ClientRequest::SetValue { path, value } = body {
        out.extend_from_slice(&encode_path_value(path, value));
    }
    out
}

// ── Server messages ──────────────────────────────────────────

pub fn decode_server_message(kind: u8, payload: &[u8]) -> Result<ServerMessage, DecodeError> {
    match ServerKind::from_tag(kind)? {
        ServerKind::GuiData => core::str::from_utf8(payload)
            .map(|s| ServerMessage::GuiData(s.to_owned()))
            .map_err(|_| DecodeError::InvalidUtf8),
        ServerKind::UpdateValue => {
            let (path, value) = decode_path_value(payload)?;
            Ok(ServerMessage::UpdateValue { path, value })
        }
    }
}
