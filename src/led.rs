//! Named color outputs addressed by transport identifier.
//!
//! Each output gets the identifier of its name (see [`crate::identifier`]).
//! A raw write of `r, g, b, w` to that identifier drives the output's
//! callback; the info channel answers `0x00 "list"` with one record per
//! output so a client can discover them.

use core::fmt;
use std::collections::BTreeMap;

use log::{debug, info};

use crate::identifier::{self, Uuid};
use crate::value::Rgbw;

/// Info request opcode.
pub const INFO_REQUEST: u8 = 0x00;
/// Info record opcode (version 1 format).
pub const INFO_RECORD_V1: u8 = 0x01;
pub const LIST_COMMAND: &[u8] = b"list";

/// Which channels an output actually drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChannels {
    pub r: bool,
    pub g: bool,
    pub b: bool,
    pub w: bool,
}

impl ColorChannels {
    pub const RGBW: Self = Self {
        r: true,
        g: true,
        b: true,
        w: true,
    };

    /// Parse a mask such as `"RGB"` or `"w"`. Unknown letters are ignored.
    pub fn parse(mask: &str) -> Self {
        let mut c = Self {
            r: false,
            g: false,
            b: false,
            w: false,
        };
        for ch in mask.chars() {
            match ch.to_ascii_uppercase() {
                'R' => c.r = true,
                'G' => c.g = true,
                'B' => c.b = true,
                'W' => c.w = true,
                _ => {}
            }
        }
        c
    }
}

impl Default for ColorChannels {
    fn default() -> Self {
        Self::RGBW
    }
}

impl fmt::Display for ColorChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, ch) in [(self.r, "R"), (self.g, "G"), (self.b, "B"), (self.w, "W")] {
            if on {
                f.write_str(ch)?;
            }
        }
        Ok(())
    }
}

pub type ColorCallback = Box<dyn Fn(Rgbw) + Send + Sync>;

struct LedOutput {
    name: String,
    channels: ColorChannels,
    callback: ColorCallback,
}

/// Registry of named outputs, ordered by identifier.
#[derive(Default)]
pub struct LedRegistry {
    outputs: BTreeMap<Uuid, LedOutput>,
}

impl LedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an output; a later output with the same name replaces it.
    pub fn add_output(
        &mut self,
        name: &str,
        channels: ColorChannels,
        callback: impl Fn(Rgbw) + Send + Sync + 'static,
    ) -> Uuid {
        let id = identifier::identifier(name);
        info!("LED: mapping '{name}' on {id} ({channels})");
        let prev = self.outputs.insert(
            id,
            LedOutput {
                name: name.to_owned(),
                channels,
                callback: Box::new(callback),
            },
        );
        if prev.is_some() {
            debug!("LED: '{name}' replaced an earlier mapping");
        }
        id
    }

    pub fn ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.outputs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Raw write to an output. Fewer than four bytes turn it off.
    /// Returns `false` for an unknown identifier.
    pub fn on_color_write(&self, id: &Uuid, data: &[u8]) -> bool {
        let Some(out) = self.outputs.get(id) else {
            debug!("LED: write to unknown id {id}");
            return false;
        };
        let color = match data {
            [r, g, b, w, ..] => Rgbw::new(*r, *g, *b, *w),
            _ => Rgbw::OFF,
        };
        (out.callback)(color);
        true
    }

    /// Answer an info-channel request. Unknown requests yield nothing.
    pub fn handle_info_request(&self, data: &[u8]) -> Vec<Vec<u8>> {
        match data.split_first() {
            Some((&INFO_REQUEST, cmd)) if cmd == LIST_COMMAND => self.list_records(),
            Some((&INFO_REQUEST, cmd)) => {
                debug!("LED: unhandled info request {:?}", String::from_utf8_lossy(cmd));
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn list_records(&self) -> Vec<Vec<u8>> {
        self.outputs
            .iter()
            .map(|(id, out)| {
                let text = format!("{id}:{}:{}", out.name, out.channels);
                let mut rec = Vec::with_capacity(1 + text.len());
                rec.push(INFO_RECORD_V1);
                rec.extend_from_slice(text.as_bytes());
                rec
            })
            .collect()
    }
}
