//! Fluent tree construction.
//!
//! Open groups live on an explicit stack; `end_group` pops the innermost
//! one and attaches it to its parent. Modifiers such as [`GuiBuilder::advanced`]
//! apply to the element added (or group opened) most recently.
//!
//! ```
//! use bleremote::gui::GuiBuilder;
//! use bleremote::handler::ValueCell;
//!
//! let root = GuiBuilder::new()
//!     .group("lighting")
//!     .collapsible(false)
//!     .range("brightness", 0, 255, ValueCell::shared(128))
//!     .checkbox("enabled", ValueCell::shared(true))
//!     .advanced()
//!     .end_group()
//!     .build();
//! assert_eq!(root.elements.len(), 1);
//! ```

use log::warn;

use super::element::{Element, ElementKind, Group, ReadoutSource};
use crate::handler::{
    BoolHandler, ColorHandler, FloatHandler, IndexHandler, Int32Handler, SharedTrigger, TextHandler,
};

pub const DEFAULT_TEXT_MAX_LENGTH: u16 = 32;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Cursor {
    None,
    /// Last element of the current container.
    Leaf,
    /// Innermost open group.
    OpenGroup,
}

#[must_use]
pub struct GuiBuilder {
    root: Group,
    open: Vec<Element>,
    cursor: Cursor,
}

impl Default for GuiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GuiBuilder {
    pub fn new() -> Self {
        Self {
            root: Group::default(),
            open: Vec::new(),
            cursor: Cursor::None,
        }
    }

    fn container(&mut self) -> &mut Group {
        match self.open.last_mut().and_then(Element::as_group_mut) {
            Some(g) => g,
            None => &mut self.root,
        }
    }

    fn target(&mut self) -> Option<&mut Element> {
        match self.cursor {
            Cursor::None => None,
            Cursor::OpenGroup => self.open.last_mut(),
            Cursor::Leaf => self.container().elements.last_mut(),
        }
    }

    fn modify(mut self, what: &str, f: impl FnOnce(&mut Element) -> bool) -> Self {
        match self.target() {
            Some(e) => {
                if !f(&mut *e) {
                    warn!("GUI: '{what}' does not apply to '{}'", e.name);
                }
            }
            None => warn!("GUI: '{what}' with no element to apply to"),
        }
        self
    }

    /// Attach an already-built element to the current group.
    pub fn add(mut self, element: Element) -> Self {
        match self.container().push(element) {
            Ok(()) => self.cursor = Cursor::Leaf,
            Err(dup) => {
                warn!("GUI: duplicate sibling name '{}' ignored", dup.name);
                self.cursor = Cursor::None;
            }
        }
        self
    }

    /// Open a nested group; elements added until [`end_group`](Self::end_group) go inside it.
    pub fn group(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if self.container().child(&name).is_some() {
            warn!("GUI: duplicate group name '{name}'");
        }
        self.open.push(Element::group(name));
        self.cursor = Cursor::OpenGroup;
        self
    }

    pub fn end_group(mut self) -> Self {
        let Some(done) = self.open.pop() else {
            warn!("GUI: end_group without open group");
            return self;
        };
        if let Err(dup) = self.container().push(done) {
            warn!("GUI: duplicate group name '{}' dropped", dup.name);
            self.cursor = Cursor::None;
        } else {
            self.cursor = Cursor::Leaf;
        }
        self
    }

    pub fn range(self, name: impl Into<String>, min: i32, max: i32, handler: Int32Handler) -> Self {
        self.add(Element::range(name, min, max, Some(handler)))
    }

    pub fn checkbox(self, name: impl Into<String>, handler: BoolHandler) -> Self {
        self.add(Element::checkbox(name, Some(handler)))
    }

    pub fn radio(self, name: impl Into<String>, items: &[&str], handler: IndexHandler) -> Self {
        self.add(Element::radio(name, to_items(items), Some(handler)))
    }

    pub fn drop_down(self, name: impl Into<String>, items: &[&str], handler: IndexHandler) -> Self {
        self.add(Element::drop_down(name, to_items(items), Some(handler)))
    }

    pub fn button(self, name: impl Into<String>, trigger: SharedTrigger) -> Self {
        self.add(Element::button(name, Some(trigger)))
    }

    pub fn number_field(self, name: impl Into<String>, handler: Int32Handler) -> Self {
        self.add(Element::number_field(name, Some(handler)))
    }

    pub fn text_field(self, name: impl Into<String>, handler: TextHandler) -> Self {
        self.add(Element::text_field(name, Some(handler), DEFAULT_TEXT_MAX_LENGTH))
    }

    pub fn password_field(self, name: impl Into<String>, handler: TextHandler) -> Self {
        self.add(Element::password_field(name, Some(handler), DEFAULT_TEXT_MAX_LENGTH))
    }

    pub fn color_field(self, name: impl Into<String>, handler: ColorHandler, channels: &str) -> Self {
        self.add(Element::color_field(name, Some(handler), channels))
    }

    pub fn compass(self, name: impl Into<String>, handler: Int32Handler) -> Self {
        self.add(Element::readout(name, ReadoutSource::Integer(Some(handler))))
    }

    pub fn compass_f32(self, name: impl Into<String>, handler: FloatHandler) -> Self {
        self.add(Element::readout(name, ReadoutSource::Float(Some(handler))))
    }

    // ── Modifiers ────────────────────────────────────────────

    pub fn advanced(self) -> Self {
        self.modify("advanced", |e| {
            e.advanced = true;
            true
        })
    }

    /// Make the current group collapsible, initially collapsed or not.
    pub fn collapsible(self, collapsed: bool) -> Self {
        self.modify("collapsible", |e| match e.as_group_mut() {
            Some(g) => {
                g.collapsed = Some(collapsed);
                true
            }
            None => false,
        })
    }

    pub fn read_only(self) -> Self {
        self.modify("read_only", |e| match &mut e.kind {
            ElementKind::NumberField(f) => {
                f.read_only = true;
                true
            }
            _ => false,
        })
    }

    pub fn max_length(self, max: u16) -> Self {
        self.modify("max_length", |e| match &mut e.kind {
            ElementKind::TextField(f) | ElementKind::PasswordField(f) => {
                f.max_length = max;
                true
            }
            _ => false,
        })
    }

    /// Whether a text field's value may be disclosed to clients.
    /// Password fields ignore this and never disclose.
    pub fn send_value_to_client(self, send: bool) -> Self {
        self.modify("send_value_to_client", |e| match &mut e.kind {
            ElementKind::TextField(f) => {
                f.send_value_to_client = send;
                true
            }
            _ => false,
        })
    }

    /// Close any groups left open and return the root.
    pub fn build(mut self) -> Group {
        if !self.open.is_empty() {
            warn!("GUI: {} group(s) left open at build, closing", self.open.len());
        }
        while !self.open.is_empty() {
            self = self.end_group();
        }
        self.root
    }
}

fn to_items(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
