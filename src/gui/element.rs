//! Control elements and path-addressed value access.
//!
//! Every node is an [`Element`]: a name, a presentation flag and a closed
//! [`ElementKind`]. Reads and writes are free functions over the kind so
//! the compiler checks that every variant is handled.
//!
//! Path rules:
//! - a named group consumes exactly one segment (its own name) and needs
//!   at least one more for the child;
//! - a leaf requires the residual path to be exactly its own name.

use log::debug;

use crate::handler::{
    BoolHandler, ColorHandler, FloatHandler, IndexHandler, Int32Handler, SharedTrigger, TextHandler,
};
use crate::value::Value;

/// One node of the control tree.
pub struct Element {
    pub name: String,
    /// Presentation hint for the client, no protocol effect.
    pub advanced: bool,
    pub kind: ElementKind,
}

/// Closed set of control types.
pub enum ElementKind {
    Group(Group),
    Range(RangeField),
    Checkbox(CheckboxField),
    Radio(ChoiceField),
    DropDown(ChoiceField),
    Button(ButtonField),
    NumberField(NumberField),
    TextField(TextField),
    PasswordField(TextField),
    ColorField(ColorField),
    Readout(ReadoutField),
}

#[derive(Default)]
pub struct Group {
    /// `None`: not collapsible. `Some(c)`: collapsible, currently collapsed if `c`.
    pub collapsed: Option<bool>,
    pub elements: Vec<Element>,
}

pub struct RangeField {
    pub min: i32,
    pub max: i32,
    pub handler: Option<Int32Handler>,
}

pub struct CheckboxField {
    pub handler: Option<BoolHandler>,
}

/// Backs both radio groups and drop-downs: an index into `items`.
pub struct ChoiceField {
    pub items: Vec<String>,
    pub handler: Option<IndexHandler>,
}

pub struct ButtonField {
    pub trigger: Option<SharedTrigger>,
}

pub struct NumberField {
    /// Client-side hint only; writes are still accepted.
    pub read_only: bool,
    pub handler: Option<Int32Handler>,
}

pub struct TextField {
    pub max_length: u16,
    pub send_value_to_client: bool,
    pub handler: Option<TextHandler>,
}

pub struct ColorField {
    /// Channel mask string shown by the client, e.g. `"RGBW"`.
    pub channels: String,
    pub handler: Option<ColorHandler>,
}

/// Display-only element; writes are rejected.
pub struct ReadoutField {
    pub source: ReadoutSource,
}

pub enum ReadoutSource {
    Integer(Option<Int32Handler>),
    Float(Option<FloatHandler>),
}

// ── Construction ─────────────────────────────────────────────

impl Element {
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            advanced: false,
            kind,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Group(Group::default()))
    }

    pub fn range(name: impl Into<String>, min: i32, max: i32, handler: Option<Int32Handler>) -> Self {
        // A reversed range would make clamping panic.
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self::new(name, ElementKind::Range(RangeField { min, max, handler }))
    }

    pub fn checkbox(name: impl Into<String>, handler: Option<BoolHandler>) -> Self {
        Self::new(name, ElementKind::Checkbox(CheckboxField { handler }))
    }

    pub fn radio(name: impl Into<String>, items: Vec<String>, handler: Option<IndexHandler>) -> Self {
        Self::new(name, ElementKind::Radio(ChoiceField { items, handler }))
    }

    pub fn drop_down(name: impl Into<String>, items: Vec<String>, handler: Option<IndexHandler>) -> Self {
        Self::new(name, ElementKind::DropDown(ChoiceField { items, handler }))
    }

    pub fn button(name: impl Into<String>, trigger: Option<SharedTrigger>) -> Self {
        Self::new(name, ElementKind::Button(ButtonField { trigger }))
    }

    pub fn number_field(name: impl Into<String>, handler: Option<Int32Handler>) -> Self {
        Self::new(
            name,
            ElementKind::NumberField(NumberField {
                read_only: false,
                handler,
            }),
        )
    }

    pub fn text_field(name: impl Into<String>, handler: Option<TextHandler>, max_length: u16) -> Self {
        Self::new(
            name,
            ElementKind::TextField(TextField {
                max_length,
                send_value_to_client: true,
                handler,
            }),
        )
    }

    pub fn password_field(name: impl Into<String>, handler: Option<TextHandler>, max_length: u16) -> Self {
        Self::new(
            name,
            ElementKind::PasswordField(TextField {
                max_length,
                send_value_to_client: false,
                handler,
            }),
        )
    }

    pub fn color_field(name: impl Into<String>, handler: Option<ColorHandler>, channels: impl Into<String>) -> Self {
        Self::new(
            name,
            ElementKind::ColorField(ColorField {
                channels: channels.into(),
                handler,
            }),
        )
    }

    pub fn readout(name: impl Into<String>, source: ReadoutSource) -> Self {
        Self::new(name, ElementKind::Readout(ReadoutField { source }))
    }

    pub fn as_group(&self) -> Option<&Group> {
        match &self.kind {
            ElementKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.kind {
            ElementKind::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Whether reads of this element may be disclosed to clients.
    pub fn discloses_value(&self) -> bool {
        match &self.kind {
            ElementKind::TextField(t) => t.send_value_to_client,
            ElementKind::PasswordField(_) => false,
            _ => true,
        }
    }

    fn is_leaf_path<S: AsRef<str>>(&self, path: &[S]) -> bool {
        path.len() == 1 && path[0].as_ref() == self.name
    }
}

impl Group {
    pub fn child<S: AsRef<str>>(&self, name: S) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name.as_ref())
    }

    pub fn child_mut<S: AsRef<str>>(&mut self, name: S) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.name == name.as_ref())
    }

    /// Append a child. Sibling names must be unique; a duplicate is
    /// rejected and handed back.
    pub fn push(&mut self, element: Element) -> Result<(), Element> {
        if self.child(&element.name).is_some() {
            return Err(element);
        }
        self.elements.push(element);
        Ok(())
    }
}

// ── Reads ────────────────────────────────────────────────────

/// Look up the value at `path`, where `path[0]` names `element` itself.
pub fn get_value<S: AsRef<str>>(element: &Element, path: &[S]) -> Option<Value> {
    if let ElementKind::Group(group) = &element.kind {
        if path.len() < 2 || path[0].as_ref() != element.name {
            return None;
        }
        return get_in_group(group, &path[1..]);
    }

    if !element.is_leaf_path(path) {
        return None;
    }

    match &element.kind {
        ElementKind::Group(_) => None,
        ElementKind::Range(f) => f.handler.as_ref().map(|h| Value::Integer(h.get())),
        ElementKind::Checkbox(f) => f.handler.as_ref().map(|h| Value::Boolean(h.get())),
        ElementKind::Radio(f) | ElementKind::DropDown(f) => {
            f.handler.as_ref().map(|h| Value::from(h.get()))
        }
        ElementKind::Button(_) => Some(Value::Boolean(false)),
        ElementKind::NumberField(f) => f.handler.as_ref().map(|h| Value::Integer(h.get())),
        ElementKind::TextField(f) | ElementKind::PasswordField(f) => {
            f.handler.as_ref().map(|h| Value::Text(h.get()))
        }
        ElementKind::ColorField(f) => f.handler.as_ref().map(|h| Value::Color(h.get())),
        ElementKind::Readout(f) => match &f.source {
            ReadoutSource::Integer(h) => h.as_ref().map(|h| Value::Integer(h.get())),
            ReadoutSource::Float(h) => h.as_ref().map(|h| Value::Float(h.get())),
        },
    }
}

/// Look up `path` among the children of `group` (no segment for the group).
pub fn get_in_group<S: AsRef<str>>(group: &Group, path: &[S]) -> Option<Value> {
    let first = path.first()?;
    get_value(group.child(first)?, path)
}

/// Find the element addressed by `path` among the children of `group`.
pub fn find_in_group<'a, S: AsRef<str>>(group: &'a Group, path: &[S]) -> Option<&'a Element> {
    let (first, rest) = path.split_first()?;
    let element = group.child(first)?;
    if rest.is_empty() {
        return Some(element);
    }
    find_in_group(element.as_group()?, rest)
}

pub fn find_in_group_mut<'a, S: AsRef<str>>(group: &'a mut Group, path: &[S]) -> Option<&'a mut Element> {
    let (first, rest) = path.split_first()?;
    let element = group.child_mut(first)?;
    if rest.is_empty() {
        return Some(element);
    }
    find_in_group_mut(element.as_group_mut()?, rest)
}

// ── Writes ───────────────────────────────────────────────────

/// Apply `value` at `path`, where `path[0]` names `element` itself.
///
/// Returns `false` for an unknown path, a missing handler or a read-only
/// element.
pub fn set_value<S: AsRef<str>>(element: &mut Element, path: &[S], value: &Value) -> bool {
    if let ElementKind::Group(group) = &mut element.kind {
        if path.len() < 2 || path[0].as_ref() != element.name {
            return false;
        }
        return set_in_group(group, &path[1..], value);
    }

    if !element.is_leaf_path(path) {
        return false;
    }

    match &element.kind {
        ElementKind::Group(_) => false,
        ElementKind::Range(f) => write(&f.handler, value.as_integer().clamp(f.min, f.max)),
        ElementKind::Checkbox(f) => write(&f.handler, value.as_boolean()),
        ElementKind::Radio(f) | ElementKind::DropDown(f) => {
            write(&f.handler, clamp_index(value.as_integer(), f.items.len()))
        }
        ElementKind::Button(f) => match &f.trigger {
            Some(trigger) => {
                trigger.on_trigger();
                true
            }
            None => false,
        },
        ElementKind::NumberField(f) => write(&f.handler, value.as_integer()),
        ElementKind::TextField(f) | ElementKind::PasswordField(f) => {
            write(&f.handler, value.as_text())
        }
        ElementKind::ColorField(f) => write(&f.handler, value.as_color()),
        ElementKind::Readout(_) => {
            debug!("GUI: rejecting write to read-only '{}'", element.name);
            false
        }
    }
}

/// Apply `value` at `path` among the children of `group`.
pub fn set_in_group<S: AsRef<str>>(group: &mut Group, path: &[S], value: &Value) -> bool {
    let Some(first) = path.first() else {
        return false;
    };
    match group.child_mut(first) {
        Some(element) => set_value(element, path, value),
        None => false,
    }
}

fn write<T>(handler: &Option<crate::handler::SharedHandler<T>>, value: T) -> bool {
    match handler {
        Some(h) => {
            h.set(value);
            true
        }
        None => false,
    }
}

/// Clamp a selection index to the valid item range `[0, len - 1]`.
fn clamp_index(raw: i32, len: usize) -> u16 {
    let last = len.saturating_sub(1).min(usize::from(u16::MAX)) as i32;
    raw.clamp(0, last) as u16
}
