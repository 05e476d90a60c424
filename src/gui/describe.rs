//! Structural dump of the control tree.
//!
//! The web client relies on key order: `type`, `name`, `advanced` (only
//! when set), type-specific fields, then `value` for leaves or `elements`
//! for groups. `serde_json::Value` would sort keys, so the dump is
//! written through `serialize_map` directly.

use log::warn;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::element::{Element, ElementKind, Group, ReadoutSource};
use crate::handler::SharedHandler;

pub const TYPE_ROOT: &str = "root";
pub const TYPE_GROUP: &str = "group";
pub const TYPE_RANGE: &str = "range";
pub const TYPE_CHECKBOX: &str = "checkbox";
pub const TYPE_RADIO: &str = "radio";
pub const TYPE_DROPDOWN: &str = "dropdown";
pub const TYPE_BUTTON: &str = "button";
pub const TYPE_NUMBER_FIELD: &str = "numberfield_int32";
pub const TYPE_TEXT_FIELD: &str = "textfield";
pub const TYPE_PASSWORD: &str = "password";
pub const TYPE_COLOR: &str = "RGBWRange";
pub const TYPE_READOUT: &str = "Compass";

/// Wire `type` name of an element.
pub fn type_name(kind: &ElementKind) -> &'static str {
    match kind {
        ElementKind::Group(_) => TYPE_GROUP,
        ElementKind::Range(_) => TYPE_RANGE,
        ElementKind::Checkbox(_) => TYPE_CHECKBOX,
        ElementKind::Radio(_) => TYPE_RADIO,
        ElementKind::DropDown(_) => TYPE_DROPDOWN,
        ElementKind::Button(_) => TYPE_BUTTON,
        ElementKind::NumberField(_) => TYPE_NUMBER_FIELD,
        ElementKind::TextField(_) => TYPE_TEXT_FIELD,
        ElementKind::PasswordField(_) => TYPE_PASSWORD,
        ElementKind::ColorField(_) => TYPE_COLOR,
        ElementKind::Readout(_) => TYPE_READOUT,
    }
}

/// Serialize adaptor for a single element (and its subtree).
pub struct Describe<'a>(pub &'a Element);

/// Serialize adaptor for the unnamed root group.
pub struct DescribeRoot<'a>(pub &'a Group);

struct Children<'a>(&'a [Element]);

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(self.0.iter().map(Describe))
    }
}

/// Read through a handler, or the type's default when none is attached.
fn read<T: Default>(handler: &Option<SharedHandler<T>>) -> T {
    handler.as_ref().map(|h| h.get()).unwrap_or_default()
}

impl Serialize for Describe<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let e = self.0;
        let mut map = s.serialize_map(None)?;
        map.serialize_entry("type", type_name(&e.kind))?;
        map.serialize_entry("name", &e.name)?;
        if e.advanced {
            map.serialize_entry("advanced", &true)?;
        }

        match &e.kind {
            ElementKind::Group(g) => {
                if let Some(collapsed) = g.collapsed {
                    map.serialize_entry("collapsed", &collapsed)?;
                }
                map.serialize_entry("elements", &Children(&g.elements))?;
            }
            ElementKind::Range(f) => {
                map.serialize_entry("min", &f.min)?;
                map.serialize_entry("max", &f.max)?;
                map.serialize_entry("value", &read(&f.handler))?;
            }
            ElementKind::Checkbox(f) => {
                map.serialize_entry("value", &u8::from(read(&f.handler)))?;
            }
            ElementKind::Radio(f) | ElementKind::DropDown(f) => {
                map.serialize_entry("items", &f.items)?;
                map.serialize_entry("value", &read(&f.handler))?;
            }
            ElementKind::Button(_) => {}
            ElementKind::NumberField(f) => {
                map.serialize_entry("value", &read(&f.handler))?;
                map.serialize_entry("readOnly", &f.read_only)?;
            }
            ElementKind::TextField(f) | ElementKind::PasswordField(f) => {
                map.serialize_entry("maxLength", &f.max_length)?;
                if e.discloses_value() {
                    map.serialize_entry("value", &read(&f.handler))?;
                } else {
                    map.serialize_entry("value", "")?;
                }
            }
            ElementKind::ColorField(f) => {
                map.serialize_entry("channel", &f.channels)?;
                map.serialize_entry("value", &read(&f.handler).packed())?;
            }
            ElementKind::Readout(f) => match &f.source {
                ReadoutSource::Integer(h) => map.serialize_entry("value", &read(h))?,
                ReadoutSource::Float(h) => map.serialize_entry("value", &read(h))?,
            },
        }
        map.end()
    }
}

impl Serialize for DescribeRoot<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(3))?;
        map.serialize_entry("type", TYPE_ROOT)?;
        map.serialize_entry("name", "")?;
        map.serialize_entry("elements", &Children(&self.0.elements))?;
        map.end()
    }
}

/// Render the whole tree as the GUIData body.
pub fn describe_root(root: &Group) -> String {
    match serde_json::to_string(&DescribeRoot(root)) {
        Ok(s) => s,
        Err(e) => {
            warn!("GUI: structural dump failed: {e}");
            String::new()
        }
    }
}

/// Render a single element subtree.
pub fn describe(element: &Element) -> String {
    match serde_json::to_string(&Describe(element)) {
        Ok(s) => s,
        Err(e) => {
            warn!("GUI: dump of '{}' failed: {e}", element.name);
            String::new()
        }
    }
}
