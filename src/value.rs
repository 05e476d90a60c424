//! Dynamically typed control values.
//!
//! A [`Value`] is what travels on the wire: one of a small closed set of
//! variants, each tagged with a [`ValueType`]. The coercion accessors are
//! total (never fail) so a value decoded from the wire can be applied to
//! a statically typed handler regardless of which variant the client
//! chose to send.

use core::fmt;

// ── Wire type tags ───────────────────────────────────────────

/// Value type tag as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    Integer = 0,
    String = 1,
    Boolean = 2,
    Color = 3,
    Float = 4,
}

impl ValueType {
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Integer),
            1 => Some(Self::String),
            2 => Some(Self::Boolean),
            3 => Some(Self::Color),
            4 => Some(Self::Float),
            _ => None,
        }
    }
}

// ── RGBW color ───────────────────────────────────────────────

/// Four-channel 8-bit color.
///
/// Packed as `0xWWRRGGBB`: white/intensity in the most significant byte,
/// then red, green, blue. The same channel order is used for the four raw
/// bytes on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgbw {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl Rgbw {
    pub const OFF: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    pub const fn from_packed(packed: u32) -> Self {
        let [w, r, g, b] = packed.to_be_bytes();
        Self { r, g, b, w }
    }

    pub const fn packed(self) -> u32 {
        u32::from_be_bytes(self.wire_bytes())
    }

    /// Channel bytes in wire order (`w, r, g, b`).
    pub const fn wire_bytes(self) -> [u8; 4] {
        [self.w, self.r, self.g, self.b]
    }

    pub const fn from_wire_bytes(bytes: [u8; 4]) -> Self {
        let [w, r, g, b] = bytes;
        Self { r, g, b, w }
    }

    pub fn is_off(self) -> bool {
        self == Self::OFF
    }
}

impl fmt::Display for Rgbw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{},{},{}}}", self.r, self.g, self.b, self.w)
    }
}

// ── Value ────────────────────────────────────────────────────

/// A single dynamically typed control value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    Text(String),
    Boolean(bool),
    Color(Rgbw),
    Float(f32),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Integer(_) => ValueType::Integer,
            Self::Text(_) => ValueType::String,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Color(_) => ValueType::Color,
            Self::Float(_) => ValueType::Float,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Integer(v) => v.to_string(),
            Self::Text(v) => v.clone(),
            Self::Boolean(v) => (if *v { "true" } else { "false" }).into(),
            Self::Color(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
        }
    }

    /// Integer view. Booleans map to 1/0, colors to their packed form,
    /// floats truncate toward zero (saturating), text is 0.
    pub fn as_integer(&self) -> i32 {
        match self {
            Self::Integer(v) => *v,
            Self::Text(_) => 0,
            Self::Boolean(v) => i32::from(*v),
            Self::Color(v) => v.packed() as i32,
            Self::Float(v) => *v as i32,
        }
    }

    pub fn as_boolean(&self) -> bool {
        match self {
            Self::Integer(v) => *v > 0,
            Self::Text(_) => false,
            Self::Boolean(v) => *v,
            Self::Color(v) => !v.is_off(),
            Self::Float(v) => *v > 0.0,
        }
    }

    pub fn as_float(&self) -> f32 {
        match self {
            Self::Float(v) => *v,
            other => other.as_integer() as f32,
        }
    }

    pub fn as_color(&self) -> Rgbw {
        match self {
            Self::Color(v) => *v,
            Self::Integer(v) => Rgbw::from_packed(*v as u32),
            _ => Rgbw::OFF,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Self::Integer(i32::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

impl From<Rgbw> for Value {
    fn from(v: Rgbw) -> Self {
        Self::Color(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}
