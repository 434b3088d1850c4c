//! Typed values carried by Thing properties and action arguments.
//!
//! Inbound commands arrive as untyped JSON. [`ThingValue::from_json`] is the
//! single place where a JSON value is checked against the declared
//! [`PropertyType`] and turned into a typed value.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The declared type of a property or action parameter.
///
/// Serialized as its integer code (`number = 0`, `string = 1`,
/// `boolean = 2`, `color = 3`). Deserialization also accepts the lowercase
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Number,
    String,
    Boolean,
    Color,
}

impl PropertyType {
    /// Integer code used on the wire.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Number => 0,
            Self::String => 1,
            Self::Boolean => 2,
            Self::Color => 3,
        }
    }

    /// Inverse of [`code`](Self::code).
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Number),
            1 => Some(Self::String),
            2 => Some(Self::Boolean),
            3 => Some(Self::Color),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Color => "color",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "number" => Ok(Self::Number),
            "string" => Ok(Self::String),
            "boolean" | "bool" => Ok(Self::Boolean),
            "color" => Ok(Self::Color),
            other => Err(ValueError::UnknownType(other.to_string())),
        }
    }
}

impl Serialize for PropertyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for PropertyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Self::from_code(code)
                .ok_or_else(|| D::Error::custom(format!("unknown property type code {code}"))),
            Repr::Name(name) => name.parse().map_err(D::Error::custom),
        }
    }
}

/// An RGB color, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ValueError::InvalidColor(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ValueError::InvalidColor(s.to_string()))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// A typed property value or action argument.
///
/// Serialized untagged, so a value reads on the wire exactly as the JSON
/// scalar it holds. Colors deserialize as [`ThingValue::String`] when the
/// declared type is unknown; use [`ThingValue::from_json`] when it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThingValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Color(Color),
}

impl ThingValue {
    /// Convert an untyped JSON value into the variant matching `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Mismatch`] when the JSON kind does not fit `ty`,
    /// or [`ValueError::InvalidColor`] for a malformed color string.
    pub fn from_json(ty: PropertyType, value: &serde_json::Value) -> Result<Self, ValueError> {
        let mismatch = || ValueError::Mismatch {
            expected: ty,
            found: json_kind(value),
        };
        match ty {
            PropertyType::Number => value.as_f64().map(Self::Number).ok_or_else(mismatch),
            PropertyType::String => value
                .as_str()
                .map(|s| Self::String(s.to_string()))
                .ok_or_else(mismatch),
            PropertyType::Boolean => value.as_bool().map(Self::Boolean).ok_or_else(mismatch),
            PropertyType::Color => value.as_str().ok_or_else(mismatch)?.parse().map(Self::Color),
        }
    }

    /// The [`PropertyType`] this value satisfies.
    #[must_use]
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Boolean(_) => PropertyType::Boolean,
            Self::Number(_) => PropertyType::Number,
            Self::String(_) => PropertyType::String,
            Self::Color(_) => PropertyType::Color,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }
}

impl From<f64> for ThingValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ThingValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for ThingValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ThingValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Color> for ThingValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Failure to turn a raw value into a [`ThingValue`] or [`PropertyType`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: PropertyType,
        found: &'static str,
    },

    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),

    #[error("unknown property type {0:?}")]
    UnknownType(String),
}
