//! Conversion between host values and the engine's tagged formats.

use std::ffi::c_int;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EventValue;

/// Engine format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(i32)]
pub enum Format {
    None = 0,
    String = 1,
    OsdString = 2,
    Flag = 3,
    Int64 = 4,
    Double = 5,
    Node = 6,
    NodeArray = 7,
    NodeMap = 8,
    ByteArray = 9,
}

impl Format {
    #[inline]
    pub const fn as_raw(self) -> c_int {
        self as c_int
    }

    pub fn from_raw(raw: c_int) -> Option<Self> {
        Some(match raw {
            0 => Format::None,
            1 => Format::String,
            2 => Format::OsdString,
            3 => Format::Flag,
            4 => Format::Int64,
            5 => Format::Double,
            6 => Format::Node,
            7 => Format::NodeArray,
            8 => Format::NodeMap,
            9 => Format::ByteArray,
            _ => return None,
        })
    }

    /// Whether values of this format can cross the bridge.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            Format::None | Format::String | Format::OsdString | Format::Flag | Format::Int64 | Format::Double
        )
    }
}

/// Host-side property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    None,
    Flag(bool),
    Int64(i64),
    Double(f64),
    String(String),
}

impl PropertyValue {
    pub fn format(&self) -> Format {
        match self {
            PropertyValue::None => Format::None,
            PropertyValue::Flag(_) => Format::Flag,
            PropertyValue::Int64(_) => Format::Int64,
            PropertyValue::Double(_) => Format::Double,
            PropertyValue::String(_) => Format::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::None => f.write_str("<none>"),
            PropertyValue::Flag(v) => f.write_str(if *v { "yes" } else { "no" }),
            PropertyValue::Int64(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::String(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported property format tag {0}")]
pub struct UnsupportedFormat(pub c_int);

#[inline]
pub fn flag_to_native(value: bool) -> c_int {
    c_int::from(value)
}

#[inline]
pub fn flag_from_native(value: c_int) -> bool {
    value != 0
}

impl TryFrom<&EventValue> for PropertyValue {
    type Error = UnsupportedFormat;

    fn try_from(value: &EventValue) -> Result<Self, Self::Error> {
        Ok(match value {
            EventValue::None => PropertyValue::None,
            EventValue::Flag(v) => PropertyValue::Flag(flag_from_native(*v)),
            EventValue::Int64(v) => PropertyValue::Int64(*v),
            EventValue::Double(v) => PropertyValue::Double(*v),
            EventValue::String(v) => PropertyValue::String(v.to_string_lossy().into_owned()),
            EventValue::Unsupported(tag) => return Err(UnsupportedFormat(*tag)),
        })
    }
}
