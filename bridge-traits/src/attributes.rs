//! Tagged attribute values exchanged with native attribute stores.
//!
//! Native media APIs hand out attribute values as untyped unions whose active
//! member is selected by a discriminant. [`PropVariant`] keeps that
//! discriminant explicit so callers match on the variant instead of
//! reinterpreting raw memory.

use bytes::Bytes;
use uuid::Uuid;

/// Typed value of a native attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum PropVariant {
    /// No value stored.
    Empty,
    Int32(i32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    Guid(Uuid),
    String(String),
    Blob(Bytes),
    /// Value with a discriminant this layer does not interpret.
    Unknown(u16),
}

impl PropVariant {
    /// Interpret the value as a signed 64-bit integer.
    ///
    /// Narrower integers widen; unsigned values that do not fit return `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropVariant::Int32(v) => Some(*v as i64),
            PropVariant::Int64(v) => Some(*v),
            PropVariant::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropVariant::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            PropVariant::Guid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropVariant::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Bytes> {
        match self {
            PropVariant::Blob(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` if no value is stored.
    pub fn is_empty(&self) -> bool {
        matches!(self, PropVariant::Empty)
    }

    /// Short name of the active variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropVariant::Empty => "empty",
            PropVariant::Int32(_) => "int32",
            PropVariant::Int64(_) => "int64",
            PropVariant::UInt64(_) => "uint64",
            PropVariant::Double(_) => "double",
            PropVariant::Guid(_) => "guid",
            PropVariant::String(_) => "string",
            PropVariant::Blob(_) => "blob",
            PropVariant::Unknown(_) => "unknown",
        }
    }
}

impl From<i32> for PropVariant {
    fn from(value: i32) -> Self {
        PropVariant::Int32(value)
    }
}

impl From<i64> for PropVariant {
    fn from(value: i64) -> Self {
        PropVariant::Int64(value)
    }
}

impl From<u64> for PropVariant {
    fn from(value: u64) -> Self {
        PropVariant::UInt64(value)
    }
}

impl From<f64> for PropVariant {
    fn from(value: f64) -> Self {
        PropVariant::Double(value)
    }
}

impl From<Uuid> for PropVariant {
    fn from(value: Uuid) -> Self {
        PropVariant::Guid(value)
    }
}

impl From<String> for PropVariant {
    fn from(value: String) -> Self {
        PropVariant::String(value)
    }
}

impl From<Bytes> for PropVariant {
    fn from(value: Bytes) -> Self {
        PropVariant::Blob(value)
    }
}

/// Presentation-level attributes a decoder source can be queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentationAttribute {
    /// Total duration in ticks (`Int64`/`UInt64`).
    Duration,
    /// Average encoded bitrate in bits per second (`Int32`/`Int64`).
    AverageBitrate,
    /// Container MIME type (`String`).
    MimeType,
}

impl PresentationAttribute {
    pub fn name(&self) -> &'static str {
        match self {
            PresentationAttribute::Duration => "duration",
            PresentationAttribute::AverageBitrate => "average_bitrate",
            PresentationAttribute::MimeType => "mime_type",
        }
    }
}
