//! Attribute values as stored by the container.

use super::TypeClass;

/// A typed attribute payload.
///
/// These are the primitive constructs the container understands. Domain
/// concepts such as booleans and timestamps are layered on top by the
/// attribute codec in [`crate::odim`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Null-terminated string
    String(String),
    /// 64-bit signed integer scalar
    Int(i64),
    /// 64-bit float scalar
    Float(f64),
    /// Fixed-length array of 64-bit signed integers
    IntArray(Vec<i64>),
    /// Fixed-length array of 64-bit floats
    FloatArray(Vec<f64>),
}

impl Value {
    /// Primitive class of the stored value.
    pub fn class(&self) -> TypeClass {
        match self {
            Self::String(_) => TypeClass::String,
            Self::Int(_) | Self::IntArray(_) => TypeClass::Integer,
            Self::Float(_) | Self::FloatArray(_) => TypeClass::Float,
        }
    }

    /// Number of elements (1 for scalars and strings).
    pub fn len(&self) -> usize {
        match self {
            Self::String(_) | Self::Int(_) | Self::Float(_) => 1,
            Self::IntArray(v) => v.len(),
            Self::FloatArray(v) => v.len(),
        }
    }

    /// True for empty arrays.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage size in bytes. Strings count their terminating null.
    pub fn byte_size(&self) -> usize {
        match self {
            Self::String(s) => s.len() + 1,
            Self::Int(_) | Self::Float(_) => 8,
            Self::IntArray(v) => v.len() * 8,
            Self::FloatArray(v) => v.len() * 8,
        }
    }

    /// True for array values.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::IntArray(_) | Self::FloatArray(_))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Shape information about a stored attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrInfo {
    /// Primitive class
    pub class: TypeClass,
    /// Storage size in bytes
    pub byte_size: usize,
    /// Element count
    pub count: usize,
}

impl From<&Value> for AttrInfo {
    fn from(v: &Value) -> Self {
        Self {
            class: v.class(),
            byte_size: v.byte_size(),
            count: v.len(),
        }
    }
}
