//! Typed attribute codec.
//!
//! Maps Rust values onto the primitive attributes of any node implementing
//! [`Attributes`]. Strings and arrays are replaced by delete and recreate,
//! fixed-width numeric scalars are overwritten in place. Timestamps are
//! stored as a `YYYYMMDD` date string plus a `HHMMSS` time string.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use super::constants::{ObjectType, ProductType, Quantity, VAL_FALSE, VAL_TRUE};
use crate::core::Attributes;
use crate::util::{AttrInfo, Error, Result, TypeClass, Value};

/// Largest string attribute accepted on read, including the terminator.
pub const STRING_BUFFER: usize = 2048;

/// Buffer for a `YYYYMMDD` date string.
const DATE_BUFFER: usize = 9;

/// Buffer for a `HHMMSS` time string.
const TIME_BUFFER: usize = 7;

const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year][month][day]");
const TIME_FORMAT: &[FormatItem<'_>] = format_description!("[hour][minute][second]");

// ============================================================================
// Attribute trait
// ============================================================================

/// A Rust type with a fixed mapping onto a stored attribute value.
pub trait Attribute: Sized {
    /// Primitive class expected on disk.
    const CLASS: TypeClass;

    /// Fixed-width scalars can be overwritten without resizing.
    const FIXED_WIDTH: bool = false;

    fn encode(&self) -> Value;

    fn decode(value: Value, path: &str, name: &str) -> Result<Self>;
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Int(_) => "integer",
        Value::Float(_) => "float",
        Value::IntArray(_) => "integer array",
        Value::FloatArray(_) => "float array",
    }
}

fn mismatch(path: &str, name: &str, expected: &str, value: &Value) -> Error {
    Error::TypeMismatch {
        path: path.to_string(),
        name: name.to_string(),
        expected: expected.to_string(),
        actual: describe(value).to_string(),
    }
}

impl Attribute for String {
    const CLASS: TypeClass = TypeClass::String;

    fn encode(&self) -> Value {
        Value::String(self.clone())
    }

    fn decode(value: Value, path: &str, name: &str) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch(path, name, "string", &other)),
        }
    }
}

impl Attribute for bool {
    const CLASS: TypeClass = TypeClass::String;

    fn encode(&self) -> Value {
        Value::from(if *self { VAL_TRUE } else { VAL_FALSE })
    }

    fn decode(value: Value, path: &str, name: &str) -> Result<Self> {
        let s = String::decode(value, path, name)?;
        match s.as_str() {
            VAL_TRUE => Ok(true),
            VAL_FALSE => Ok(false),
            _ => Err(Error::bad_value(path, name, s)),
        }
    }
}

impl Attribute for i64 {
    const CLASS: TypeClass = TypeClass::Integer;
    const FIXED_WIDTH: bool = true;

    fn encode(&self) -> Value {
        Value::Int(*self)
    }

    fn decode(value: Value, path: &str, name: &str) -> Result<Self> {
        match value {
            Value::Int(v) => Ok(v),
            Value::Float(v) => Ok(v as i64),
            other => Err(mismatch(path, name, "integer", &other)),
        }
    }
}

impl Attribute for f64 {
    const CLASS: TypeClass = TypeClass::Float;
    const FIXED_WIDTH: bool = true;

    fn encode(&self) -> Value {
        Value::Float(*self)
    }

    fn decode(value: Value, path: &str, name: &str) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(mismatch(path, name, "float", &other)),
        }
    }
}

impl Attribute for Vec<i64> {
    const CLASS: TypeClass = TypeClass::Integer;

    fn encode(&self) -> Value {
        Value::IntArray(self.clone())
    }

    fn decode(value: Value, path: &str, name: &str) -> Result<Self> {
        match value {
            Value::IntArray(v) => Ok(v),
            Value::FloatArray(v) => Ok(v.into_iter().map(|x| x as i64).collect()),
            other => Err(mismatch(path, name, "integer array", &other)),
        }
    }
}

impl Attribute for Vec<f64> {
    const CLASS: TypeClass = TypeClass::Float;

    fn encode(&self) -> Value {
        Value::FloatArray(self.clone())
    }

    fn decode(value: Value, path: &str, name: &str) -> Result<Self> {
        match value {
            Value::FloatArray(v) => Ok(v),
            Value::IntArray(v) => Ok(v.into_iter().map(|x| x as f64).collect()),
            other => Err(mismatch(path, name, "float array", &other)),
        }
    }
}

/// Enumerations stored as their string code.
macro_rules! impl_code_attribute {
    ($ty:ty) => {
        impl Attribute for $ty {
            const CLASS: TypeClass = TypeClass::String;

            fn encode(&self) -> Value {
                Value::from(self.as_str())
            }

            fn decode(value: Value, path: &str, name: &str) -> Result<Self> {
                let code = String::decode(value, path, name)?;
                <$ty>::from_code(&code).ok_or_else(|| Error::bad_value(path, name, code))
            }
        }
    };
}

impl_code_attribute!(ObjectType);
impl_code_attribute!(ProductType);

impl Attribute for Quantity {
    const CLASS: TypeClass = TypeClass::String;

    fn encode(&self) -> Value {
        Value::from(self.as_str())
    }

    fn decode(value: Value, path: &str, name: &str) -> Result<Self> {
        Ok(Quantity::from_code(&String::decode(value, path, name)?))
    }
}

// ============================================================================
// Scalar access
// ============================================================================

/// Reject a stored attribute whose class or size cannot be read as `T`.
fn check_info<T: Attribute>(path: &str, name: &str, info: &AttrInfo, buffer: usize) -> Result<()> {
    let compatible = match T::CLASS {
        TypeClass::String => info.class == TypeClass::String,
        _ => info.class.is_numeric(),
    };
    if !compatible {
        return Err(Error::TypeMismatch {
            path: path.to_string(),
            name: name.to_string(),
            expected: T::CLASS.to_string(),
            actual: info.class.to_string(),
        });
    }
    if info.class == TypeClass::String && info.byte_size > buffer {
        return Err(Error::SizeMismatch {
            path: path.to_string(),
            name: name.to_string(),
            expected: buffer,
            actual: info.byte_size,
        });
    }
    Ok(())
}

fn get_with_buffer<T: Attribute>(node: &impl Attributes, name: &str, buffer: usize) -> Result<T> {
    let info = node.attr_info(name)?;
    check_info::<T>(node.path(), name, &info, buffer)?;
    T::decode(node.read_attr(name)?, node.path(), name)
}

/// Read an attribute.
pub fn get_att<T: Attribute>(node: &impl Attributes, name: &str) -> Result<T> {
    get_with_buffer(node, name, STRING_BUFFER)
}

/// Read an attribute that may be absent.
pub fn get_att_opt<T: Attribute>(node: &impl Attributes, name: &str) -> Result<Option<T>> {
    if !node.attr_exists(name)? {
        return Ok(None);
    }
    get_att(node, name).map(Some)
}

/// Create a new attribute. Fails if it already exists.
pub fn new_att<T: Attribute>(node: &impl Attributes, name: &str, value: &T) -> Result<()> {
    node.create_attr(name, value.encode())
}

/// Create or replace an attribute.
pub fn set_att<T: Attribute>(node: &impl Attributes, name: &str, value: &T) -> Result<()> {
    let encoded = value.encode();
    if node.attr_exists(name)? {
        if T::FIXED_WIDTH && node.attr_info(name)?.class == encoded.class() {
            return node.write_attr(name, encoded);
        }
        node.delete_attr(name)?;
    }
    node.create_attr(name, encoded)
}

// ============================================================================
// Timestamps
// ============================================================================

fn format_pair(node: &impl Attributes, date_name: &str, t: OffsetDateTime) -> Result<(String, String)> {
    let t = t.to_offset(UtcOffset::UTC);
    if !(0..=9999).contains(&t.year()) {
        return Err(Error::bad_value(node.path(), date_name, t.to_string()));
    }
    let date = t
        .format(DATE_FORMAT)
        .map_err(|e| Error::bad_value(node.path(), date_name, e.to_string()))?;
    let time = t
        .format(TIME_FORMAT)
        .map_err(|e| Error::bad_value(node.path(), date_name, e.to_string()))?;
    Ok((date, time))
}

fn parse_part<T>(
    node: &impl Attributes,
    name: &str,
    text: &str,
    width: usize,
    parse: impl FnOnce(&str) -> std::result::Result<T, time::error::Parse>,
) -> Result<T> {
    if text.len() != width || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::bad_value(node.path(), name, text));
    }
    parse(text).map_err(|_| Error::bad_value(node.path(), name, text))
}

/// Read a timestamp split over a date and a time attribute, as UTC.
pub fn get_time(node: &impl Attributes, date_name: &str, time_name: &str) -> Result<OffsetDateTime> {
    let date: String = get_with_buffer(node, date_name, DATE_BUFFER)?;
    let time: String = get_with_buffer(node, time_name, TIME_BUFFER)?;

    let date = parse_part(node, date_name, &date, 8, |s| Date::parse(s, DATE_FORMAT))?;
    let time = parse_part(node, time_name, &time, 6, |s| Time::parse(s, TIME_FORMAT))?;
    Ok(PrimitiveDateTime::new(date, time).assume_utc())
}

/// Create a date and a time attribute for `t`.
pub fn new_time(node: &impl Attributes, date_name: &str, time_name: &str, t: OffsetDateTime) -> Result<()> {
    let (date, time) = format_pair(node, date_name, t)?;
    new_att(node, date_name, &date)?;
    new_att(node, time_name, &time)
}

/// Create or replace a date and a time attribute for `t`.
pub fn set_time(node: &impl Attributes, date_name: &str, time_name: &str, t: OffsetDateTime) -> Result<()> {
    let (date, time) = format_pair(node, date_name, t)?;
    set_att(node, date_name, &date)?;
    set_att(node, time_name, &time)
}
