//! Plain old data element types stored in container arrays.

use std::fmt;

/// Primitive type class of a stored attribute or array.
///
/// This is the coarse classification the container reports; the codec
/// uses it to reject string/numeric confusion before reading a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Integer,
    Float,
    String,
}

impl TypeClass {
    /// Returns the name of this class as a string.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
        }
    }

    /// Returns true for integer and float classes.
    #[inline]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element type of a numeric array dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    /// Unsigned 8-bit integer
    Uint8,
    /// Unsigned 16-bit integer
    Uint16,
    /// Signed 32-bit integer
    Int32,
    /// 32-bit floating point (IEEE 754 single precision)
    Float32,
    /// 64-bit floating point (IEEE 754 double precision)
    Float64,
}

impl ElementType {
    /// Returns the size in bytes of a single element of this type.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Int32 => 4,
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Returns the name of this type as a string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uint8 => "uint8_t",
            Self::Uint16 => "uint16_t",
            Self::Int32 => "int32_t",
            Self::Float32 => "float32_t",
            Self::Float64 => "float64_t",
        }
    }

    /// Round `v` the way storing it in an array of this type does.
    pub fn quantize(self, v: f64) -> f64 {
        match self {
            Self::Uint8 => u8::from_f64(v).to_f64(),
            Self::Uint16 => u16::from_f64(v).to_f64(),
            Self::Int32 => i32::from_f64(v).to_f64(),
            Self::Float32 => f32::from_f64(v).to_f64(),
            Self::Float64 => v,
        }
    }

    /// Primitive class of this element type.
    #[inline]
    pub const fn class(self) -> TypeClass {
        match self {
            Self::Uint8 | Self::Uint16 | Self::Int32 => TypeClass::Integer,
            Self::Float32 | Self::Float64 => TypeClass::Float,
        }
    }

    /// Returns true if this is an integer type.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(self.class(), TypeClass::Integer)
    }

    /// Returns true if this is a floating point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self.class(), TypeClass::Float)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Rust types that can be read from or written to array datasets.
///
/// Conversion between element types goes through `f64`, which holds every
/// supported type exactly. Integer targets round half away from zero and
/// saturate at the type bounds.
pub trait Element: private::Sealed + Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The corresponding element type tag.
    const TYPE: ElementType;

    /// Convert from a double, rounding and saturating for integer types.
    fn from_f64(v: f64) -> Self;

    /// Widen to a double.
    fn to_f64(self) -> f64;
}

macro_rules! impl_int_element {
    ($t:ty, $tag:expr) => {
        impl Element for $t {
            const TYPE: ElementType = $tag;

            #[inline]
            fn from_f64(v: f64) -> Self {
                // `as` saturates, NaN maps to zero
                v.round() as $t
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_int_element!(u8, ElementType::Uint8);
impl_int_element!(u16, ElementType::Uint16);
impl_int_element!(i32, ElementType::Int32);

impl Element for f32 {
    const TYPE: ElementType = ElementType::Float32;

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    const TYPE: ElementType = ElementType::Float64;

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}
