//! Utility types and functions for ODIM.
//!
//! This module contains fundamental types used throughout the library:
//! - [`ElementType`] / [`Element`] - Numeric array element types
//! - [`TypeClass`] - Primitive class reported by the container
//! - [`Value`] / [`AttrInfo`] - Attribute payloads
//! - [`Dimensions`] - Array shapes
//! - [`Error`] / [`Result`] - Error handling

mod pod;
mod value;
mod error;
mod dimensions;

pub use pod::*;
pub use value::*;
pub use error::*;
pub use dimensions::*;
