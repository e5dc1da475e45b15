//! Core layer - engine capability traits and compression.
//!
//! This module provides:
//! - [`Attributes`] - Typed attribute access on any node
//! - [`Container`] - Groups with named children
//! - [`Dataset`] - Chunked, compressed numeric arrays
//! - Deflate helpers used by the HDF5 engine

mod traits;
mod compression;

pub use traits::{Attributes, Container, Dataset, DatasetLayout};
pub use compression::{compress, decompress, MAX_DEFLATE_RATIO};
