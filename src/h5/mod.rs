//! HDF5 file engine.
//!
//! Reads and writes the subset of HDF5 that ODIM_H5 products use: groups,
//! typed scalar and 1-D attributes, and n-dimensional numeric datasets,
//! optionally chunked and deflate-compressed.
//!
//! ## Written Layout
//!
//! ```text
//! +-----------------------------------------+
//! | Superblock v0: \x89 H D F \r \n \x1a \n |  96 bytes
//! |   root group symbol table entry         |
//! +-----------------------------------------+
//! | Objects, children before parents:       |
//! |   dataset chunks + chunk B-tree         |
//! |   object header v1                      |
//! |   group local heap + SNODs + B-tree     |
//! +-----------------------------------------+
//! ```
//!
//! All structures are 8-byte aligned and little-endian, with 8-byte
//! offsets and lengths. The reader also accepts the version 2/3
//! superblock and version 2 object header layouts of newer libraries.

mod chunks;
mod cursor;
mod filters;
mod format;
mod reader;
mod writer;

pub use format::SIGNATURE;

pub(crate) use reader::read_file;
pub(crate) use writer::write_file;
