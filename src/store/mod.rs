//! File, group and dataset handles.
//!
//! An open file is a tree of groups and array datasets, each carrying an
//! ordered list of typed attributes. The whole tree is held in memory and
//! converted to and from HDF5 by [`crate::h5`]. Changes are written back
//! on [`File::flush`] or [`File::close`], or when the last handle of a
//! modified file goes away.

mod handle;
pub(crate) mod tree;

pub use handle::{Dataset, File, Group, OpenOptions};
