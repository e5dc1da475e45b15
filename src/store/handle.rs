//! File, group and dataset handles over an in-memory HDF5 tree.
//!
//! All handles of one file share a single node arena. Handles are cheap
//! to clone and stay valid for as long as any handle of the file lives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, trace};

use super::tree::{ArrayBuf, NodeData, NodeId, NodeKind, Tree};
use crate::core::{self, Attributes, Container, DatasetLayout};
use crate::h5::{read_file, write_file};
use crate::util::{AttrInfo, Dimensions, Element, ElementType, Error, Result, Value};

// ============================================================================
// Shared file state
// ============================================================================

struct Shared {
    tree: RwLock<Tree>,
    path: Option<PathBuf>,
    read_only: bool,
}

impl Shared {
    fn flush(&self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut tree = self.tree.write();
        if tree.is_dirty() {
            write_file(path, &tree)?;
            tree.mark_clean();
            debug!(path = %path.display(), "flushed HDF5 file");
        }
        Ok(())
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            let path = self.path.as_deref().unwrap_or(Path::new(""));
            error!(path = %path.display(), error = %e, "unsaved changes lost: failed to write HDF5 file on drop");
        }
    }
}

// ============================================================================
// File
// ============================================================================

/// Options for opening an existing HDF5 file.
#[derive(Clone, Debug)]
pub struct OpenOptions {
    read_only: bool,
    use_mmap: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self { read_only: false, use_mmap: true }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every mutation for the lifetime of the handle.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Memory-map the file while loading it. Ignored without the `mmap` feature.
    pub fn use_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<File> {
        let path = path.as_ref();
        let tree = read_file(path, self.use_mmap)?;
        if !self.read_only {
            // read-write handles need a writable file
            std::fs::OpenOptions::new().write(true).open(path)?;
        }
        debug!(path = %path.display(), read_only = self.read_only, "opened HDF5 file");
        Ok(File::from_parts(tree, Some(path.to_path_buf()), self.read_only))
    }
}

/// An open HDF5 file.
///
/// The whole file is loaded into memory. Changes are written back by
/// [`File::flush`] or [`File::close`]; dropping the last handle of a
/// modified file also writes it, but can only log a failure.
#[derive(Clone)]
pub struct File {
    shared: Arc<Shared>,
}

impl File {
    fn from_parts(tree: Tree, path: Option<PathBuf>, read_only: bool) -> Self {
        Self {
            shared: Arc::new(Shared { tree: RwLock::new(tree), path, read_only }),
        }
    }

    /// Create a new, empty file, replacing any existing file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tree = Tree::new();
        write_file(path, &tree)?;
        debug!(path = %path.display(), "created HDF5 file");
        Ok(Self::from_parts(tree, Some(path.to_path_buf()), false))
    }

    /// Open an existing file.
    pub fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self> {
        OpenOptions::new().read_only(read_only).open(path)
    }

    /// A writable file that lives only in memory.
    pub fn in_memory() -> Self {
        Self::from_parts(Tree::new(), None, false)
    }

    /// The root group.
    pub fn root(&self) -> Group {
        Group(Handle {
            shared: Arc::clone(&self.shared),
            id: Tree::ROOT,
            path: "/".to_string(),
        })
    }

    /// Write pending changes to disk.
    pub fn flush(&self) -> Result<()> {
        self.shared.flush()
    }

    /// Write pending changes and release this handle.
    pub fn close(self) -> Result<()> {
        self.shared.flush()
    }

    pub fn is_read_only(&self) -> bool {
        self.shared.read_only
    }

    /// Backing path, `None` for in-memory files.
    pub fn path(&self) -> Option<&Path> {
        self.shared.path.as_deref()
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.shared.path)
            .field("read_only", &self.shared.read_only)
            .finish()
    }
}

// ============================================================================
// Node handle
// ============================================================================

#[derive(Clone)]
struct Handle {
    shared: Arc<Shared>,
    id: NodeId,
    path: String,
}

impl Handle {
    fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    fn child_path(&self, name: &str) -> String {
        if self.path == "/" {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.path)
        }
    }

    /// Names become HDF5 link names, which cannot contain path separators.
    fn check_link_name(&self, name: &str) -> Result<()> {
        if name.is_empty() || name == "." || name.contains(['/', '\0']) {
            return Err(Error::write_failure(&self.path, name, "invalid link name"));
        }
        Ok(())
    }

    fn child(&self, id: NodeId, name: &str) -> Self {
        Self { shared: Arc::clone(&self.shared), id, path: self.child_path(name) }
    }

    fn check_writable(&self) -> Result<()> {
        if self.shared.read_only {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    fn attr_exists(&self, name: &str) -> bool {
        self.shared.tree.read().node(self.id).attr(name).is_some()
    }

    fn attr_info(&self, name: &str) -> Result<AttrInfo> {
        let tree = self.shared.tree.read();
        tree.node(self.id)
            .attr(name)
            .map(AttrInfo::from)
            .ok_or_else(|| Error::attribute_missing(&self.path, name))
    }

    fn read_attr(&self, name: &str) -> Result<Value> {
        let tree = self.shared.tree.read();
        tree.node(self.id)
            .attr(name)
            .cloned()
            .ok_or_else(|| Error::attribute_missing(&self.path, name))
    }

    fn create_attr(&self, name: &str, value: Value) -> Result<()> {
        self.check_writable()?;
        let mut tree = self.shared.tree.write();
        if tree.node(self.id).attr(name).is_some() {
            return Err(Error::already_exists(&self.path, name));
        }
        trace!(path = %self.path, name, "create attribute");
        tree.node_mut(self.id).attrs.push((name.to_string(), value));
        Ok(())
    }

    fn write_attr(&self, name: &str, value: Value) -> Result<()> {
        self.check_writable()?;
        let mut tree = self.shared.tree.write();
        let stored = tree
            .node(self.id)
            .attr(name)
            .ok_or_else(|| Error::attribute_missing(&self.path, name))?;

        let (have, want) = (AttrInfo::from(stored), AttrInfo::from(&value));
        if have.class != want.class || stored.is_array() != value.is_array() {
            return Err(Error::TypeMismatch {
                path: self.path.clone(),
                name: name.to_string(),
                expected: have.class.to_string(),
                actual: want.class.to_string(),
            });
        }
        if have.count != want.count || have.byte_size != want.byte_size {
            return Err(Error::SizeMismatch {
                path: self.path.clone(),
                name: name.to_string(),
                expected: have.byte_size,
                actual: want.byte_size,
            });
        }

        if let Some(slot) = tree.node_mut(self.id).attr_mut(name) {
            *slot = value;
        }
        Ok(())
    }

    fn delete_attr(&self, name: &str) -> Result<()> {
        self.check_writable()?;
        let mut tree = self.shared.tree.write();
        if tree.node(self.id).attr(name).is_none() {
            return Err(Error::attribute_missing(&self.path, name));
        }
        tree.node_mut(self.id).remove_attr(name);
        Ok(())
    }

    fn attr_count(&self) -> usize {
        self.shared.tree.read().node(self.id).attrs.len()
    }
}

macro_rules! impl_attributes {
    ($ty:ty) => {
        impl Attributes for $ty {
            fn path(&self) -> &str {
                &self.0.path
            }

            fn attr_exists(&self, name: &str) -> Result<bool> {
                Ok(self.0.attr_exists(name))
            }

            fn attr_info(&self, name: &str) -> Result<AttrInfo> {
                self.0.attr_info(name)
            }

            fn read_attr(&self, name: &str) -> Result<Value> {
                self.0.read_attr(name)
            }

            fn create_attr(&self, name: &str, value: Value) -> Result<()> {
                self.0.create_attr(name, value)
            }

            fn write_attr(&self, name: &str, value: Value) -> Result<()> {
                self.0.write_attr(name, value)
            }

            fn delete_attr(&self, name: &str) -> Result<()> {
                self.0.delete_attr(name)
            }

            fn attr_count(&self) -> Result<usize> {
                Ok(self.0.attr_count())
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($ty)).field(&self.0.path).finish()
            }
        }
    };
}

// ============================================================================
// Group
// ============================================================================

/// A group inside an HDF5 file.
#[derive(Clone)]
pub struct Group(Handle);

impl_attributes!(Group);

impl Container for Group {
    type Dataset = Dataset;

    fn child_exists(&self, name: &str) -> Result<bool> {
        Ok(self.0.shared.tree.read().child(self.0.id, name).is_some())
    }

    fn child_count(&self) -> Result<usize> {
        Ok(self.0.shared.tree.read().children(self.0.id).len())
    }

    fn create_group(&self, name: &str) -> Result<Self> {
        self.0.check_writable()?;
        self.0.check_link_name(name)?;
        let mut tree = self.0.shared.tree.write();
        if tree.child(self.0.id, name).is_some() {
            return Err(Error::already_exists(&self.0.path, name));
        }
        let id = tree.add_child(self.0.id, name, NodeData::group());
        trace!(path = %self.0.path, name, "create group");
        Ok(Group(self.0.child(id, name)))
    }

    fn open_group(&self, name: &str) -> Result<Self> {
        let tree = self.0.shared.tree.read();
        match tree.child(self.0.id, name) {
            Some(id) if tree.node(id).is_group() => Ok(Group(self.0.child(id, name))),
            _ => Err(Error::open_failure(&self.0.path, name)),
        }
    }

    fn create_dataset(&self, name: &str, layout: &DatasetLayout) -> Result<Dataset> {
        self.0.check_writable()?;
        self.0.check_link_name(name)?;
        let points = layout.dims.checked_num_points().ok_or_else(|| {
            Error::write_failure(&self.0.path, name, format!("extent {} overflows", layout.dims))
        })?;
        if let Some(chunk) = &layout.chunk {
            let fits = chunk.rank() == layout.dims.rank()
                && chunk.sizes().iter().all(|&c| c > 0);
            if !fits {
                return Err(Error::write_failure(
                    &self.0.path,
                    name,
                    format!("chunk shape {chunk} does not fit extent {}", layout.dims),
                ));
            }
        }

        let mut tree = self.0.shared.tree.write();
        if tree.child(self.0.id, name).is_some() {
            return Err(Error::already_exists(&self.0.path, name));
        }
        let buf = ArrayBuf::zeroed(layout.element, points);
        let id = tree.add_child(self.0.id, name, NodeData::dataset(layout.clone(), buf));
        trace!(path = %self.0.path, name, dims = %layout.dims, "create dataset");
        Ok(Dataset(self.0.child(id, name)))
    }

    fn open_dataset(&self, name: &str) -> Result<Dataset> {
        let tree = self.0.shared.tree.read();
        match tree.child(self.0.id, name) {
            Some(id) if !tree.node(id).is_group() => Ok(Dataset(self.0.child(id, name))),
            _ => Err(Error::open_failure(&self.0.path, name)),
        }
    }

    fn is_read_only(&self) -> bool {
        self.0.shared.read_only
    }

    fn flush(&self) -> Result<()> {
        self.0.shared.flush()
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// An array dataset inside an HDF5 file.
#[derive(Clone)]
pub struct Dataset(Handle);

impl_attributes!(Dataset);

impl Dataset {
    fn with_node<R>(&self, f: impl FnOnce(&DatasetLayout, &ArrayBuf) -> R) -> Result<R> {
        let tree = self.0.shared.tree.read();
        match &tree.node(self.0.id).kind {
            NodeKind::Dataset(d) => Ok(f(&d.layout, &d.buf)),
            NodeKind::Group { .. } => Err(Error::invalid(format!("{} is not a dataset", self.0.path))),
        }
    }

    /// Creation layout of this dataset.
    pub fn layout(&self) -> Result<DatasetLayout> {
        self.with_node(|layout, _| layout.clone())
    }

    fn size_mismatch(&self, expected: usize, actual: usize) -> Error {
        Error::SizeMismatch {
            path: self.0.path.clone(),
            name: self.0.name().to_string(),
            expected,
            actual,
        }
    }
}

impl core::Dataset for Dataset {
    fn element_type(&self) -> Result<ElementType> {
        self.with_node(|_, buf| buf.element_type())
    }

    fn dims(&self) -> Result<Dimensions> {
        self.with_node(|layout, _| layout.dims.clone())
    }

    fn read_into<T: Element>(&self, out: &mut [T]) -> Result<()> {
        let stored = self.with_node(|_, buf| buf.len())?;
        if stored != out.len() {
            return Err(self.size_mismatch(stored, out.len()));
        }
        self.with_node(|_, buf| buf.read_into(out))
    }

    fn write<T: Element>(&self, data: &[T]) -> Result<()> {
        self.0.check_writable()?;
        let mut tree = self.0.shared.tree.write();
        let stored = match &tree.node(self.0.id).kind {
            NodeKind::Dataset(d) => d.buf.len(),
            NodeKind::Group { .. } => {
                return Err(Error::invalid(format!("{} is not a dataset", self.0.path)))
            }
        };
        if stored != data.len() {
            return Err(self.size_mismatch(stored, data.len()));
        }
        if let NodeKind::Dataset(d) = &mut tree.node_mut(self.0.id).kind {
            d.buf.write_from(data);
        }
        Ok(())
    }
}
