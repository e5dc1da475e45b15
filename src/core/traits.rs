//! Capability traits for the hierarchical container engine.
//!
//! These traits define the interface between the ODIM codec and whatever
//! engine stores groups, attributes and arrays. The codec never reaches
//! past them; [`crate::store`] is the built-in implementation.

use crate::util::{AttrInfo, Dimensions, Element, ElementType, Result, Value};

// ============================================================================
// Attributes
// ============================================================================

/// A node that carries named, typed attributes (a group or a dataset).
pub trait Attributes {
    /// Full path of this node inside the container, used in error reports.
    fn path(&self) -> &str;

    /// Check whether an attribute exists.
    fn attr_exists(&self, name: &str) -> Result<bool>;

    /// Query class, byte size and element count of an attribute.
    ///
    /// Fails with `AttributeMissing` if absent.
    fn attr_info(&self, name: &str) -> Result<AttrInfo>;

    /// Read an attribute value.
    ///
    /// Fails with `AttributeMissing` if absent.
    fn read_attr(&self, name: &str) -> Result<Value>;

    /// Create a new attribute.
    ///
    /// Fails with `AlreadyExists` if an attribute of that name is present.
    fn create_attr(&self, name: &str, value: Value) -> Result<()>;

    /// Overwrite an existing attribute in place.
    ///
    /// The new value must have the same class and element count as the
    /// stored one; attributes cannot be resized in place.
    fn write_attr(&self, name: &str, value: Value) -> Result<()>;

    /// Delete an attribute.
    fn delete_attr(&self, name: &str) -> Result<()>;

    /// Number of attributes on this node.
    fn attr_count(&self) -> Result<usize>;
}

// ============================================================================
// Groups
// ============================================================================

/// Creation parameters for an array dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetLayout {
    /// Element type persisted in the container
    pub element: ElementType,
    /// Full extent of the array
    pub dims: Dimensions,
    /// Chunk shape, if chunked
    pub chunk: Option<Dimensions>,
    /// Deflate level 1-9, if compressed
    pub compression: Option<u32>,
}

impl DatasetLayout {
    /// Contiguous, uncompressed layout.
    pub fn new(element: ElementType, dims: Dimensions) -> Self {
        Self { element, dims, chunk: None, compression: None }
    }

    /// Set the chunk shape.
    pub fn with_chunk(mut self, chunk: Dimensions) -> Self {
        self.chunk = Some(chunk);
        self
    }

    /// Enable deflate compression at the given level.
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = Some(level);
        self
    }
}

/// A group: a node that owns named child groups and datasets.
///
/// Handles are cheap to clone; clones refer to the same group.
pub trait Container: Attributes + Clone + Sized {
    /// Dataset handle type produced by this engine.
    type Dataset: Dataset;

    /// Check whether a child link of that name exists.
    fn child_exists(&self, name: &str) -> Result<bool>;

    /// Number of child objects (groups and datasets).
    fn child_count(&self) -> Result<usize>;

    /// Create a child group. Fails with `AlreadyExists` if present.
    fn create_group(&self, name: &str) -> Result<Self>;

    /// Open a child group. Fails with `OpenFailure` if absent.
    fn open_group(&self, name: &str) -> Result<Self>;

    /// Create a child dataset.
    fn create_dataset(&self, name: &str, layout: &DatasetLayout) -> Result<Self::Dataset>;

    /// Open a child dataset. Fails with `OpenFailure` if absent.
    fn open_dataset(&self, name: &str) -> Result<Self::Dataset>;

    /// Whether the underlying file rejects mutation.
    fn is_read_only(&self) -> bool;

    /// Persist pending changes.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Datasets
// ============================================================================

/// An N-dimensional numeric array.
pub trait Dataset: Attributes {
    /// Element type persisted in the container.
    fn element_type(&self) -> Result<ElementType>;

    /// Current extent.
    fn dims(&self) -> Result<Dimensions>;

    /// Number of elements in the current extent.
    fn num_points(&self) -> Result<usize> {
        Ok(self.dims()?.num_points())
    }

    /// Read the full array, converting to `T`.
    ///
    /// `out` must hold exactly [`num_points`](Self::num_points) elements.
    fn read_into<T: Element>(&self, out: &mut [T]) -> Result<()>;

    /// Read the full array into a new vector.
    fn read_vec<T: Element>(&self) -> Result<Vec<T>> {
        let mut out = vec![T::default(); self.num_points()?];
        self.read_into(&mut out)?;
        Ok(out)
    }

    /// Overwrite the full array, converting from `T`.
    fn write<T: Element>(&self, data: &[T]) -> Result<()>;
}
