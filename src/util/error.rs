//! Error types for the ODIM library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ODIM operations.
///
/// Node-level variants carry the path of the node inside the container
/// and the attribute, group or dataset name involved.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// No HDF5 superblock signature where one is expected
    #[error("Not an HDF5 file: bad signature")]
    InvalidMagic,

    /// Superblock, object header or message version this engine cannot read
    #[error("Unsupported HDF5 structure version: {0}")]
    UnsupportedVersion(u16),

    /// Valid HDF5 that relies on a feature this engine does not read
    #[error("Unsupported HDF5 feature: {0}")]
    Unsupported(String),

    /// File is truncated or corrupted
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Expected child group or dataset is absent
    #[error("Failed to open '{name}' at {path}")]
    OpenFailure { path: String, name: String },

    /// Create target already exists
    #[error("'{name}' already exists at {path}")]
    AlreadyExists { path: String, name: String },

    /// Attribute not present on node
    #[error("Attribute '{name}' missing at {path}")]
    AttributeMissing { path: String, name: String },

    /// Stored primitive class disagrees with the requested one
    #[error("Type mismatch for '{name}' at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        name: String,
        expected: String,
        actual: String,
    },

    /// Payload does not fit the buffer or declared size
    #[error("Size mismatch for '{name}' at {path}: expected {expected}, got {actual}")]
    SizeMismatch {
        path: String,
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Attribute content cannot be interpreted
    #[error("Bad value for '{name}' at {path}: {value:?}")]
    BadValue {
        path: String,
        name: String,
        value: String,
    },

    /// Stored product or object code disagrees with the entity kind
    #[error("Product mismatch at {path}: expected {expected}, got {actual}")]
    ProductMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Declared entity size disagrees with on-disk array extent
    #[error("Dimension mismatch for '{name}' at {path}: declared {declared} elements, stored {stored}")]
    DimensionMismatch {
        path: String,
        name: String,
        declared: usize,
        stored: usize,
    },

    /// Engine-level write failure
    #[error("Failed to write '{name}' at {path}: {reason}")]
    WriteFailure {
        path: String,
        name: String,
        reason: String,
    },

    /// Engine-level read failure
    #[error("Failed to read '{name}' at {path}: {reason}")]
    ReadFailure {
        path: String,
        name: String,
        reason: String,
    },

    /// Layer position out of range
    #[error("Layer index {index} out of bounds (count: {count})")]
    LayerOutOfBounds { index: usize, count: usize },

    /// File was opened read-only
    #[error("Container is read-only")]
    ReadOnly,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported(feature.into())
    }

    pub fn open_failure(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::OpenFailure { path: path.into(), name: name.into() }
    }

    pub fn already_exists(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into(), name: name.into() }
    }

    pub fn attribute_missing(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AttributeMissing { path: path.into(), name: name.into() }
    }

    pub fn bad_value(path: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::BadValue { path: path.into(), name: name.into(), value: value.into() }
    }

    pub fn write_failure(path: impl Into<String>, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WriteFailure { path: path.into(), name: name.into(), reason: reason.into() }
    }

    pub fn read_failure(path: impl Into<String>, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReadFailure { path: path.into(), name: name.into(), reason: reason.into() }
    }
}

/// Result type alias for ODIM operations.
pub type Result<T> = std::result::Result<T, Error>;
