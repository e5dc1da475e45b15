//! # ODIM
//!
//! Rust implementation of the ODIM_H5 weather radar data model.
//!
//! Polar volumes, scans, vertical profiles and their data/quality layers
//! are mapped onto a hierarchical container of groups, typed attributes
//! and compressed arrays. The mapping only talks to the container through
//! the traits in [`core`]; [`store`] implements them over HDF5 files read
//! and written by [`h5`].
//!
//! ## Modules
//!
//! - [`util`] - Basic types (element types, attribute values, errors)
//! - [`core`] - Container capability traits and compression
//! - [`h5`] - HDF5 file reader and writer
//! - [`store`] - File, group and dataset handles
//! - [`odim`] - Volumes, scans, profiles and layers
//!
//! ## Example
//!
//! ```ignore
//! use odim::prelude::*;
//!
//! let volume = Volume::open_file("pvol.h5", true)?;
//! for i in 0..volume.scan_count() {
//!     let scan = volume.scan(i)?;
//!     if let Some(dbzh) = scan.find_layer("DBZH")? {
//!         let (values, sentinels) = dbzh.read_vec::<f32>()?;
//!         println!("{} {} {:?}", scan.elevation()?, values.len(), sentinels);
//!     }
//! }
//! ```

pub mod util;
pub mod core;
pub mod h5;
pub mod store;
pub mod odim;

// Re-export commonly used types
pub use util::{Dimensions, ElementType, Error, Result};
pub use odim::{Data, Profile, Quantity, Scan, VerticalProfile, Volume};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Dimensions, ElementType, Error, Result};
    pub use crate::core::{Attributes, Container, Dataset};
    pub use crate::odim::{
        Data, LayerOptions, Layered, ObjectType, Profile, ProductType,
        ProfileGeometry, Quantity, Scan, ScanParams, Sentinels, VerticalProfile, Volume,
    };
    pub use crate::store::{File, Group, OpenOptions};
}
