//! ODIM_H5 data model.
//!
//! Maps radar products onto any container implementing the
//! [`crate::core`] traits:
//!
//! - [`Volume`] - polar volume file with an ordered list of [`Scan`]s
//! - [`VerticalProfile`] - vertical profile file with [`Profile`]s
//! - [`Data`] - one data or quality layer with gain/offset calibration
//! - [`Node`] - the `what`/`where`/`how` triad every entity carries
//!
//! ```text
//! /                        Conventions
//! /what /where /how        object, version, date, time, source, lat, lon ...
//! /dataset<N>/             product, start/end date and time, geometry
//!     data<M>/             what{quantity, gain, offset, nodata, undetect}
//!         data             array, CLASS="IMAGE" when 2-D
//!     quality<M>/
//! ```

pub mod attribute;
pub mod constants;
mod data;
mod layers;
mod node;
mod profile;
mod scan;
mod vertical_profile;
mod volume;

pub use attribute::{get_att, get_att_opt, get_time, new_att, new_time, set_att, set_time, Attribute};
pub use constants::{ObjectType, ProductType, Quantity, DEFAULT_COMPRESSION};
pub use data::{Data, LayerOptions, Sample, Sentinels};
pub use layers::{LayerInfo, LayerSet, Layered};
pub use node::Node;
pub use profile::Profile;
pub use scan::{Scan, ScanParams};
pub use vertical_profile::{ProfileGeometry, VerticalProfile};
pub use volume::Volume;
