//! Polar volume file.

use std::path::Path;

use time::OffsetDateTime;
use tracing::debug;

use super::attribute::{get_att, new_att, set_att};
use super::constants::*;
use super::node::Node;
use super::scan::{Scan, ScanParams};
use crate::core::Container;
use crate::store::{File, Group, OpenOptions};
use crate::util::{Error, Result};

/// A polar volume (`/what/object = PVOL`): site location plus an ordered
/// list of scans.
#[derive(Debug)]
pub struct Volume<G: Container> {
    node: Node<G>,
    scan_count: usize,
}

impl<G: Container> Volume<G> {
    /// Initialise an empty volume at the root group `root`.
    pub fn create(
        root: G,
        valid_time: OffsetDateTime,
        latitude: f64,
        longitude: f64,
        height: f64,
    ) -> Result<Self> {
        let mut node = Node::create_root(root, ObjectType::VolumePolar, valid_time)?;
        let where_ = node.where_mut()?;
        new_att(where_, ATN_LATITUDE, &latitude)?;
        new_att(where_, ATN_LONGITUDE, &longitude)?;
        new_att(where_, ATN_HEIGHT, &height)?;
        debug!(path = node.path(), "created volume");
        Ok(Self { node, scan_count: 0 })
    }

    /// Open the volume at the root group `root`.
    pub fn open(root: G) -> Result<Self> {
        let node = Node::open_root(root, ObjectType::VolumePolar)?;
        let scan_count = node.dataset_count()?;
        debug!(path = node.path(), scan_count, "opened volume");
        Ok(Self { node, scan_count })
    }

    pub fn node(&self) -> &Node<G> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node<G> {
        &mut self.node
    }

    pub fn valid_time(&self) -> Result<OffsetDateTime> {
        self.node.valid_time()
    }

    pub fn set_valid_time(&mut self, t: OffsetDateTime) -> Result<()> {
        self.node.set_valid_time(t)
    }

    pub fn source(&self) -> Result<String> {
        self.node.source()
    }

    pub fn set_source(&mut self, source: &str) -> Result<()> {
        self.node.set_source(source)
    }

    pub fn latitude(&self) -> Result<f64> {
        get_att(self.node.where_()?, ATN_LATITUDE)
    }

    pub fn longitude(&self) -> Result<f64> {
        get_att(self.node.where_()?, ATN_LONGITUDE)
    }

    /// Antenna height above sea level in meters.
    pub fn height(&self) -> Result<f64> {
        get_att(self.node.where_()?, ATN_HEIGHT)
    }

    pub fn set_location(&mut self, latitude: f64, longitude: f64, height: f64) -> Result<()> {
        let where_ = self.node.where_mut()?;
        set_att(where_, ATN_LATITUDE, &latitude)?;
        set_att(where_, ATN_LONGITUDE, &longitude)?;
        set_att(where_, ATN_HEIGHT, &height)
    }

    pub fn scan_count(&self) -> usize {
        self.scan_count
    }

    /// Open the scan at position `i`.
    pub fn scan(&self, i: usize) -> Result<Scan<G>> {
        if i >= self.scan_count {
            return Err(Error::LayerOutOfBounds { index: i, count: self.scan_count });
        }
        Scan::open(self.node.group(), i + 1)
    }

    /// Append a new scan.
    pub fn add_scan(&mut self, params: &ScanParams) -> Result<Scan<G>> {
        let scan = Scan::create(self.node.group(), self.scan_count + 1, params)?;
        self.scan_count += 1;
        Ok(scan)
    }

    /// Write pending changes to the container.
    pub fn flush(&self) -> Result<()> {
        self.node.group().flush()
    }

    /// Write pending changes and release the volume.
    ///
    /// Dropping a modified volume also writes it, but a failure there can
    /// only be logged.
    pub fn close(self) -> Result<()> {
        self.flush()
    }
}

impl Volume<Group> {
    /// Create a volume file at `path`, replacing any existing file.
    pub fn create_file(
        path: impl AsRef<Path>,
        valid_time: OffsetDateTime,
        latitude: f64,
        longitude: f64,
        height: f64,
    ) -> Result<Self> {
        let file = File::create(path)?;
        Self::create(file.root(), valid_time, latitude, longitude, height)
    }

    /// Open a volume file.
    pub fn open_file(path: impl AsRef<Path>, read_only: bool) -> Result<Self> {
        let file = OpenOptions::new().read_only(read_only).open(path)?;
        Self::open(file.root())
    }
}
