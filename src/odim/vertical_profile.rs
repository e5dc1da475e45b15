//! Vertical profile file.

use std::path::Path;

use time::OffsetDateTime;
use tracing::debug;

use super::attribute::{get_att, new_att, set_att};
use super::constants::*;
use super::node::{get_count, Node};
use super::profile::Profile;
use crate::core::Container;
use crate::store::{File, Group, OpenOptions};
use crate::util::{Error, Result};

/// Site and height grid shared by every profile of a file.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileGeometry {
    pub latitude: f64,
    pub longitude: f64,
    /// Antenna height above sea level in meters
    pub height: f64,
    /// Number of height levels
    pub levels: usize,
    /// Vertical distance between levels in meters
    pub interval: f64,
    /// Minimum height in meters above sea level
    pub min_height: f64,
    /// Maximum height in meters above sea level
    pub max_height: f64,
}

/// A vertical profile file (`/what/object = VP`) holding an ordered list
/// of profiles on a common height grid.
#[derive(Debug)]
pub struct VerticalProfile<G: Container> {
    node: Node<G>,
    levels: usize,
    profile_count: usize,
}

impl<G: Container> VerticalProfile<G> {
    /// Initialise an empty vertical profile file at the root group `root`.
    pub fn create(root: G, valid_time: OffsetDateTime, geometry: &ProfileGeometry) -> Result<Self> {
        let mut node = Node::create_root(root, ObjectType::VerticalProfile, valid_time)?;
        let where_ = node.where_mut()?;
        new_att(where_, ATN_LATITUDE, &geometry.latitude)?;
        new_att(where_, ATN_LONGITUDE, &geometry.longitude)?;
        new_att(where_, ATN_HEIGHT, &geometry.height)?;
        new_att(where_, ATN_LEVELS, &(geometry.levels as i64))?;
        new_att(where_, ATN_INTERVAL, &geometry.interval)?;
        new_att(where_, ATN_MIN_HEIGHT, &geometry.min_height)?;
        new_att(where_, ATN_MAX_HEIGHT, &geometry.max_height)?;
        debug!(path = node.path(), levels = geometry.levels, "created vertical profile");
        Ok(Self { node, levels: geometry.levels, profile_count: 0 })
    }

    /// Open the vertical profile file at the root group `root`.
    pub fn open(root: G) -> Result<Self> {
        let node = Node::open_root(root, ObjectType::VerticalProfile)?;
        let levels = get_count(node.where_()?, ATN_LEVELS)?;
        let profile_count = node.dataset_count()?;
        debug!(path = node.path(), levels, profile_count, "opened vertical profile");
        Ok(Self { node, levels, profile_count })
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

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Read the full site and height grid.
    pub fn geometry(&self) -> Result<ProfileGeometry> {
        let where_ = self.node.where_()?;
        Ok(ProfileGeometry {
            latitude: get_att(where_, ATN_LATITUDE)?,
            longitude: get_att(where_, ATN_LONGITUDE)?,
            height: get_att(where_, ATN_HEIGHT)?,
            levels: self.levels,
            interval: get_att(where_, ATN_INTERVAL)?,
            min_height: get_att(where_, ATN_MIN_HEIGHT)?,
            max_height: get_att(where_, ATN_MAX_HEIGHT)?,
        })
    }

    /// Replace the site location. The height grid is fixed at creation.
    pub fn set_location(&mut self, latitude: f64, longitude: f64, height: f64) -> Result<()> {
        let where_ = self.node.where_mut()?;
        set_att(where_, ATN_LATITUDE, &latitude)?;
        set_att(where_, ATN_LONGITUDE, &longitude)?;
        set_att(where_, ATN_HEIGHT, &height)
    }

    pub fn profile_count(&self) -> usize {
        self.profile_count
    }

    /// Open the profile at position `i`.
    pub fn profile(&self, i: usize) -> Result<Profile<G>> {
        if i >= self.profile_count {
            return Err(Error::LayerOutOfBounds { index: i, count: self.profile_count });
        }
        Profile::open(self.node.group(), i + 1, self.levels)
    }

    /// Append a new profile.
    pub fn add_profile(&mut self, start_time: OffsetDateTime, end_time: OffsetDateTime) -> Result<Profile<G>> {
        let profile = Profile::create(
            self.node.group(),
            self.profile_count + 1,
            self.levels,
            start_time,
            end_time,
        )?;
        self.profile_count += 1;
        Ok(profile)
    }

    /// Write pending changes to the container.
    pub fn flush(&self) -> Result<()> {
        self.node.group().flush()
    }

    /// Write pending changes and release the profile file.
    ///
    /// Dropping a modified profile file also writes it, but a failure there can
    /// only be logged.
    pub fn close(self) -> Result<()> {
        self.flush()
    }
}

impl VerticalProfile<Group> {
    /// Create a vertical profile file at `path`, replacing any existing file.
    pub fn create_file(
        path: impl AsRef<Path>,
        valid_time: OffsetDateTime,
        geometry: &ProfileGeometry,
    ) -> Result<Self> {
        let file = File::create(path)?;
        Self::create(file.root(), valid_time, geometry)
    }

    /// Open a vertical profile file.
    pub fn open_file(path: impl AsRef<Path>, read_only: bool) -> Result<Self> {
        let file = OpenOptions::new().read_only(read_only).open(path)?;
        Self::open(file.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odim::layers::Layered;
    use crate::odim::volume::Volume;
    use time::macros::datetime;

    fn geometry() -> ProfileGeometry {
        ProfileGeometry {
            latitude: -27.39,
            longitude: 153.13,
            height: 8.0,
            levels: 4,
            interval: 200.0,
            min_height: 0.0,
            max_height: 800.0,
        }
    }

    #[test]
    fn test_profiles() -> Result<()> {
        let file = File::in_memory();
        let t = datetime!(2013-09-01 00:00:00 UTC);
        let mut vp = VerticalProfile::create(file.root(), t, &geometry())?;
        let mut first = vp.add_profile(t, datetime!(2013-09-01 00:05:00 UTC))?;
        first.add_layer(Quantity::Hght, false, &[100.0f32, 300.0, 500.0, 700.0], -1.0, -1.0)?;
        vp.add_profile(t, t)?;

        let vp = VerticalProfile::open(file.root())?;
        assert_eq!(vp.geometry()?, geometry());
        assert_eq!(vp.profile_count(), 2);
        let profile = vp.profile(0)?;
        assert_eq!(profile.levels(), 4);
        assert_eq!(profile.layer_quantity(0)?, &Quantity::Hght);
        assert!(matches!(vp.profile(2), Err(Error::LayerOutOfBounds { .. })));
        Ok(())
    }

    #[test]
    fn test_object_checked() -> Result<()> {
        let file = File::in_memory();
        let t = datetime!(2013-09-01 00:00:00 UTC);
        VerticalProfile::create(file.root(), t, &geometry())?;
        assert!(matches!(Volume::open(file.root()), Err(Error::ProductMismatch { .. })));
        Ok(())
    }
}
