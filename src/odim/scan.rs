//! Polar scan dataset.

use time::OffsetDateTime;
use tracing::debug;

use super::attribute::{get_att, get_time, new_att, new_time, set_time};
use super::constants::*;
use super::layers::{LayerSet, Layered};
use super::node::{get_count, Node};
use crate::core::Container;
use crate::util::{Dimensions, Result};

/// Creation parameters of a scan.
#[derive(Clone, Debug)]
pub struct ScanParams {
    /// Antenna elevation angle in degrees
    pub elevation: f64,
    pub azimuth_count: usize,
    pub range_bin_count: usize,
    /// Index of the first azimuth gate radiated
    pub first_azimuth: usize,
    /// Range of the start of the first bin in meters
    pub range_start: f64,
    /// Distance between bins in meters
    pub range_scale: f64,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
}

/// One sweep of a polar volume (`dataset<N>` with product `SCAN`).
///
/// Layers are `azimuth_count x range_bin_count` arrays.
#[derive(Debug)]
pub struct Scan<G: Container> {
    node: Node<G>,
    index: usize,
    azimuth_count: usize,
    range_bin_count: usize,
    layers: LayerSet<G>,
}

impl<G: Container> Scan<G> {
    /// Create `dataset<index>` under `parent`.
    pub fn create(parent: &G, index: usize, params: &ScanParams) -> Result<Self> {
        let mut node = Node::create_indexed(parent, GRP_DATASET, index)?;

        let what = node.what()?;
        new_att(what, ATN_PRODUCT, &ProductType::Scan)?;
        new_time(what, ATN_START_DATE, ATN_START_TIME, params.start_time)?;
        new_time(what, ATN_END_DATE, ATN_END_TIME, params.end_time)?;

        let where_ = node.where_mut()?;
        new_att(where_, ATN_ELEVATION, &params.elevation)?;
        new_att(where_, ATN_RANGE_COUNT, &(params.range_bin_count as i64))?;
        new_att(where_, ATN_RANGE_START, &(params.range_start / 1000.0))?;
        new_att(where_, ATN_RANGE_SCALE, &params.range_scale)?;
        new_att(where_, ATN_AZIMUTH_COUNT, &(params.azimuth_count as i64))?;
        new_att(where_, ATN_FIRST_AZIMUTH, &(params.first_azimuth as i64))?;

        let dims = Dimensions::d2(params.azimuth_count, params.range_bin_count);
        let layers = LayerSet::new(node.group().clone(), dims);
        debug!(path = node.path(), elevation = params.elevation, "created scan");
        Ok(Self {
            node,
            index,
            azimuth_count: params.azimuth_count,
            range_bin_count: params.range_bin_count,
            layers,
        })
    }

    /// Open `dataset<index>` under `parent`. Fails if it is not a scan.
    pub fn open(parent: &G, index: usize) -> Result<Self> {
        let node = Node::open_indexed(parent, GRP_DATASET, index)?;
        node.check_product(ProductType::Scan)?;

        let where_ = node.where_()?;
        let azimuth_count = get_count(where_, ATN_AZIMUTH_COUNT)?;
        let range_bin_count = get_count(where_, ATN_RANGE_COUNT)?;

        let dims = Dimensions::d2(azimuth_count, range_bin_count);
        let layers = LayerSet::discover(node.group().clone(), dims)?;
        debug!(path = node.path(), layers = layers.len(), "opened scan");
        Ok(Self { node, index, azimuth_count, range_bin_count, layers })
    }

    /// 1-based dataset number.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn node(&self) -> &Node<G> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node<G> {
        &mut self.node
    }

    /// Elevation angle in degrees.
    pub fn elevation(&self) -> Result<f64> {
        get_att(self.node.where_()?, ATN_ELEVATION)
    }

    pub fn azimuth_count(&self) -> usize {
        self.azimuth_count
    }

    pub fn range_bin_count(&self) -> usize {
        self.range_bin_count
    }

    pub fn first_azimuth(&self) -> Result<usize> {
        get_count(self.node.where_()?, ATN_FIRST_AZIMUTH)
    }

    /// Range of the start of the first bin in meters.
    pub fn range_start(&self) -> Result<f64> {
        let km: f64 = get_att(self.node.where_()?, ATN_RANGE_START)?;
        Ok(km * 1000.0)
    }

    /// Distance between bins in meters.
    pub fn range_scale(&self) -> Result<f64> {
        get_att(self.node.where_()?, ATN_RANGE_SCALE)
    }

    pub fn start_time(&self) -> Result<OffsetDateTime> {
        get_time(self.node.what()?, ATN_START_DATE, ATN_START_TIME)
    }

    pub fn set_start_time(&mut self, t: OffsetDateTime) -> Result<()> {
        set_time(self.node.what_mut()?, ATN_START_DATE, ATN_START_TIME, t)
    }

    pub fn end_time(&self) -> Result<OffsetDateTime> {
        get_time(self.node.what()?, ATN_END_DATE, ATN_END_TIME)
    }

    pub fn set_end_time(&mut self, t: OffsetDateTime) -> Result<()> {
        set_time(self.node.what_mut()?, ATN_END_DATE, ATN_END_TIME, t)
    }
}

impl<G: Container> Layered<G> for Scan<G> {
    fn layers(&self) -> &LayerSet<G> {
        &self.layers
    }

    fn layers_mut(&mut self) -> &mut LayerSet<G> {
        &mut self.layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{File, Group};
    use crate::util::Error;
    use time::macros::datetime;

    fn params() -> ScanParams {
        ScanParams {
            elevation: 0.5,
            azimuth_count: 4,
            range_bin_count: 3,
            first_azimuth: 2,
            range_start: 125.0,
            range_scale: 250.0,
            start_time: datetime!(2011-06-24 04:00:00 UTC),
            end_time: datetime!(2011-06-24 04:00:30 UTC),
        }
    }

    #[test]
    fn test_create_open() -> Result<()> {
        let file = File::in_memory();
        let root = file.root();
        Scan::create(&root, 1, &params())?;

        let scan: Scan<Group> = Scan::open(&root, 1)?;
        assert_eq!(scan.index(), 1);
        assert_eq!(scan.elevation()?, 0.5);
        assert_eq!(scan.azimuth_count(), 4);
        assert_eq!(scan.range_bin_count(), 3);
        assert_eq!(scan.first_azimuth()?, 2);
        assert!((scan.range_start()? - 125.0).abs() < 1e-9);
        assert_eq!(scan.range_scale()?, 250.0);
        assert_eq!(scan.start_time()?, datetime!(2011-06-24 04:00:00 UTC));
        assert_eq!(scan.end_time()?, datetime!(2011-06-24 04:00:30 UTC));
        assert_eq!(scan.layer_count(), 0);

        let rstart: f64 = get_att(scan.node().where_()?, ATN_RANGE_START)?;
        assert_eq!(rstart, 0.125);
        Ok(())
    }

    #[test]
    fn test_layers() -> Result<()> {
        let file = File::in_memory();
        let root = file.root();
        let mut scan = Scan::create(&root, 1, &params())?;
        scan.add_layer(Quantity::Dbzh, false, &[1.0f32; 12], -9999.0, -32.0)?;
        scan.add_layer(Quantity::Qind, true, &[1u8; 12], 0, 0)?;
        assert!(matches!(
            scan.add_layer(Quantity::Vrad, false, &[1.0f32; 10], 0.0, 0.0),
            Err(Error::SizeMismatch { .. })
        ));

        let scan = Scan::open(&root, 1)?;
        assert_eq!(scan.layer_count(), 2);
        assert_eq!(scan.layer_quantity(1)?, &Quantity::Qind);
        let dbzh = scan.find_layer("DBZH")?.expect("DBZH layer");
        assert_eq!(dbzh.dims(), &Dimensions::d2(4, 3));
        assert!(scan.find_layer("TH")?.is_none());
        Ok(())
    }

    #[test]
    fn test_times_replaced() -> Result<()> {
        let file = File::in_memory();
        let mut scan = Scan::create(&file.root(), 1, &params())?;
        scan.set_start_time(datetime!(2012-02-29 12:00:00 UTC))?;
        scan.set_end_time(datetime!(2012-02-29 12:00:45 UTC))?;
        assert_eq!(scan.start_time()?, datetime!(2012-02-29 12:00:00 UTC));
        assert_eq!(scan.end_time()?, datetime!(2012-02-29 12:00:45 UTC));
        Ok(())
    }
}
