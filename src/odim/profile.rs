//! Vertical profile dataset.

use time::OffsetDateTime;
use tracing::debug;

use super::attribute::{get_time, new_att, new_time, set_time};
use super::constants::*;
use super::layers::{LayerSet, Layered};
use super::node::Node;
use crate::core::Container;
use crate::util::{Dimensions, Result};

/// One vertical profile (`dataset<N>` with product `VP`).
///
/// Layers are 1-D arrays of `levels` elements. The level count belongs to
/// the enclosing file and is passed in on open.
#[derive(Debug)]
pub struct Profile<G: Container> {
    node: Node<G>,
    index: usize,
    levels: usize,
    layers: LayerSet<G>,
}

impl<G: Container> Profile<G> {
    /// Create `dataset<index>` under `parent`.
    pub fn create(
        parent: &G,
        index: usize,
        levels: usize,
        start_time: OffsetDateTime,
        end_time: OffsetDateTime,
    ) -> Result<Self> {
        let node = Node::create_indexed(parent, GRP_DATASET, index)?;
        let what = node.what()?;
        new_att(what, ATN_PRODUCT, &ProductType::VerticalProfile)?;
        new_time(what, ATN_START_DATE, ATN_START_TIME, start_time)?;
        new_time(what, ATN_END_DATE, ATN_END_TIME, end_time)?;

        let layers = LayerSet::new(node.group().clone(), Dimensions::d1(levels));
        debug!(path = node.path(), levels, "created profile");
        Ok(Self { node, index, levels, layers })
    }

    /// Open `dataset<index>` under `parent`. Fails if it is not a profile.
    pub fn open(parent: &G, index: usize, levels: usize) -> Result<Self> {
        let node = Node::open_indexed(parent, GRP_DATASET, index)?;
        node.check_product(ProductType::VerticalProfile)?;

        let layers = LayerSet::discover(node.group().clone(), Dimensions::d1(levels))?;
        debug!(path = node.path(), layers = layers.len(), "opened profile");
        Ok(Self { node, index, levels, layers })
    }

    /// 1-based dataset number.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn node(&self) -> &Node<G> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node<G> {
        &mut self.node
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

impl<G: Container> Layered<G> for Profile<G> {
    fn layers(&self) -> &LayerSet<G> {
        &self.layers
    }

    fn layers_mut(&mut self) -> &mut LayerSet<G> {
        &mut self.layers
    }
}
