//! Layer bookkeeping for scans and profiles.

use tracing::{debug, trace};

use super::attribute::get_att;
use super::constants::{ATN_QUANTITY, GRP_WHAT, Quantity};
use super::data::{layer_group_name, Data, LayerOptions, Sample};
use crate::core::Container;
use crate::util::{Dimensions, Error, Result};

/// What is known about a layer without reading its array.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerInfo {
    pub is_quality: bool,
    /// 1-based index within the data or quality series
    pub index: usize,
    pub quantity: Quantity,
}

/// Ordered layers of one dataset group: all `data<N>`, then all `quality<N>`.
#[derive(Debug)]
pub struct LayerSet<G: Container> {
    group: G,
    dims: Dimensions,
    infos: Vec<LayerInfo>,
}

impl<G: Container> LayerSet<G> {
    /// An empty set for a freshly created dataset.
    pub(crate) fn new(group: G, dims: Dimensions) -> Self {
        Self { group, dims, infos: Vec::new() }
    }

    /// Discover the layers of an existing dataset.
    ///
    /// Each series is scanned from index 1 and stops at the first missing
    /// index. Only the quantity of each layer is read.
    pub(crate) fn discover(group: G, dims: Dimensions) -> Result<Self> {
        let mut infos = Vec::with_capacity(group.child_count()?);
        for is_quality in [false, true] {
            for index in 1.. {
                let name = layer_group_name(is_quality, index);
                if !group.child_exists(&name)? {
                    break;
                }
                let what = group.open_group(&name)?.open_group(GRP_WHAT)?;
                let quantity: Quantity = get_att(&what, ATN_QUANTITY)?;
                trace!(path = group.path(), name = %name, %quantity, "found layer");
                infos.push(LayerInfo { is_quality, index, quantity });
            }
        }
        debug!(path = group.path(), count = infos.len(), "discovered layers");
        Ok(Self { group, dims, infos })
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerInfo> {
        self.infos.iter()
    }

    /// Declared extent of every layer array.
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Info for the layer at position `i`.
    pub fn info(&self, i: usize) -> Result<&LayerInfo> {
        self.infos
            .get(i)
            .ok_or_else(|| Error::LayerOutOfBounds { index: i, count: self.infos.len() })
    }

    /// Index the next layer of the series gets: last index plus one, or 1.
    pub fn next_index(&self, is_quality: bool) -> usize {
        self.infos
            .iter()
            .rev()
            .find(|info| info.is_quality == is_quality)
            .map_or(1, |info| info.index + 1)
    }

    /// Open the layer at position `i`.
    pub fn open(&self, i: usize) -> Result<Data<G>> {
        let info = self.info(i)?;
        Data::open(&self.group, info.is_quality, info.index, self.dims.clone())
    }

    /// Open the first layer carrying `quantity`, if any.
    pub fn find(&self, quantity: &str) -> Result<Option<Data<G>>> {
        match self.infos.iter().position(|info| info.quantity == quantity) {
            Some(i) => self.open(i).map(Some),
            None => Ok(None),
        }
    }

    /// Create a new layer at the end of its series.
    ///
    /// The layer is only recorded once it has been written, so a failed
    /// creation leaves the set unchanged.
    pub fn add<T: Sample>(
        &mut self,
        quantity: Quantity,
        is_quality: bool,
        raw: &[T],
        no_data: T,
        undetect: T,
        options: &LayerOptions,
    ) -> Result<Data<G>> {
        let index = self.next_index(is_quality);
        let data = Data::create(
            &self.group,
            is_quality,
            index,
            quantity.clone(),
            self.dims.clone(),
            raw,
            no_data,
            undetect,
            options,
        )?;
        self.infos.push(LayerInfo { is_quality, index, quantity });
        Ok(data)
    }
}

/// Entities that own an ordered list of layers.
pub trait Layered<G: Container> {
    fn layers(&self) -> &LayerSet<G>;

    fn layers_mut(&mut self) -> &mut LayerSet<G>;

    fn layer_count(&self) -> usize {
        self.layers().len()
    }

    /// Quantity of the layer at position `i`.
    fn layer_quantity<'a>(&'a self, i: usize) -> Result<&'a Quantity>
    where
        G: 'a,
    {
        Ok(&self.layers().info(i)?.quantity)
    }

    /// Open the layer at position `i`.
    fn layer(&self, i: usize) -> Result<Data<G>> {
        self.layers().open(i)
    }

    /// Open the first layer carrying `quantity`. Absence is `Ok(None)`.
    fn find_layer(&self, quantity: &str) -> Result<Option<Data<G>>> {
        self.layers().find(quantity)
    }

    /// Append a layer with the default creation options.
    fn add_layer<T: Sample>(
        &mut self,
        quantity: Quantity,
        is_quality: bool,
        raw: &[T],
        no_data: T,
        undetect: T,
    ) -> Result<Data<G>> {
        self.layers_mut()
            .add(quantity, is_quality, raw, no_data, undetect, &LayerOptions::default())
    }

    /// Append a layer with explicit creation options.
    fn add_layer_with<T: Sample>(
        &mut self,
        quantity: Quantity,
        is_quality: bool,
        raw: &[T],
        no_data: T,
        undetect: T,
        options: &LayerOptions,
    ) -> Result<Data<G>> {
        self.layers_mut().add(quantity, is_quality, raw, no_data, undetect, options)
    }
}
