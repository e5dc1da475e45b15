//! Data and quality layers.
//!
//! A layer is a `data<N>` or `quality<N>` group holding one array plus its
//! calibration. Stored values map to physical units as
//! `physical = stored * gain + offset`; [`Data::read`] and [`Data::write`]
//! always work in physical units.

use tracing::debug;

use super::attribute::{get_att, new_att, set_att};
use super::constants::*;
use super::node::Node;
use crate::core::{Attributes, Container, Dataset, DatasetLayout};
use crate::util::{Dimensions, Element, Error, Result, TypeClass};

/// Calibration values closer than this to identity are treated as identity.
const CALIBRATION_TOLERANCE: f64 = 0.000001;

// ============================================================================
// Samples
// ============================================================================

/// Element types a layer can be read into or written from.
///
/// Integer samples use `f64` math and round half away from zero. `f32`
/// samples use `f32` math, `f64` samples use `f64` math.
pub trait Sample: Element {
    /// `v * gain + offset`
    fn calibrate(self, gain: f64, offset: f64) -> Self;

    /// `(v - offset) / gain`
    fn decalibrate(self, gain: f64, offset: f64) -> Self;
}

macro_rules! impl_int_sample {
    ($($t:ty),+) => {
        $(
            impl Sample for $t {
                #[inline]
                fn calibrate(self, gain: f64, offset: f64) -> Self {
                    Self::from_f64(self.to_f64() * gain + offset)
                }

                #[inline]
                fn decalibrate(self, gain: f64, offset: f64) -> Self {
                    Self::from_f64((self.to_f64() - offset) / gain)
                }
            }
        )+
    };
}

impl_int_sample!(u8, u16, i32);

impl Sample for f32 {
    #[inline]
    fn calibrate(self, gain: f64, offset: f64) -> Self {
        self * gain as f32 + offset as f32
    }

    #[inline]
    fn decalibrate(self, gain: f64, offset: f64) -> Self {
        (self - offset as f32) / gain as f32
    }
}

impl Sample for f64 {
    #[inline]
    fn calibrate(self, gain: f64, offset: f64) -> Self {
        self * gain + offset
    }

    #[inline]
    fn decalibrate(self, gain: f64, offset: f64) -> Self {
        (self - offset) / gain
    }
}

fn is_identity(gain: f64, offset: f64) -> bool {
    (gain - 1.0).abs() <= CALIBRATION_TOLERANCE && offset.abs() <= CALIBRATION_TOLERANCE
}

/// Sentinel values of a layer, in physical units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sentinels<T> {
    /// Marks missing measurements
    pub no_data: T,
    /// Marks measurements below the detection threshold
    pub undetect: T,
}

/// Creation options for new layers.
#[derive(Clone, Debug)]
pub struct LayerOptions {
    /// Deflate level 0 - 9, 0 stores the array uncompressed.
    pub compression: u32,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self { compression: DEFAULT_COMPRESSION }
    }
}

impl LayerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = level.min(9);
        self
    }
}

/// Name of the group holding layer `index`.
pub(crate) fn layer_group_name(is_quality: bool, index: usize) -> String {
    let prefix = if is_quality { GRP_QUALITY } else { GRP_DATA };
    format!("{prefix}{index}")
}

// ============================================================================
// Data
// ============================================================================

/// One data or quality layer of a scan or profile.
#[derive(Debug)]
pub struct Data<G: Container> {
    node: Node<G>,
    is_quality: bool,
    index: usize,
    quantity: Quantity,
    gain: f64,
    offset: f64,
    dims: Dimensions,
    floating: bool,
}

impl<G: Container> Data<G> {
    /// Create layer `index` under `parent` and write its initial contents.
    ///
    /// The array is stored with the element type of `T`, chunked to its
    /// full extent. Gain and offset start at identity, so `raw` and the
    /// sentinels are written as given.
    #[allow(clippy::too_many_arguments)]
    pub fn create<T: Sample>(
        parent: &G,
        is_quality: bool,
        index: usize,
        quantity: Quantity,
        dims: Dimensions,
        raw: &[T],
        no_data: T,
        undetect: T,
        options: &LayerOptions,
    ) -> Result<Self> {
        let name = layer_group_name(is_quality, index);
        if raw.len() != dims.num_points() {
            return Err(Error::SizeMismatch {
                path: parent.path().to_string(),
                name,
                expected: dims.num_points(),
                actual: raw.len(),
            });
        }

        let node = Node::create(parent, &name)?;
        let what = node.what()?;
        new_att(what, ATN_QUANTITY, &quantity)?;
        new_att(what, ATN_GAIN, &1.0f64)?;
        new_att(what, ATN_OFFSET, &0.0f64)?;
        new_att(what, ATN_NO_DATA, &no_data.to_f64())?;
        new_att(what, ATN_UNDETECT, &undetect.to_f64())?;

        let mut layout = DatasetLayout::new(T::TYPE, dims.clone()).with_chunk(dims.clone());
        if options.compression > 0 {
            layout = layout.with_compression(options.compression);
        }
        let dataset = node.group().create_dataset(DAT_DATA, &layout)?;
        if dims.rank() == 2 {
            new_att(&dataset, ATN_CLASS, &VAL_CLASS.to_string())?;
            new_att(&dataset, ATN_IMAGE_VERSION, &VAL_IMAGE_VERSION.to_string())?;
        }
        dataset
            .write(raw)
            .map_err(|e| Error::write_failure(dataset.path(), DAT_DATA, e.to_string()))?;

        debug!(path = node.path(), %quantity, %dims, element = %T::TYPE, "created layer");
        Ok(Self {
            node,
            is_quality,
            index,
            quantity,
            gain: 1.0,
            offset: 0.0,
            dims,
            floating: T::TYPE.is_float(),
        })
    }

    /// Open existing layer `index` under `parent`, declared as `dims`.
    pub fn open(parent: &G, is_quality: bool, index: usize, dims: Dimensions) -> Result<Self> {
        let node = Node::open(parent, &layer_group_name(is_quality, index))?;
        let what = node.what()?;
        let quantity = get_att(what, ATN_QUANTITY)?;
        let gain: f64 = get_att(what, ATN_GAIN)?;
        let offset: f64 = get_att(what, ATN_OFFSET)?;

        // Non-identity calibration implies a float layer. Otherwise the
        // stored element class decides.
        let floating = if is_identity(gain, offset) {
            node.group().open_dataset(DAT_DATA)?.element_type()?.class() == TypeClass::Float
        } else {
            true
        };

        Ok(Self { node, is_quality, index, quantity, gain, offset, dims, floating })
    }

    pub fn is_quality(&self) -> bool {
        self.is_quality
    }

    /// 1-based index within the data or quality series.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn quantity(&self) -> &Quantity {
        &self.quantity
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Declared extent of the layer array.
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Declared number of elements.
    pub fn size(&self) -> usize {
        self.dims.num_points()
    }

    /// Best-effort guess at whether the layer holds floating point values.
    ///
    /// An integer layer with non-identity calibration reads as floating.
    pub fn floating_point(&self) -> bool {
        self.floating
    }

    pub fn node(&self) -> &Node<G> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node<G> {
        &mut self.node
    }

    fn calibrated(&self) -> bool {
        !is_identity(self.gain, self.offset)
    }

    /// Replace gain and offset. Existing stored values are left untouched.
    pub fn set_calibration(&mut self, gain: f64, offset: f64) -> Result<()> {
        let what = self.node.what()?;
        set_att(what, ATN_GAIN, &gain)?;
        set_att(what, ATN_OFFSET, &offset)?;
        self.gain = gain;
        self.offset = offset;
        if self.calibrated() {
            self.floating = true;
        }
        Ok(())
    }

    fn check_buffer(&self, len: usize) -> Result<()> {
        if len != self.size() {
            return Err(Error::SizeMismatch {
                path: self.node.path().to_string(),
                name: DAT_DATA.to_string(),
                expected: self.size(),
                actual: len,
            });
        }
        Ok(())
    }

    /// Open the array and check it against the declared extent.
    fn open_array(&self) -> Result<G::Dataset> {
        let dataset = self.node.group().open_dataset(DAT_DATA)?;
        let stored = dataset.num_points()?;
        if stored != self.size() {
            return Err(Error::DimensionMismatch {
                path: dataset.path().to_string(),
                name: DAT_DATA.to_string(),
                declared: self.size(),
                stored,
            });
        }
        Ok(dataset)
    }

    /// Read the sentinel attributes in physical units.
    pub fn sentinels<T: Sample>(&self) -> Result<Sentinels<T>> {
        let what = self.node.what()?;
        let mut no_data = T::from_f64(get_att(what, ATN_NO_DATA)?);
        let mut undetect = T::from_f64(get_att(what, ATN_UNDETECT)?);
        if self.calibrated() {
            no_data = no_data.calibrate(self.gain, self.offset);
            undetect = undetect.calibrate(self.gain, self.offset);
        }
        Ok(Sentinels { no_data, undetect })
    }

    /// Read the whole layer into `out`, in physical units.
    pub fn read<T: Sample>(&self, out: &mut [T]) -> Result<Sentinels<T>> {
        self.check_buffer(out.len())?;
        let dataset = self.open_array()?;
        let sentinels = self.sentinels()?;

        dataset
            .read_into(out)
            .map_err(|e| Error::read_failure(dataset.path(), DAT_DATA, e.to_string()))?;
        if self.calibrated() {
            for v in out.iter_mut() {
                *v = v.calibrate(self.gain, self.offset);
            }
        }
        Ok(sentinels)
    }

    /// Read the whole layer into a new vector.
    pub fn read_vec<T: Sample>(&self) -> Result<(Vec<T>, Sentinels<T>)> {
        let mut out = vec![T::default(); self.size()];
        let sentinels = self.read(&mut out)?;
        Ok((out, sentinels))
    }

    /// Overwrite the whole layer from physical-unit values.
    pub fn write<T: Sample>(&mut self, data: &[T], no_data: T, undetect: T) -> Result<()> {
        self.check_buffer(data.len())?;
        let dataset = self.open_array()?;
        let storage = dataset.element_type()?;
        let what = self.node.what()?;

        // sentinels are rounded like the pixels they mark
        let result = if self.calibrated() {
            let (gain, offset) = (self.gain, self.offset);
            let no_data = storage.quantize(no_data.decalibrate(gain, offset).to_f64());
            let undetect = storage.quantize(undetect.decalibrate(gain, offset).to_f64());
            set_att(what, ATN_NO_DATA, &no_data)?;
            set_att(what, ATN_UNDETECT, &undetect)?;
            let stored: Vec<T> = data.iter().map(|v| v.decalibrate(gain, offset)).collect();
            dataset.write(&stored)
        } else {
            set_att(what, ATN_NO_DATA, &storage.quantize(no_data.to_f64()))?;
            set_att(what, ATN_UNDETECT, &storage.quantize(undetect.to_f64()))?;
            dataset.write(data)
        };
        result.map_err(|e| Error::write_failure(dataset.path(), DAT_DATA, e.to_string()))
    }
}
