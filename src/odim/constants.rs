//! ODIM_H5 names, value codes and enumerations.

use std::fmt;

/// Deflate level used for new layer arrays (0 - 9, 9 = max compression).
pub const DEFAULT_COMPRESSION: u32 = 6;

// ============================================================================
// Group and dataset names
// ============================================================================

pub const GRP_WHAT: &str = "what";
pub const GRP_WHERE: &str = "where";
pub const GRP_HOW: &str = "how";
pub const GRP_DATASET: &str = "dataset";
pub const GRP_DATA: &str = "data";
pub const GRP_QUALITY: &str = "quality";

/// Name of the array inside a data or quality group.
pub const DAT_DATA: &str = "data";

// ============================================================================
// Attribute names
// ============================================================================

pub const ATN_CONVENTIONS: &str = "Conventions";
pub const ATN_OBJECT: &str = "object";
pub const ATN_VERSION: &str = "version";
pub const ATN_DATE: &str = "date";
pub const ATN_TIME: &str = "time";
pub const ATN_SOURCE: &str = "source";
pub const ATN_LATITUDE: &str = "lat";
pub const ATN_LONGITUDE: &str = "lon";
pub const ATN_HEIGHT: &str = "height";
pub const ATN_PRODUCT: &str = "product";
pub const ATN_START_DATE: &str = "startdate";
pub const ATN_START_TIME: &str = "starttime";
pub const ATN_END_DATE: &str = "enddate";
pub const ATN_END_TIME: &str = "endtime";
pub const ATN_ELEVATION: &str = "elangle";
pub const ATN_FIRST_AZIMUTH: &str = "a1gate";
pub const ATN_RANGE_COUNT: &str = "nbins";
pub const ATN_RANGE_START: &str = "rstart";
pub const ATN_RANGE_SCALE: &str = "rscale";
pub const ATN_AZIMUTH_COUNT: &str = "nrays";
pub const ATN_QUANTITY: &str = "quantity";
pub const ATN_GAIN: &str = "gain";
pub const ATN_OFFSET: &str = "offset";
pub const ATN_NO_DATA: &str = "nodata";
pub const ATN_UNDETECT: &str = "undetect";
pub const ATN_CLASS: &str = "CLASS";
pub const ATN_IMAGE_VERSION: &str = "IMAGE_VERSION";
pub const ATN_LEVELS: &str = "levels";
pub const ATN_INTERVAL: &str = "interval";
pub const ATN_MIN_HEIGHT: &str = "minheight";
pub const ATN_MAX_HEIGHT: &str = "maxheight";

/// Common optional attributes of a `how` group.
pub mod how {
    pub const TASK: &str = "task";
    pub const START_EPOCHS: &str = "startepochs";
    pub const END_EPOCHS: &str = "endepochs";
    pub const SYSTEM: &str = "system";
    pub const SOFTWARE: &str = "software";
    pub const SW_VERSION: &str = "sw_version";
    pub const ZR_A: &str = "zr_a";
    pub const ZR_B: &str = "zr_b";
    pub const KR_A: &str = "kr_a";
    pub const KR_B: &str = "kr_b";
    pub const SIMULATED: &str = "simulated";
    pub const BEAMWIDTH: &str = "beamwidth";
    pub const WAVELENGTH: &str = "wavelength";
    pub const RPM: &str = "rpm";
    pub const PULSEWIDTH: &str = "pulsewidth";
    pub const LOW_PRF: &str = "lowprf";
    pub const HIGH_PRF: &str = "highprf";
    pub const AZ_METHOD: &str = "azmethod";
    pub const BIN_METHOD: &str = "binmethod";
    pub const START_AZIMUTHS: &str = "startazA";
    pub const STOP_AZIMUTHS: &str = "stopazA";
    pub const MALFUNCTION: &str = "malfunc";
    pub const RADAR_MSG: &str = "radar_msg";
    pub const RADAR_HORIZON: &str = "radhoriz";
    pub const NYQUIST_INTERVAL: &str = "NI";
    pub const VERTICAL_PROFILE_METHOD: &str = "vp_method";
}

// ============================================================================
// Fixed values
// ============================================================================

pub const VAL_TRUE: &str = "True";
pub const VAL_FALSE: &str = "False";
pub const VAL_CONVENTIONS: &str = "ODIM_H5/V2_0";
pub const VAL_VERSION: &str = "H5rad 2.0";
pub const VAL_CLASS: &str = "IMAGE";
pub const VAL_IMAGE_VERSION: &str = "1.2";

// ============================================================================
// Enumerations
// ============================================================================

/// Generates a code enum with a fixed string table.
macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $code:literal,)+ }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Every value in table order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The code written to the file.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Look up a stored code.
            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

code_enum! {
    /// Kind of the whole file (`/what/object`).
    ObjectType {
        /// Polar volume
        VolumePolar => "PVOL",
        /// Cartesian volume
        VolumeCartesian => "CVOL",
        /// Polar scan
        Scan => "SCAN",
        /// Single polar ray
        Ray => "RAY",
        /// Azimuthal object
        Azimuth => "AZIM",
        /// 2-D cartesian image
        Image => "IMAGE",
        /// Cartesian composite image
        CompositeImage => "COMP",
        /// 2-D vertical cross section
        CrossSection => "XSEC",
        /// 1-D vertical profile
        VerticalProfile => "VP",
        /// Embedded graphical image
        Picture => "PIC",
    }
}

code_enum! {
    /// Product carried by a dataset (`datasetN/what/product`).
    ProductType {
        Scan => "SCAN",
        Ppi => "PPI",
        Cappi => "CAPPI",
        PseudoCappi => "PCAPPI",
        EchoTop => "ETOP",
        Maximum => "MAX",
        Accumulation => "RR",
        VerticalIntegratedLiquid => "VIL",
        Composite => "COMP",
        VerticalProfile => "VP",
        RangeHeight => "RHI",
        VerticalSlice => "XSEC",
        VerticalSidePanel => "VSP",
        HorizontalSidePanel => "HSP",
        Ray => "RAY",
        Azimuth => "AZIM",
        Quality => "QUAL",
    }
}

/// Physical quantity of a layer (`what/quantity`).
///
/// Codes outside the standard table are kept verbatim in [`Quantity::Other`].
/// Equality and hashing go by code, so `Other("DBZH")` equals `Dbzh`.
#[derive(Clone, Debug)]
pub enum Quantity {
    Th,
    Tv,
    Dbzh,
    Dbzv,
    Zdr,
    Rhohv,
    Ldr,
    Phidp,
    Kdp,
    Sqi,
    Snr,
    Rate,
    Acrr,
    Hght,
    Vil,
    Vrad,
    Wrad,
    Uwnd,
    Vwnd,
    Brdr,
    Qind,
    Class,
    Other(String),
}

impl Quantity {
    pub fn as_str(&self) -> &str {
        use Quantity::*;
        match self {
            Th => "TH",
            Tv => "TV",
            Dbzh => "DBZH",
            Dbzv => "DBZV",
            Zdr => "ZDR",
            Rhohv => "RHOHV",
            Ldr => "LDR",
            Phidp => "PHIDP",
            Kdp => "KDP",
            Sqi => "SQI",
            Snr => "SNR",
            Rate => "RATE",
            Acrr => "ACRR",
            Hght => "HGHT",
            Vil => "VIL",
            Vrad => "VRAD",
            Wrad => "WRAD",
            Uwnd => "UWND",
            Vwnd => "VWND",
            Brdr => "BRDR",
            Qind => "QIND",
            Class => "CLASS",
            Other(code) => code,
        }
    }

    /// Map a stored code, keeping unknown codes as `Other`.
    pub fn from_code(code: &str) -> Self {
        use Quantity::*;
        match code {
            "TH" => Th,
            "TV" => Tv,
            "DBZH" => Dbzh,
            "DBZV" => Dbzv,
            "ZDR" => Zdr,
            "RHOHV" => Rhohv,
            "LDR" => Ldr,
            "PHIDP" => Phidp,
            "KDP" => Kdp,
            "SQI" => Sqi,
            "SNR" => Snr,
            "RATE" => Rate,
            "ACRR" => Acrr,
            "HGHT" => Hght,
            "VIL" => Vil,
            "VRAD" => Vrad,
            "WRAD" => Wrad,
            "UWND" => Uwnd,
            "VWND" => Vwnd,
            "BRDR" => Brdr,
            "QIND" => Qind,
            "CLASS" => Class,
            other => Other(other.to_string()),
        }
    }

    /// True when the code is in the standard table, however it was built.
    pub fn is_standard(&self) -> bool {
        match self {
            Quantity::Other(code) => !matches!(Self::from_code(code), Quantity::Other(_)),
            _ => true,
        }
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Quantity {}

impl std::hash::Hash for Quantity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Quantity {
    fn from(code: &str) -> Self {
        Self::from_code(code)
    }
}

impl PartialEq<str> for Quantity {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Quantity {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}
