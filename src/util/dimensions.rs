//! Multi-dimensional array shape.
//!
//! Dimensions describe the extent of a dataset, slowest-varying first
//! (for a polar scan: azimuths, then range bins).

use smallvec::SmallVec;

/// Dimensions of a multi-dimensional array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// Size of each dimension. Empty means scalar (rank 0).
    dims: SmallVec<[usize; 4]>,
}

impl Dimensions {
    /// Create scalar dimensions (rank 0).
    pub fn scalar() -> Self {
        Self { dims: SmallVec::new() }
    }

    /// Create 1D dimensions.
    pub fn d1(size: usize) -> Self {
        Self { dims: smallvec::smallvec![size] }
    }

    /// Create 2D dimensions.
    pub fn d2(rows: usize, cols: usize) -> Self {
        Self { dims: smallvec::smallvec![rows, cols] }
    }

    /// Create from a slice of sizes.
    pub fn from_slice(sizes: &[usize]) -> Self {
        Self { dims: SmallVec::from_slice(sizes) }
    }

    /// Get the rank (number of dimensions).
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Get all dimension sizes as a slice.
    pub fn sizes(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of elements, saturating at `usize::MAX`.
    pub fn num_points(&self) -> usize {
        self.dims.iter().fold(1usize, |n, &d| n.saturating_mul(d))
    }

    /// Total number of elements, `None` when the product overflows.
    pub fn checked_num_points(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |n, &d| n.checked_mul(d))
    }

    /// Check if this represents a scalar (rank 0).
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, " x ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_points() {
        assert_eq!(Dimensions::scalar().num_points(), 1);
        assert_eq!(Dimensions::d1(31).num_points(), 31);
        assert_eq!(Dimensions::d2(360, 500).num_points(), 180_000);
        assert_eq!(Dimensions::from_slice(&[2, 3, 4]).num_points(), 24);
    }

    #[test]
    fn test_num_points_overflow() {
        let huge = Dimensions::d2(usize::MAX / 2, 3);
        assert_eq!(huge.checked_num_points(), None);
        assert_eq!(huge.num_points(), usize::MAX);
        assert_eq!(Dimensions::d2(3, 0).checked_num_points(), Some(0));
    }

    #[test]
    fn test_rank() {
        assert!(Dimensions::scalar().is_scalar());
        assert_eq!(Dimensions::d1(10).rank(), 1);
        assert_eq!(Dimensions::d2(10, 20).rank(), 2);
        assert_eq!(Dimensions::d2(10, 20).sizes(), &[10, 20]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Dimensions::d2(360, 500).to_string(), "[360 x 500]");
        assert_eq!(Dimensions::scalar().to_string(), "[]");
    }
}
