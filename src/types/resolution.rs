//! Raster cell resolution.

use std::fmt;

/// Cell size of a raster in CRS units.
///
/// Both components are stored as positive magnitudes regardless of the
/// sign of the transform's pixel height.
///
/// # Example
///
/// ```
/// use flood_risk::types::Resolution;
///
/// let res = Resolution::new(10.0, 10.0);
/// assert_eq!(res.as_tuple(), (10.0, 10.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
    /// Cell width
    pub x: f64,
    /// Cell height
    pub y: f64,
}

impl Resolution {
    /// Create a resolution from cell width and height.
    ///
    /// # Panics
    ///
    /// Panics if either component is not strictly positive.
    pub fn new(x: f64, y: f64) -> Self {
        assert!(x > 0.0, "x resolution must be positive, got {}", x);
        assert!(y > 0.0, "y resolution must be positive, got {}", y);
        Self { x, y }
    }

    /// Return as tuple (x, y).
    #[inline]
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
