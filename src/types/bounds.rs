//! Raster bounding boxes.

use std::fmt;

/// Axis-aligned bounding box of a raster in CRS units.
///
/// Field names follow the left/bottom/right/top convention used by GIS
/// tooling, so a north-up raster has `top > bottom`.
///
/// # Example
///
/// ```
/// use flood_risk::types::BoundingBox;
///
/// let bounds = BoundingBox::new(500_000.0, 5_400_000.0, 501_000.0, 5_402_000.0);
///
/// assert_eq!(bounds.width(), 1_000.0);
/// assert_eq!(bounds.height(), 2_000.0);
/// assert!(bounds.intersects(&BoundingBox::new(500_500.0, 5_401_000.0, 502_000.0, 5_403_000.0)));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum x-coordinate (western edge)
    pub left: f64,
    /// Minimum y-coordinate (southern edge)
    pub bottom: f64,
    /// Maximum x-coordinate (eastern edge)
    pub right: f64,
    /// Maximum y-coordinate (northern edge)
    pub top: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// # Panics
    ///
    /// Panics if `right < left` or `top < bottom`.
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        assert!(
            right >= left,
            "right ({}) must not be less than left ({})",
            right,
            left
        );
        assert!(
            top >= bottom,
            "top ({}) must not be less than bottom ({})",
            top,
            bottom
        );

        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Smallest box enclosing all the given points.
    ///
    /// Returns `None` for an empty iterator.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut bbox = Self {
            left: x0,
            bottom: y0,
            right: x0,
            top: y0,
        };
        for (x, y) in iter {
            bbox.left = bbox.left.min(x);
            bbox.right = bbox.right.max(x);
            bbox.bottom = bbox.bottom.min(y);
            bbox.top = bbox.top.max(y);
        }
        Some(bbox)
    }

    /// Box width (right - left).
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Box height (top - bottom).
    #[inline]
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Check whether two boxes overlap with a non-empty area.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.bottom < other.top
            && other.bottom < self.top
    }

    /// Return as tuple (left, bottom, right, top).
    #[inline]
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.left, self.bottom, self.right, self.top)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoundingBox(left={}, bottom={}, right={}, top={})",
            self.left, self.bottom, self.right, self.top
        )
    }
}
