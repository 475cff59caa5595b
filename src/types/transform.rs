//! Affine geotransform mapping grid indices to world coordinates.

use std::fmt;

use super::{BoundingBox, Resolution};

/// Six-coefficient affine transform from (col, row) to (x, y).
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
///
/// Indices refer to cell corners: `(0, 0)` is the outer corner of the first
/// cell, `(0.5, 0.5)` its centre. North-up rasters have `b = d = 0` and a
/// negative `e`.
///
/// # Example
///
/// ```
/// use flood_risk::types::GeoTransform;
///
/// let t = GeoTransform::from_origin(500_000.0, 5_400_000.0, 10.0, 10.0);
/// assert_eq!(t.apply(1.0, 2.0), (500_010.0, 5_399_980.0));
///
/// let (col, row) = t.inverse().unwrap().apply(500_015.0, 5_399_995.0);
/// assert!((col - 1.5).abs() < 1e-9 && (row - 0.5).abs() < 1e-9);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoTransform {
    /// x-step per column
    pub a: f64,
    /// x-step per row (rotation)
    pub b: f64,
    /// x of the upper-left corner
    pub c: f64,
    /// y-step per column (rotation)
    pub d: f64,
    /// y-step per row, negative for north-up rasters
    pub e: f64,
    /// y of the upper-left corner
    pub f: f64,
}

impl GeoTransform {
    /// Create a transform from its six coefficients.
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up transform anchored at the upper-left corner `(west, north)`.
    pub fn from_origin(west: f64, north: f64, x_size: f64, y_size: f64) -> Self {
        Self::new(x_size, 0.0, west, 0.0, -y_size, north)
    }

    /// Coefficients in `[a, b, c, d, e, f]` order.
    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Map fractional (col, row) to world (x, y).
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// World coordinate of the centre of cell `(col, row)`.
    #[inline]
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Whether the transform has no rotation terms.
    #[inline]
    pub fn is_rectilinear(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    /// Inverse transform, mapping world (x, y) back to (col, row).
    ///
    /// Returns `None` for a degenerate (non-invertible) transform.
    pub fn inverse(&self) -> Option<GeoTransform> {
        let det = self.a * self.e - self.b * self.d;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let ia = self.e / det;
        let ib = -self.b / det;
        let id = -self.d / det;
        let ie = self.a / det;
        Some(GeoTransform {
            a: ia,
            b: ib,
            c: -(ia * self.c + ib * self.f),
            d: id,
            e: ie,
            f: -(id * self.c + ie * self.f),
        })
    }

    /// Bounding box of a `width` x `height` grid under this transform.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ];
        // four corners always present
        BoundingBox::enclosing(corners).unwrap_or(BoundingBox {
            left: self.c,
            bottom: self.f,
            right: self.c,
            top: self.f,
        })
    }

    /// Cell size magnitudes along the column and row axes.
    pub fn resolution(&self) -> Resolution {
        Resolution {
            x: self.a.hypot(self.d),
            y: self.b.hypot(self.e),
        }
    }

    /// Coefficient-wise comparison with a tolerance relative to the cell size.
    pub fn approx_eq(&self, other: &GeoTransform, rel_tol: f64) -> bool {
        let res = self.resolution();
        let tol = rel_tol * res.x.max(res.y).max(f64::MIN_POSITIVE);
        self.coefficients()
            .iter()
            .zip(other.coefficients().iter())
            .all(|(p, q)| (p - q).abs() <= tol)
    }
}

impl fmt::Display for GeoTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "| {}, {}, {}|\n| {}, {}, {}|",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_inverse_roundtrip() {
        let t = GeoTransform::new(2.0, 0.5, 100.0, 0.25, -3.0, 900.0);
        let inv = t.inverse().unwrap();
        for (col, row) in [(0.0, 0.0), (3.5, 7.25), (-2.0, 11.0)] {
            let (x, y) = t.apply(col, row);
            let (c2, r2) = inv.apply(x, y);
            assert!((col - c2).abs() < TOL, "col {} -> {}", col, c2);
            assert!((row - r2).abs() < TOL, "row {} -> {}", row, r2);
        }
    }

    #[test]
    fn test_degenerate_has_no_inverse() {
        let t = GeoTransform::new(1.0, 2.0, 0.0, 2.0, 4.0, 0.0);
        assert!(t.inverse().is_none());
    }

    #[test]
    fn test_bounds_north_up() {
        let t = GeoTransform::from_origin(10.0, 20.0, 2.0, 5.0);
        let b = t.bounds(3, 2);
        assert_eq!(b.as_tuple(), (10.0, 10.0, 16.0, 20.0));
        assert_eq!(t.resolution().as_tuple(), (2.0, 5.0));
        assert!(t.is_rectilinear());
    }

    #[test]
    fn test_cell_center() {
        let t = GeoTransform::from_origin(0.0, 10.0, 1.0, 1.0);
        assert_eq!(t.cell_center(0, 0), (0.5, 9.5));
        assert_eq!(t.cell_center(2, 3), (2.5, 6.5));
    }

    #[test]
    fn test_approx_eq() {
        let t = GeoTransform::from_origin(0.0, 10.0, 1.0, 1.0);
        let mut u = t;
        u.c += 1e-9;
        assert!(t.approx_eq(&u, 1e-6));
        u.c += 0.1;
        assert!(!t.approx_eq(&u, 1e-6));
    }
}
