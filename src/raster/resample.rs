//! Reprojection of a source grid onto a target grid.
//!
//! For every destination cell centre the world coordinate is carried into
//! the source CRS, mapped through the inverse source transform, and sampled.
//! The destination grid (CRS, transform, shape) is authoritative: source
//! data outside it is discarded and destination cells outside the source
//! footprint receive the source no-data value (NaN if none is declared).

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView2};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::io::{Crs, SampleKind};
use crate::types::GeoTransform;

/// Resampling kernel.
///
/// `Bilinear` suits continuous fields such as depth or velocity. For
/// categorical rasters it can blend unrelated class codes at class
/// boundaries; `Nearest` never invents codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    /// Value of the source cell containing the destination centre
    Nearest,
    /// Distance-weighted mean of the four surrounding source cell centres
    #[default]
    Bilinear,
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resampling::Nearest => write!(f, "nearest"),
            Resampling::Bilinear => write!(f, "bilinear"),
        }
    }
}

impl FromStr for Resampling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Resampling::Nearest),
            "bilinear" => Ok(Resampling::Bilinear),
            other => Err(format!(
                "unknown resampling method '{}' (expected 'nearest' or 'bilinear')",
                other
            )),
        }
    }
}

/// A georeferenced grid to sample from.
#[derive(Clone, Copy, Debug)]
pub struct SourceGrid<'a> {
    /// Cell values, shape (height, width)
    pub data: ArrayView2<'a, f64>,
    /// Source CRS
    pub crs: &'a Crs,
    /// Source transform
    pub transform: &'a GeoTransform,
    /// Cells equal to this value are treated as gaps
    pub no_data: Option<f64>,
    /// Integer sources round their resampled values
    pub sample_kind: SampleKind,
}

impl SourceGrid<'_> {
    #[inline]
    fn is_valid(&self, value: f64) -> bool {
        value.is_finite() && self.no_data != Some(value)
    }

    /// Nearest-neighbour sample at fractional pixel (col, row).
    fn nearest(&self, col: f64, row: f64) -> Option<f64> {
        let (height, width) = self.data.dim();
        if !(col >= 0.0 && row >= 0.0 && col < width as f64 && row < height as f64) {
            return None;
        }
        let value = self.data[[row as usize, col as usize]];
        self.is_valid(value).then_some(value)
    }

    /// Bilinear sample at fractional pixel (col, row).
    ///
    /// Neighbours outside the grid or missing are dropped and the
    /// remaining weights renormalised.
    fn bilinear(&self, col: f64, row: f64) -> Option<f64> {
        let (height, width) = self.data.dim();
        if !(col >= 0.0 && row >= 0.0 && col < width as f64 && row < height as f64) {
            return None;
        }

        // Pixel-centre convention
        let px = col - 0.5;
        let py = row - 0.5;
        let x0 = px.floor();
        let y0 = py.floor();
        let fx = px - x0;
        let fy = py - y0;

        let mut weighted = 0.0;
        let mut weight_sum = 0.0;
        for (dx, dy, w) in [
            (0.0, 0.0, (1.0 - fx) * (1.0 - fy)),
            (1.0, 0.0, fx * (1.0 - fy)),
            (0.0, 1.0, (1.0 - fx) * fy),
            (1.0, 1.0, fx * fy),
        ] {
            let (cx, cy) = (x0 + dx, y0 + dy);
            if w <= 0.0 || cx < 0.0 || cy < 0.0 || cx >= width as f64 || cy >= height as f64 {
                continue;
            }
            let value = self.data[[cy as usize, cx as usize]];
            if self.is_valid(value) {
                weighted += w * value;
                weight_sum += w;
            }
        }

        (weight_sum > 0.0).then(|| weighted / weight_sum)
    }
}

/// The grid to produce.
#[derive(Clone, Copy, Debug)]
pub struct TargetGrid<'a> {
    /// Destination CRS
    pub crs: &'a Crs,
    /// Destination transform
    pub transform: &'a GeoTransform,
    /// Destination shape (height, width)
    pub shape: (usize, usize),
}

/// Resample `source` onto `target`.
///
/// Returns `None` if the source transform cannot be inverted.
/// The result always has exactly `target.shape`.
pub fn reproject(
    source: &SourceGrid<'_>,
    target: &TargetGrid<'_>,
    method: Resampling,
) -> Option<Array2<f64>> {
    let inverse = source.transform.inverse()?;
    let fill = source.no_data.unwrap_or(f64::NAN);
    let (height, width) = target.shape;

    let sample_row = |row: usize| -> Vec<f64> {
        (0..width)
            .map(|col| {
                let (x, y) = target.transform.cell_center(col, row);
                let (sx, sy) = target.crs.transform_point(source.crs, x, y);
                let (c, r) = inverse.apply(sx, sy);
                let sample = match method {
                    Resampling::Nearest => source.nearest(c, r),
                    Resampling::Bilinear => source.bilinear(c, r),
                };
                match (sample, source.sample_kind) {
                    (Some(v), SampleKind::Integer) => v.round(),
                    (Some(v), SampleKind::Float) => v,
                    (None, _) => fill,
                }
            })
            .collect()
    };

    #[cfg(feature = "parallel")]
    let values: Vec<f64> = (0..height).into_par_iter().flat_map_iter(sample_row).collect();
    #[cfg(not(feature = "parallel"))]
    let values: Vec<f64> = (0..height).flat_map(sample_row).collect();

    Array2::from_shape_vec((height, width), values).ok()
}
