//! Single-band geo-referenced rasters.
//!
//! A [`Raster`] owns its grid exclusively and carries the spatial metadata
//! needed to place it on the ground: CRS, affine transform, and from those
//! the bounding box and resolution. It can resample a foreign raster onto
//! its own grid and persist a computed array with its georeferencing.
//!
//! # Example
//!
//! ```ignore
//! use flood_risk::raster::{Raster, Resampling};
//!
//! let depth = Raster::load("data/depth.tif")?;
//! let land_use = depth.resample_raster("data/corine.tif", Resampling::Nearest)?;
//! assert_eq!(land_use.dim(), depth.shape());
//!
//! depth.save_raster("out/depth_copy.tif", depth.data(), Some(-9999.0))?;
//! ```

mod resample;

use std::path::{Path, PathBuf};

use log::debug;
use ndarray::Array2;
use thiserror::Error;

use crate::io::{read_geotiff, write_geotiff, Crs, GeoTiffError, SampleKind};
use crate::types::{BoundingBox, GeoTransform, Resolution};

pub use resample::{reproject, Resampling, SourceGrid, TargetGrid};

/// Relative tolerance (in cells) for treating two transforms as the same grid.
const GRID_TOLERANCE: f64 = 1e-6;

/// Error type for raster operations.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Reading a raster file failed
    #[error("failed to load raster {}: {source}", path.display())]
    Load {
        /// Offending file
        path: PathBuf,
        /// Underlying codec error
        source: GeoTiffError,
    },

    /// Writing a raster file failed
    #[error("failed to save raster {}: {source}", path.display())]
    Save {
        /// Offending file
        path: PathBuf,
        /// Underlying codec error
        source: GeoTiffError,
    },

    /// Operation needs georeferencing the raster does not have
    #[error("raster has no CRS or transform")]
    Unbound,

    /// A grid does not fit the raster
    #[error("grid shape {found:?} does not match raster shape {expected:?}")]
    ShapeMismatch {
        /// Shape of the raster (height, width)
        expected: (usize, usize),
        /// Shape of the offending grid
        found: (usize, usize),
    },

    /// Source raster could not be mapped onto the target grid
    #[error("cannot reproject {}: source transform is not invertible", path.display())]
    Reprojection {
        /// Source raster
        path: PathBuf,
    },
}

/// Spatial reference of a bound raster.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Georeference {
    crs: Crs,
    transform: GeoTransform,
}

/// A single-band raster held in memory.
#[derive(Clone, Debug)]
pub struct Raster {
    path: Option<PathBuf>,
    georeference: Option<Georeference>,
    data: Array2<f64>,
    no_data: Option<f64>,
    sample_kind: SampleKind,
}

impl Raster {
    /// Load band 1 of a GeoTIFF and its spatial metadata.
    ///
    /// The file is closed before this returns.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let band = read_geotiff(path).map_err(|source| RasterError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            "Loaded {}: {}x{} cells, {}, resolution {}",
            path.display(),
            band.data.ncols(),
            band.data.nrows(),
            band.crs,
            band.transform.resolution()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            georeference: Some(Georeference {
                crs: band.crs,
                transform: band.transform,
            }),
            data: band.data,
            no_data: band.no_data,
            sample_kind: band.sample_kind,
        })
    }

    /// An empty raster with no backing file and no georeferencing.
    ///
    /// Serves as an accumulator for computed results before persistence.
    pub fn unbound() -> Self {
        Self {
            path: None,
            georeference: None,
            data: Array2::zeros((0, 0)),
            no_data: None,
            sample_kind: SampleKind::Float,
        }
    }

    /// An in-memory raster from a grid and its georeferencing.
    pub fn from_grid(data: Array2<f64>, crs: Crs, transform: GeoTransform) -> Self {
        Self {
            path: None,
            georeference: Some(Georeference { crs, transform }),
            data,
            no_data: None,
            sample_kind: SampleKind::Float,
        }
    }

    /// A new raster holding `data` on the same grid as `template`.
    pub fn with_grid_of(template: &Raster, data: Array2<f64>) -> Result<Self, RasterError> {
        let georeference = template.georeference.ok_or(RasterError::Unbound)?;
        if data.dim() != template.shape() {
            return Err(RasterError::ShapeMismatch {
                expected: template.shape(),
                found: data.dim(),
            });
        }
        Ok(Self {
            path: None,
            georeference: Some(georeference),
            data,
            no_data: None,
            sample_kind: SampleKind::Float,
        })
    }

    /// Set the no-data value.
    pub fn with_no_data(mut self, no_data: Option<f64>) -> Self {
        self.no_data = no_data;
        self
    }

    /// Attach georeferencing to this raster.
    pub fn set_georeference(&mut self, crs: Crs, transform: GeoTransform) {
        self.georeference = Some(Georeference { crs, transform });
    }

    /// Replace the grid.
    pub fn set_data(&mut self, data: Array2<f64>) {
        self.data = data;
    }

    /// Backing file, if loaded from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the raster has a CRS and transform.
    pub fn is_bound(&self) -> bool {
        self.georeference.is_some()
    }

    /// Coordinate reference system.
    pub fn crs(&self) -> Option<&Crs> {
        self.georeference.as_ref().map(|g| &g.crs)
    }

    /// Affine transform.
    pub fn transform(&self) -> Option<&GeoTransform> {
        self.georeference.as_ref().map(|g| &g.transform)
    }

    /// Bounding box in CRS units.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.georeference
            .map(|g| g.transform.bounds(self.width(), self.height()))
    }

    /// Cell size in CRS units.
    pub fn resolution(&self) -> Option<Resolution> {
        self.georeference.map(|g| g.transform.resolution())
    }

    /// Grid shape (height, width).
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Cell values.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Take ownership of the cell values.
    pub fn into_data(self) -> Array2<f64> {
        self.data
    }

    /// Value marking missing cells.
    pub fn no_data(&self) -> Option<f64> {
        self.no_data
    }

    /// Sample type of the source file.
    pub fn sample_kind(&self) -> SampleKind {
        self.sample_kind
    }

    /// Whether `other` lies on exactly this raster's grid.
    ///
    /// Same CRS, same shape, and transforms equal to within a millionth
    /// of a cell.
    pub fn same_grid(&self, other: &Raster) -> bool {
        match (self.georeference, other.georeference) {
            (Some(a), Some(b)) => {
                a.crs.same_as(&b.crs)
                    && self.shape() == other.shape()
                    && a.transform.approx_eq(&b.transform, GRID_TOLERANCE)
            }
            _ => false,
        }
    }

    /// Whether `other`'s footprint overlaps this raster's extent.
    ///
    /// The corners of `other` are carried into this raster's CRS, so the
    /// check is approximate for strongly curved projections.
    pub fn overlaps(&self, other: &Raster) -> bool {
        let (Some(target), Some(source)) = (self.georeference, other.georeference) else {
            return false;
        };
        let (w, h) = (other.width() as f64, other.height() as f64);
        let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)].map(|(col, row)| {
            let (x, y) = source.transform.apply(col, row);
            source.crs.transform_point(&target.crs, x, y)
        });

        let extent = target.transform.bounds(self.width(), self.height());
        BoundingBox::enclosing(corners).is_some_and(|footprint| extent.intersects(&footprint))
    }

    /// Resample the raster at `source_path` onto this raster's grid.
    ///
    /// The result has exactly this raster's shape. The source file is
    /// opened, read and closed within this call.
    pub fn resample_raster<P: AsRef<Path>>(
        &self,
        source_path: P,
        method: Resampling,
    ) -> Result<Array2<f64>, RasterError> {
        let source = Raster::load(source_path)?;
        self.reproject_from(&source, method)
    }

    /// Resample an in-memory raster onto this raster's grid.
    pub fn reproject_from(
        &self,
        source: &Raster,
        method: Resampling,
    ) -> Result<Array2<f64>, RasterError> {
        let target_ref = self.georeference.as_ref().ok_or(RasterError::Unbound)?;
        let source_ref = source.georeference.as_ref().ok_or(RasterError::Unbound)?;

        let source_grid = SourceGrid {
            data: source.data.view(),
            crs: &source_ref.crs,
            transform: &source_ref.transform,
            no_data: source.no_data,
            sample_kind: source.sample_kind,
        };
        let target_grid = TargetGrid {
            crs: &target_ref.crs,
            transform: &target_ref.transform,
            shape: self.shape(),
        };

        debug!(
            "Resampling {}x{} {} grid onto {}x{} {} grid ({})",
            source.width(),
            source.height(),
            source_ref.crs,
            self.width(),
            self.height(),
            target_ref.crs,
            method
        );

        reproject(&source_grid, &target_grid, method).ok_or_else(|| RasterError::Reprojection {
            path: source.path.clone().unwrap_or_default(),
        })
    }

    /// Write `data` as a GeoTIFF with this raster's CRS and transform.
    ///
    /// `no_data`, if given, is recorded in the file metadata so GIS
    /// software masks those cells.
    pub fn save_raster<P: AsRef<Path>>(
        &self,
        path: P,
        data: &Array2<f64>,
        no_data: Option<f64>,
    ) -> Result<(), RasterError> {
        let path = path.as_ref();
        let georeference = self.georeference.as_ref().ok_or(RasterError::Unbound)?;
        if !self.data.is_empty() && data.dim() != self.shape() {
            return Err(RasterError::ShapeMismatch {
                expected: self.shape(),
                found: data.dim(),
            });
        }

        write_geotiff(
            path,
            data,
            &georeference.transform,
            &georeference.crs,
            no_data,
        )
        .map_err(|source| RasterError::Save {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Saved {}x{} grid to {}", data.ncols(), data.nrows(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    fn utm_raster(data: Array2<f64>) -> Raster {
        Raster::from_grid(
            data,
            Crs::from_epsg(25832).unwrap(),
            GeoTransform::from_origin(456_000.0, 5_430_000.0, 10.0, 10.0),
        )
    }

    #[test]
    fn test_metadata() {
        let raster = utm_raster(Array2::zeros((3, 4)));
        assert_eq!(raster.shape(), (3, 4));
        assert_eq!(
            raster.bounds().unwrap().as_tuple(),
            (456_000.0, 5_429_970.0, 456_040.0, 5_430_000.0)
        );
        assert_eq!(raster.resolution().unwrap().as_tuple(), (10.0, 10.0));
        assert!(raster.path().is_none());
    }

    #[test]
    fn test_unbound_raster() {
        let mut raster = Raster::unbound();
        assert!(!raster.is_bound());
        assert!(raster.bounds().is_none());
        assert_eq!(raster.shape(), (0, 0));

        let dir = tempdir().unwrap();
        let err = raster
            .save_raster(dir.path().join("x.tif"), &array![[1.0]], None)
            .unwrap_err();
        assert!(matches!(err, RasterError::Unbound));

        raster.set_georeference(Crs::wgs84(), GeoTransform::from_origin(8.0, 49.0, 0.1, 0.1));
        raster.set_data(array![[1.0, 2.0]]);
        assert!(raster.is_bound());
        assert!((raster.bounds().unwrap().width() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_with_grid_of() {
        let depth = utm_raster(Array2::zeros((2, 2)));
        let risk = Raster::with_grid_of(&depth, array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(risk.same_grid(&depth));
        assert_eq!(risk.bounds(), depth.bounds());

        let err = Raster::with_grid_of(&depth, array![[1.0]]).unwrap_err();
        assert!(matches!(err, RasterError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("risk.tif");

        let raster = utm_raster(array![[10.0, -9999.0], [10.0, 2.5]]);
        raster
            .save_raster(&path, raster.data(), Some(-9999.0))
            .unwrap();

        let loaded = Raster::load(&path).unwrap();
        assert_eq!(loaded.data(), raster.data());
        assert_eq!(loaded.crs(), raster.crs());
        assert_eq!(loaded.transform(), raster.transform());
        assert_eq!(loaded.no_data(), Some(-9999.0));
        assert_eq!(loaded.path(), Some(path.as_path()));
        assert!(loaded.same_grid(&raster));
    }

    #[test]
    fn test_save_shape_mismatch() {
        let dir = tempdir().unwrap();
        let raster = utm_raster(Array2::zeros((2, 2)));
        let err = raster
            .save_raster(dir.path().join("bad.tif"), &Array2::zeros((3, 3)), None)
            .unwrap_err();
        assert!(matches!(err, RasterError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = Raster::load("/nonexistent/depth.tif").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/depth.tif"));
        assert!(matches!(err, RasterError::Load { .. }));
    }

    #[test]
    fn test_overlaps() {
        let depth = utm_raster(Array2::zeros((2, 2)));
        let inside = Raster::from_grid(
            array![[1.0]],
            Crs::from_epsg(25832).unwrap(),
            GeoTransform::from_origin(456_010.0, 5_429_990.0, 5.0, 5.0),
        );
        let far = Raster::from_grid(
            array![[1.0]],
            Crs::from_epsg(25832).unwrap(),
            GeoTransform::from_origin(500_000.0, 5_430_000.0, 10.0, 10.0),
        );

        assert!(depth.overlaps(&inside));
        assert!(!depth.overlaps(&far));
        assert!(!depth.overlaps(&Raster::unbound()));
    }

    #[test]
    fn test_resample_raster_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coarse.tif");

        // 20 m source cells, target has 10 m cells over the same extent
        let coarse = Raster::from_grid(
            array![[1.0, 2.0], [3.0, 4.0]],
            Crs::from_epsg(25832).unwrap(),
            GeoTransform::from_origin(456_000.0, 5_430_000.0, 20.0, 20.0),
        );
        coarse.save_raster(&path, coarse.data(), None).unwrap();

        let target = utm_raster(Array2::zeros((4, 4)));
        let out = target.resample_raster(&path, Resampling::Nearest).unwrap();
        assert_eq!(out.dim(), (4, 4));
        assert_eq!(out[[0, 0]], 1.0);
        assert_eq!(out[[0, 3]], 2.0);
        assert_eq!(out[[3, 0]], 3.0);
        assert_eq!(out[[3, 3]], 4.0);
    }
}
