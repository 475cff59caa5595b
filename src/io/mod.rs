//! I/O utilities for geo-referenced rasters and tabular outputs.
//!
//! This module provides:
//! - **GeoTIFF codec**: Read band 1 and write Float64 single-band GeoTIFFs
//! - **Coordinate reference systems**: EPSG-coded projections and point transforms
//! - **CSV tables**: Writers for the summary and per-category statistics tables
//!
//! # File Formats
//!
//! ## GeoTIFF
//!
//! GeoTIFF files with ModelPixelScale and ModelTiepoint (or
//! ModelTransformation) tags for georeferencing and a GeoKeyDirectory naming
//! an EPSG code. The GDAL_NODATA tag carries the no-data value.
//!
//! ## Summary Table
//!
//! ```text
//! Raster,Mean,Median,Standard Deviation,Minimum,Maximum
//! Risk,7.5,10.0,3.5355339059327378,2.5,10.0
//! Inundation,1.75,1.5,1.479019945774904,0.0,4.0
//! Land Use,7.5,7.5,2.5,5.0,10.0
//! ```
//!
//! ## Land-Use Risk Table
//!
//! ```text
//! Land Use Category,Total Risk,Average Risk,Pixel Count
//! 5.0,12.5,6.25,2
//! 10.0,10.0,10.0,1
//! ```

mod csv_table;
mod geotiff;
mod projection;

pub use csv_table::{write_category_csv, write_summary_csv};
pub use geotiff::{read_geotiff, write_geotiff, GeoTiffBand, GeoTiffError, SampleKind};
pub use projection::{
    CoordinateProjection, Crs, Ellipsoid, LambertAzimuthalEqualArea, ProjectionError,
    UtmProjection, WebMercator,
};
