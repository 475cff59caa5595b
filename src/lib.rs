//! # flood-risk
//!
//! Annualized flood-risk estimation from geo-referenced rasters.
//!
//! This crate provides:
//! - GeoTIFF reading and writing with CRS and affine georeferencing
//! - Coordinate projections (UTM, Web Mercator, ETRS89-LAEA)
//! - Resampling of rasters onto a common grid (bilinear, nearest)
//! - Land-use damage tables (CORINE 2018 by default)
//! - Hazard and risk computation with no-data handling
//! - Global and per-land-use statistics with CSV output
//!
//! The flood depth raster defines the analysis grid; land use and
//! optional flow velocity are aligned onto it before risk is computed.

pub mod analysis;
pub mod config;
pub mod io;
pub mod raster;
pub mod risk;
pub mod types;

// Re-export main types for convenience
pub use analysis::{global_summary, risk_by_category, CategoryRisk, Layer, SummaryTable};
pub use config::{ConfigError, DamageTable, RiskConfig, RunParameters, UnmappedLandUse};
pub use io::{Crs, GeoTiffError, ProjectionError};
pub use raster::{Raster, RasterError, Resampling};
pub use risk::{
    apply_no_data, compute_risk, hazard_intensity, ReportGenerator, RiskEngine, RiskError,
    RiskOutcome,
};
#[cfg(feature = "parallel")]
pub use risk::{apply_no_data_parallel, compute_risk_parallel, hazard_intensity_parallel};
pub use types::{BoundingBox, GeoTransform, Resolution};
