//! Annualized flood-risk computation.
//!
//! Risk per cell is
//!
//! ```text
//! hazard = depth * velocity   if velocity > threshold
//!        = depth              otherwise (or without velocity)
//! risk   = land_use_value * hazard / return_period
//! ```
//!
//! where `land_use_value` is the damage coefficient of the cell's land-use
//! category. The [`RiskEngine`] runs the whole pipeline from files; the
//! kernels in this module are also usable on in-memory grids:
//!
//! ```
//! use flood_risk::risk::{apply_no_data, compute_risk, hazard_intensity};
//! use ndarray::array;
//!
//! let depth = array![[2.0, 0.0], [4.0, 1.0]];
//! let land_use_values = array![[10.0, 10.0], [5.0, 5.0]];
//!
//! let hazard = hazard_intensity(depth.view(), None, 1.0);
//! let mut risk = compute_risk(land_use_values.view(), hazard.view(), 2);
//! apply_no_data(&mut risk, depth.view(), None, -9999.0, true);
//!
//! assert_eq!(risk, array![[10.0, -9999.0], [10.0, 2.5]]);
//! ```

mod engine;
mod hazard;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{ConfigError, UnmappedLandUse};
use crate::raster::RasterError;
use crate::types::BoundingBox;

pub use engine::{
    RiskEngine, RiskOutcome, LAND_USE_RISK_TABLE, REPORT_PDF, RISK_OUTPUT, SUMMARY_TABLE,
};
pub use hazard::{apply_no_data, compute_risk, hazard_intensity};
#[cfg(feature = "parallel")]
pub use hazard::{apply_no_data_parallel, compute_risk_parallel, hazard_intensity_parallel};

/// Error type for a risk run.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Invalid parameters or configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A raster could not be loaded, resampled or saved
    #[error("{stage} failed: {source}")]
    Raster {
        /// Pipeline stage that failed
        stage: &'static str,
        /// Underlying raster error
        source: RasterError,
    },

    /// Land use contains codes missing from the damage table
    #[error(transparent)]
    UnmappedLandUse(#[from] UnmappedLandUse),

    /// Writing an output failed
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The report generator failed
    #[error("failed to generate report {}: {source}", path.display())]
    Report {
        /// Report that was being written
        path: PathBuf,
        /// Generator error
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RiskError {
    fn raster(stage: &'static str, source: RasterError) -> Self {
        RiskError::Raster { stage, source }
    }
}

/// Renders the risk raster into a printable report.
///
/// Implementations receive the written risk GeoTIFF, its extent in the
/// raster CRS and the path the report must be written to.
pub trait ReportGenerator {
    /// Write the report to `output`.
    fn generate(
        &self,
        risk_raster: &Path,
        bounds: &BoundingBox,
        output: &Path,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
