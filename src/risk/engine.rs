//! The flood-risk pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use ndarray::Array2;

use crate::analysis::{global_summary, risk_by_category, CategoryRisk, Layer, SummaryTable};
use crate::config::{RiskConfig, RunParameters};
use crate::io::{write_category_csv, write_summary_csv};
use crate::raster::{Raster, RasterError, Resampling};
use crate::types::BoundingBox;

#[cfg(feature = "parallel")]
use super::hazard::{
    apply_no_data_parallel as apply_no_data, compute_risk_parallel as compute_risk,
    hazard_intensity_parallel as hazard_intensity,
};
#[cfg(not(feature = "parallel"))]
use super::hazard::{apply_no_data, compute_risk, hazard_intensity};
use super::{ReportGenerator, RiskError};

/// File name of the risk raster.
pub const RISK_OUTPUT: &str = "risk_output.tif";
/// File name of the global statistics table.
pub const SUMMARY_TABLE: &str = "summary_table.csv";
/// File name of the per-category statistics table.
pub const LAND_USE_RISK_TABLE: &str = "land_use_risk.csv";
/// File name of the optional PDF report.
pub const REPORT_PDF: &str = "FloodRiskAnalysis.pdf";

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RiskOutcome {
    /// Written risk raster
    pub risk_path: PathBuf,
    /// Written global statistics table
    pub summary_path: PathBuf,
    /// Written per-category statistics table
    pub category_path: PathBuf,
    /// Written report, if one was generated
    pub report_path: Option<PathBuf>,
    /// Extent of the risk raster in the depth CRS
    pub bounds: BoundingBox,
    /// Risk grid as written, with the no-data sentinel substituted
    pub risk: Array2<f64>,
    /// Number of cells holding the sentinel
    pub no_data_cells: usize,
    /// Global statistics
    pub summary: SummaryTable,
    /// Per-category statistics
    pub categories: Vec<CategoryRisk>,
}

/// Computes annualized flood risk from depth, velocity and land use.
///
/// # Example
///
/// ```ignore
/// use flood_risk::config::{RiskConfig, RunParameters};
/// use flood_risk::risk::RiskEngine;
///
/// let engine = RiskEngine::new(RiskConfig::default());
/// let outcome = engine.run(&RunParameters {
///     return_period: 100,
///     no_data_value: -9999.0,
///     flood_depth_file: "data/depth_hq100.tif".into(),
///     velocity_file: None,
///     output_dir: "out".into(),
///     generate_pdf: false,
/// })?;
/// println!("risk written to {}", outcome.risk_path.display());
/// ```
pub struct RiskEngine {
    config: RiskConfig,
    report: Option<Box<dyn ReportGenerator>>,
}

impl RiskEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            report: None,
        }
    }

    /// Attach a PDF report generator.
    pub fn with_report_generator<G: ReportGenerator + 'static>(mut self, generator: G) -> Self {
        self.report = Some(Box::new(generator));
        self
    }

    /// The engine's configuration.
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Run the full analysis for one set of parameters.
    ///
    /// The depth raster defines the output grid. Land use (and velocity,
    /// when its grid differs) is resampled onto it, risk is computed per
    /// cell and the raster and statistics tables are written to
    /// `params.output_dir`.
    pub fn run(&self, params: &RunParameters) -> Result<RiskOutcome, RiskError> {
        params.validate()?;
        self.config.validate()?;
        fs::create_dir_all(&params.output_dir).map_err(|source| RiskError::Io {
            path: params.output_dir.clone(),
            source,
        })?;

        info!("Loading flood depth {}", params.flood_depth_file.display());
        let depth = Raster::load(&params.flood_depth_file)
            .map_err(|source| RiskError::raster("loading flood depth", source))?;
        let bounds = depth
            .bounds()
            .ok_or_else(|| RiskError::raster("loading flood depth", RasterError::Unbound))?;
        debug!("Depth grid {}x{}, bounds {}", depth.width(), depth.height(), bounds);

        let land_use_values = self.land_use_values(&depth)?;

        let velocity = match &params.velocity_file {
            Some(path) => Some(self.aligned_velocity(&depth, path)?),
            None => None,
        };

        let hazard = hazard_intensity(
            depth.data().view(),
            velocity.as_ref().map(|v| v.view()),
            self.config.velocity_threshold,
        );
        let mut risk = compute_risk(land_use_values.view(), hazard.view(), params.return_period);
        let no_data_cells = apply_no_data(
            &mut risk,
            depth.data().view(),
            depth.no_data(),
            params.no_data_value,
            self.config.treat_zero_as_no_data,
        );
        debug!(
            "{} of {} cells set to no-data {}",
            no_data_cells,
            risk.len(),
            params.no_data_value
        );

        let summary = global_summary(
            &Layer::new(risk.view()).with_no_data(Some(params.no_data_value)),
            &Layer::new(depth.data().view()).with_no_data(depth.no_data()),
            &Layer::new(land_use_values.view()),
        );
        let categories = risk_by_category(risk.view(), land_use_values.view(), params.no_data_value);

        // Tables first, raster last; a failure removes what was written
        let summary_path = params.output_dir.join(SUMMARY_TABLE);
        let category_path = params.output_dir.join(LAND_USE_RISK_TABLE);
        let risk_path = params.output_dir.join(RISK_OUTPUT);

        write_summary_csv(&summary_path, &summary).map_err(|source| {
            discard(&[&summary_path]);
            RiskError::Io {
                path: summary_path.clone(),
                source,
            }
        })?;
        write_category_csv(&category_path, &categories).map_err(|source| {
            discard(&[&summary_path, &category_path]);
            RiskError::Io {
                path: category_path.clone(),
                source,
            }
        })?;
        info!(
            "Statistics written to {} and {}",
            summary_path.display(),
            category_path.display()
        );

        depth
            .save_raster(&risk_path, &risk, Some(params.no_data_value))
            .map_err(|source| {
                discard(&[&summary_path, &category_path, &risk_path]);
                RiskError::raster("saving risk raster", source)
            })?;
        info!("Risk raster written to {}", risk_path.display());

        let report_path = if params.generate_pdf {
            self.generate_report(&risk_path, &bounds, &params.output_dir)?
        } else {
            None
        };

        Ok(RiskOutcome {
            risk_path,
            summary_path,
            category_path,
            report_path,
            bounds,
            risk,
            no_data_cells,
            summary,
            categories,
        })
    }

    /// Resample land use onto the depth grid and map it to coefficients.
    ///
    /// Cells the land-use raster does not cover, or covers with its own
    /// no-data value, become NaN and end up as no-data in the risk grid.
    fn land_use_values(&self, depth: &Raster) -> Result<Array2<f64>, RiskError> {
        let method = self.config.land_use_resampling;
        if method == Resampling::Bilinear {
            warn!("Bilinear resampling of categorical land use can blend class codes at class boundaries");
        }

        info!(
            "Resampling land use {} onto depth grid ({})",
            self.config.land_use_path.display(),
            method
        );
        let land_use = Raster::load(&self.config.land_use_path)
            .map_err(|source| RiskError::raster("resampling land use", source))?;
        if !depth.overlaps(&land_use) {
            warn!(
                "Land use {} does not overlap the depth grid",
                self.config.land_use_path.display()
            );
        }

        let mut codes = depth
            .reproject_from(&land_use, method)
            .map_err(|source| RiskError::raster("resampling land use", source))?;
        if let Some(nd) = land_use.no_data() {
            codes.mapv_inplace(|v| if v == nd { f64::NAN } else { v });
        }

        let uncovered = codes.iter().filter(|v| v.is_nan()).count();
        if uncovered > 0 {
            warn!(
                "{} of {} cells have no land-use coverage and are written as no-data",
                uncovered,
                codes.len()
            );
        }

        Ok(self.config.damage_table.map_grid(codes.view())?)
    }

    /// Load a velocity raster and bring it onto the depth grid.
    ///
    /// Velocity no-data cells become NaN, which never exceeds the threshold.
    fn aligned_velocity(&self, depth: &Raster, path: &Path) -> Result<Array2<f64>, RiskError> {
        info!("Loading flow velocity {}", path.display());
        let velocity = Raster::load(path)
            .map_err(|source| RiskError::raster("loading flow velocity", source))?;

        let no_data = velocity.no_data();
        let mut grid = if depth.same_grid(&velocity) {
            velocity.into_data()
        } else {
            warn!(
                "Velocity grid {}x{} differs from depth grid {}x{}; resampling onto depth grid ({})",
                velocity.width(),
                velocity.height(),
                depth.width(),
                depth.height(),
                self.config.velocity_resampling
            );
            depth
                .reproject_from(&velocity, self.config.velocity_resampling)
                .map_err(|source| RiskError::raster("aligning flow velocity", source))?
        };

        if let Some(nd) = no_data {
            grid.mapv_inplace(|v| if v == nd { f64::NAN } else { v });
        }
        Ok(grid)
    }

    fn generate_report(
        &self,
        risk_path: &Path,
        bounds: &BoundingBox,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>, RiskError> {
        let Some(generator) = &self.report else {
            warn!("PDF report requested but no report generator is configured; skipping");
            return Ok(None);
        };

        let report_path = output_dir.join(REPORT_PDF);
        generator
            .generate(risk_path, bounds, &report_path)
            .map_err(|source| RiskError::Report {
                path: report_path.clone(),
                source,
            })?;
        info!("Report written to {}", report_path.display());
        Ok(Some(report_path))
    }
}

/// Remove output files of a failed run, ignoring files that never appeared.
fn discard(paths: &[&PathBuf]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove partial output {}: {}", path.display(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DamageTable;
    use crate::io::Crs;
    use crate::types::GeoTransform;
    use ndarray::array;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn write_raster(path: &Path, data: Array2<f64>, cell: f64) {
        let raster = Raster::from_grid(
            data,
            Crs::from_epsg(25832).unwrap(),
            GeoTransform::from_origin(456_000.0, 5_430_000.0, cell, cell),
        );
        raster.save_raster(path, raster.data(), None).unwrap();
    }

    fn setup(dir: &Path) -> (RiskConfig, RunParameters) {
        let depth = dir.join("depth.tif");
        let land_use = dir.join("land_use.tif");
        write_raster(&depth, array![[2.0, 0.0], [4.0, 1.0]], 10.0);
        write_raster(&land_use, array![[1.0, 1.0], [2.0, 2.0]], 10.0);

        let config = RiskConfig::default()
            .with_land_use_path(land_use)
            .with_land_use_resampling(Resampling::Nearest)
            .with_damage_table(DamageTable::from_pairs([(1, 10.0), (2, 5.0)]));
        let params = RunParameters {
            return_period: 2,
            no_data_value: -9999.0,
            flood_depth_file: depth,
            velocity_file: None,
            output_dir: dir.join("out"),
            generate_pdf: false,
        };
        (config, params)
    }

    #[test]
    fn test_run_without_velocity() {
        let dir = tempdir().unwrap();
        let (config, params) = setup(dir.path());

        let outcome = RiskEngine::new(config).run(&params).unwrap();

        assert_eq!(outcome.risk, array![[10.0, -9999.0], [10.0, 2.5]]);
        assert_eq!(outcome.no_data_cells, 1);
        assert!(outcome.risk_path.is_file());
        assert!(outcome.report_path.is_none());
        assert_eq!(outcome.categories.len(), 2);

        let written = Raster::load(&outcome.risk_path).unwrap();
        assert_eq!(written.data(), &outcome.risk);
        assert_eq!(written.no_data(), Some(-9999.0));
    }

    #[test]
    fn test_report_generator_called() {
        struct Recorder(Rc<RefCell<Vec<PathBuf>>>);

        impl ReportGenerator for Recorder {
            fn generate(
                &self,
                risk_raster: &Path,
                _bounds: &BoundingBox,
                output: &Path,
            ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
                self.0.borrow_mut().push(risk_raster.to_path_buf());
                std::fs::write(output, b"%PDF-1.4")?;
                Ok(())
            }
        }

        let dir = tempdir().unwrap();
        let (config, mut params) = setup(dir.path());
        params.generate_pdf = true;
        let calls = Rc::new(RefCell::new(Vec::new()));

        let outcome = RiskEngine::new(config)
            .with_report_generator(Recorder(Rc::clone(&calls)))
            .run(&params)
            .unwrap();

        assert_eq!(calls.borrow().as_slice(), &[outcome.risk_path.clone()]);
        let report = outcome.report_path.unwrap();
        assert!(report.ends_with(REPORT_PDF));
        assert!(report.is_file());
    }

    #[test]
    fn test_pdf_without_generator_is_skipped() {
        let dir = tempdir().unwrap();
        let (config, mut params) = setup(dir.path());
        params.generate_pdf = true;

        let outcome = RiskEngine::new(config).run(&params).unwrap();

        assert!(outcome.report_path.is_none());
        assert!(!params.output_dir.join(REPORT_PDF).exists());
    }

    #[test]
    fn test_coarse_velocity_is_aligned() {
        let dir = tempdir().unwrap();
        let (config, mut params) = setup(dir.path());
        // One 20 m cell covering the whole 2x2 depth grid
        let velocity = dir.path().join("velocity.tif");
        write_raster(&velocity, array![[3.0]], 20.0);
        params.velocity_file = Some(velocity);

        let outcome = RiskEngine::new(config).run(&params).unwrap();

        // hazard = depth * 3 everywhere, risk = coefficient * hazard / 2
        let expected = array![[30.0, -9999.0], [30.0, 7.5]];
        for (r, e) in outcome.risk.iter().zip(expected.iter()) {
            assert!((r - e).abs() < 1e-9, "risk {} vs {}", r, e);
        }
    }

    #[test]
    fn test_invalid_parameters_rejected_before_io() {
        let dir = tempdir().unwrap();
        let (config, mut params) = setup(dir.path());
        params.return_period = 0;

        let err = RiskEngine::new(config).run(&params).unwrap_err();

        assert!(matches!(err, RiskError::Config(_)));
        assert!(!params.output_dir.exists());
    }
}
