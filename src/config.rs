//! Static configuration and per-run parameters.
//!
//! [`RiskConfig`] holds everything that stays fixed across runs (the
//! land-use damage table, the land-use raster, the velocity threshold and
//! resampling choices). [`RunParameters`] describes one analysis: which
//! depth raster, which return period, where to write the results.
//!
//! Both are plain serde data and can be read from JSON:
//!
//! ```json
//! {
//!   "return_period": 100,
//!   "no_data_value": -9999.0,
//!   "flood_depth_file": "data/depth_hq100.tif",
//!   "velocity_file": null,
//!   "output_dir": "out"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::raster::Resampling;

/// Default location of the CORINE 2018 land-use raster.
pub const DEFAULT_LAND_USE_PATH: &str = "data/U2018_CLC2018_V2020_20u1.tif";

/// Velocity (m/s) above which velocity amplifies the hazard.
pub const DEFAULT_VELOCITY_THRESHOLD: f64 = 1.0;

/// CORINE Land Cover 2018 codes and their damage coefficients.
const CORINE_2018: [(i64, f64); 45] = [
    // Urban
    (1, 50.0),
    (2, 40.0),
    (3, 30.0),
    (4, 30.0),
    (5, 25.0),
    (6, 25.0),
    // Extraction and construction
    (7, 20.0),
    (8, 20.0),
    (9, 15.0),
    // Recreational
    (10, 15.0),
    (11, 15.0),
    // Agricultural
    (12, 10.0),
    (13, 15.0),
    (14, 15.0),
    (15, 20.0),
    (16, 20.0),
    (17, 20.0),
    (18, 10.0),
    (19, 12.0),
    (20, 12.0),
    (21, 12.0),
    (22, 12.0),
    // Forest and natural vegetation
    (23, 5.0),
    (24, 5.0),
    (25, 5.0),
    (26, 8.0),
    (27, 8.0),
    (28, 8.0),
    (29, 8.0),
    // Bare ground
    (30, 3.0),
    (31, 3.0),
    (32, 3.0),
    (33, 1.0),
    (34, 2.0),
    // Wetlands
    (35, 15.0),
    (36, 15.0),
    (37, 15.0),
    (38, 15.0),
    (39, 15.0),
    // Water
    (40, 10.0),
    (41, 10.0),
    (42, 10.0),
    (43, 10.0),
    (44, 10.0),
    // CORINE no-data
    (48, 0.0),
];

/// Error type for configuration and parameter validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Return period must be at least one year
    #[error("return period must be a positive number of years, got {0}")]
    NonPositiveReturnPeriod(u32),

    /// No-data sentinel must be a finite number
    #[error("no-data value must be finite, got {0}")]
    NonFiniteNoData(f64),

    /// Velocity threshold must be a finite number
    #[error("velocity threshold must be finite, got {0}")]
    NonFiniteThreshold(f64),

    /// Damage coefficients must be finite and non-negative
    #[error("damage coefficient for land-use code {code} must be non-negative, got {value}")]
    InvalidCoefficient {
        /// Land-use code
        code: i64,
        /// Offending coefficient
        value: f64,
    },

    /// A required input file does not exist
    #[error("{what} not found: {}", path.display())]
    MissingFile {
        /// Which input
        what: &'static str,
        /// Expected location
        path: PathBuf,
    },

    /// Reading a configuration file failed
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A configuration file is not valid JSON for its type
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// Land-use cells whose value has no damage coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error(
    "land-use value {code} at row {row}, col {col} has no damage coefficient \
     ({count} unmapped cells)"
)]
pub struct UnmappedLandUse {
    /// First offending value in row-major order
    pub code: f64,
    /// Row of the first offending cell
    pub row: usize,
    /// Column of the first offending cell
    pub col: usize,
    /// Total number of offending cells
    pub count: usize,
}

/// Immutable mapping from land-use category code to damage coefficient.
///
/// # Example
///
/// ```
/// use flood_risk::config::DamageTable;
///
/// let table = DamageTable::corine_2018();
/// assert_eq!(table.get(1), Some(50.0));
/// assert_eq!(table.get(48), Some(0.0));
/// assert_eq!(table.get(45), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DamageTable {
    coefficients: BTreeMap<i64, f64>,
}

impl DamageTable {
    /// Table from `(code, coefficient)` pairs. Later duplicates win.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        Self {
            coefficients: pairs.into_iter().collect(),
        }
    }

    /// CORINE Land Cover 2018 table.
    pub fn corine_2018() -> Self {
        Self::from_pairs(CORINE_2018)
    }

    /// Coefficient of a code.
    pub fn get(&self, code: i64) -> Option<f64> {
        self.coefficients.get(&code).copied()
    }

    /// Number of codes.
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Whether the table has no codes.
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Iterator over `(code, coefficient)` in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.coefficients.iter().map(|(&k, &v)| (k, v))
    }

    /// Check every coefficient is finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.iter().find(|&(_, v)| !(v.is_finite() && v >= 0.0)) {
            Some((code, value)) => Err(ConfigError::InvalidCoefficient { code, value }),
            None => Ok(()),
        }
    }

    /// Coefficient for a cell value, `None` if the value is not a known
    /// integer code.
    fn lookup(&self, value: f64) -> Option<f64> {
        if value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
            return None;
        }
        self.get(value as i64)
    }

    /// Map a grid of land-use codes to damage coefficients.
    ///
    /// NaN cells (no land-use coverage) stay NaN. Any other value that is
    /// not a code in the table fails the whole mapping; the error names the
    /// first such cell and how many there are.
    pub fn map_grid(&self, codes: ArrayView2<'_, f64>) -> Result<Array2<f64>, UnmappedLandUse> {
        let mut first: Option<(f64, usize, usize)> = None;
        let mut count = 0;

        let values = Array2::from_shape_fn(codes.dim(), |(row, col)| {
            let code = codes[[row, col]];
            if code.is_nan() {
                return f64::NAN;
            }
            match self.lookup(code) {
                Some(value) => value,
                None => {
                    count += 1;
                    if first.is_none() {
                        first = Some((code, row, col));
                    }
                    f64::NAN
                }
            }
        });

        match first {
            Some((code, row, col)) => Err(UnmappedLandUse {
                code,
                row,
                col,
                count,
            }),
            None => Ok(values),
        }
    }
}

impl Default for DamageTable {
    fn default() -> Self {
        Self::corine_2018()
    }
}

/// Configuration shared by every run of the risk engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Land-use code to damage coefficient
    pub damage_table: DamageTable,
    /// Land-use raster resampled onto each depth grid
    pub land_use_path: PathBuf,
    /// Velocity above which hazard becomes depth times velocity
    pub velocity_threshold: f64,
    /// Resampling used for the land-use raster
    pub land_use_resampling: Resampling,
    /// Resampling used to align a velocity raster with the depth grid
    pub velocity_resampling: Resampling,
    /// Write cells with exactly zero risk as no-data
    pub treat_zero_as_no_data: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            damage_table: DamageTable::corine_2018(),
            land_use_path: PathBuf::from(DEFAULT_LAND_USE_PATH),
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
            land_use_resampling: Resampling::Bilinear,
            velocity_resampling: Resampling::Bilinear,
            treat_zero_as_no_data: true,
        }
    }
}

impl RiskConfig {
    /// Read a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }

    /// Set the land-use raster.
    pub fn with_land_use_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.land_use_path = path.into();
        self
    }

    /// Set the damage table.
    pub fn with_damage_table(mut self, table: DamageTable) -> Self {
        self.damage_table = table;
        self
    }

    /// Set the land-use resampling method.
    pub fn with_land_use_resampling(mut self, method: Resampling) -> Self {
        self.land_use_resampling = method;
        self
    }

    /// Set the velocity threshold.
    pub fn with_velocity_threshold(mut self, threshold: f64) -> Self {
        self.velocity_threshold = threshold;
        self
    }

    /// Keep or replace exact-zero risk cells.
    pub fn with_zero_as_no_data(mut self, enabled: bool) -> Self {
        self.treat_zero_as_no_data = enabled;
        self
    }

    /// Check the threshold and damage table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.velocity_threshold.is_finite() {
            return Err(ConfigError::NonFiniteThreshold(self.velocity_threshold));
        }
        self.damage_table.validate()
    }
}

/// Parameters of one risk analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    /// Flood return period in years
    pub return_period: u32,
    /// Sentinel written to cells without a risk value
    pub no_data_value: f64,
    /// Inundation depth raster; defines the output grid
    pub flood_depth_file: PathBuf,
    /// Optional flow velocity raster
    #[serde(default)]
    pub velocity_file: Option<PathBuf>,
    /// Directory receiving the outputs, created if missing
    pub output_dir: PathBuf,
    /// Also produce a PDF report
    #[serde(default)]
    pub generate_pdf: bool,
}

impl RunParameters {
    /// Read parameters from JSON.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }

    /// Check value ranges and that the input rasters exist.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.return_period == 0 {
            return Err(ConfigError::NonPositiveReturnPeriod(self.return_period));
        }
        if !self.no_data_value.is_finite() {
            return Err(ConfigError::NonFiniteNoData(self.no_data_value));
        }
        if !self.flood_depth_file.is_file() {
            return Err(ConfigError::MissingFile {
                what: "flood depth raster",
                path: self.flood_depth_file.clone(),
            });
        }
        if let Some(velocity) = &self.velocity_file {
            if !velocity.is_file() {
                return Err(ConfigError::MissingFile {
                    what: "velocity raster",
                    path: velocity.clone(),
                });
            }
        }
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn test_corine_table() {
        let table = DamageTable::corine_2018();
        assert_eq!(table.len(), 45);
        for (code, value) in CORINE_2018 {
            assert_eq!(table.get(code), Some(value), "code {}", code);
        }
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(45), None);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_map_grid() {
        let table = DamageTable::from_pairs([(1, 50.0), (12, 10.0), (48, 0.0)]);
        let codes = array![[1.0, 12.0], [48.0, f64::NAN]];

        let values = table.map_grid(codes.view()).unwrap();

        assert_eq!(values[[0, 0]], 50.0);
        assert_eq!(values[[0, 1]], 10.0);
        assert_eq!(values[[1, 0]], 0.0);
        assert!(values[[1, 1]].is_nan());
    }

    #[test]
    fn test_map_grid_unmapped() {
        let table = DamageTable::from_pairs([(1, 50.0)]);
        let codes = array![[1.0, 7.0], [9.0, 1.0]];

        let err = table.map_grid(codes.view()).unwrap_err();

        assert_eq!(
            err,
            UnmappedLandUse {
                code: 7.0,
                row: 0,
                col: 1,
                count: 2
            }
        );
        assert!(err.to_string().contains("land-use value 7"));
    }

    #[test]
    fn test_map_grid_fractional_code() {
        let table = DamageTable::from_pairs([(1, 50.0), (2, 40.0)]);
        let err = table.map_grid(array![[1.5]].view()).unwrap_err();
        assert_eq!(err.code, 1.5);
        assert_eq!(err.count, 1);
    }

    #[test]
    fn test_invalid_coefficient() {
        let table = DamageTable::from_pairs([(1, 50.0), (2, -1.0)]);
        assert!(matches!(
            table.validate(),
            Err(ConfigError::InvalidCoefficient { code: 2, .. })
        ));
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "damage_table": { "1": 50.0, "2": 40.0 }, "land_use_resampling": "nearest" }"#,
        )
        .unwrap();

        let config = RiskConfig::from_json_file(&path).unwrap();

        assert_eq!(config.damage_table.len(), 2);
        assert_eq!(config.damage_table.get(2), Some(40.0));
        assert_eq!(config.land_use_resampling, Resampling::Nearest);
        assert_eq!(config.velocity_resampling, Resampling::Bilinear);
        assert_eq!(config.velocity_threshold, 1.0);
        assert!(config.treat_zero_as_no_data);
        assert_eq!(config.land_use_path, PathBuf::from(DEFAULT_LAND_USE_PATH));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = RiskConfig::default()
            .with_land_use_path("lu.tif")
            .with_zero_as_no_data(false);
        let json = serde_json::to_string(&config).unwrap();
        let back: RiskConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    fn params(dir: &Path) -> RunParameters {
        let depth = dir.join("depth.tif");
        std::fs::write(&depth, b"").unwrap();
        RunParameters {
            return_period: 100,
            no_data_value: -9999.0,
            flood_depth_file: depth,
            velocity_file: None,
            output_dir: dir.join("out"),
            generate_pdf: false,
        }
    }

    #[test]
    fn test_validate_parameters() {
        let dir = tempdir().unwrap();
        let ok = params(dir.path());
        assert!(ok.validate().is_ok());

        let zero = RunParameters {
            return_period: 0,
            ..ok.clone()
        };
        assert!(matches!(
            zero.validate(),
            Err(ConfigError::NonPositiveReturnPeriod(0))
        ));

        let nan = RunParameters {
            no_data_value: f64::NAN,
            ..ok.clone()
        };
        assert!(matches!(nan.validate(), Err(ConfigError::NonFiniteNoData(_))));

        let missing = RunParameters {
            velocity_file: Some(dir.path().join("velocity.tif")),
            ..ok
        };
        let err = missing.validate().unwrap_err();
        assert!(err.to_string().contains("velocity raster not found"));
    }

    #[test]
    fn test_parameters_from_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(
            &path,
            r#"{
                "return_period": 2,
                "no_data_value": -9999,
                "flood_depth_file": "depth.tif",
                "output_dir": "out"
            }"#,
        )
        .unwrap();

        let params = RunParameters::from_json_file(&path).unwrap();
        assert_eq!(params.return_period, 2);
        assert_eq!(params.no_data_value, -9999.0);
        assert!(params.velocity_file.is_none());
        assert!(!params.generate_pdf);
    }

    #[test]
    fn test_bad_json_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = RunParameters::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains("params.json"));
    }
}
