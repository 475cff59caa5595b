//! Global descriptive statistics over raster grids.
//!
//! Statistics skip missing cells (non-finite values and the layer's own
//! no-data value), so a single gap never poisons a whole-grid figure.

use ndarray::ArrayView2;

/// A grid together with the value that marks its missing cells.
#[derive(Clone, Copy, Debug)]
pub struct Layer<'a> {
    /// Cell values
    pub data: ArrayView2<'a, f64>,
    /// Value marking missing cells, if any
    pub no_data: Option<f64>,
}

impl<'a> Layer<'a> {
    /// Layer whose only missing cells are non-finite ones.
    pub fn new(data: ArrayView2<'a, f64>) -> Self {
        Self {
            data,
            no_data: None,
        }
    }

    /// Also treat cells equal to `no_data` as missing.
    pub fn with_no_data(mut self, no_data: Option<f64>) -> Self {
        self.no_data = no_data;
        self
    }

    /// Whether a cell value counts towards statistics.
    #[inline]
    pub fn is_valid(&self, value: f64) -> bool {
        value.is_finite() && self.no_data != Some(value)
    }

    /// Iterator over the valid cell values.
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + 'a {
        let Layer { data, no_data } = *self;
        data.into_iter()
            .copied()
            .filter(move |&v| v.is_finite() && no_data != Some(v))
    }
}

/// Descriptive statistics of one grid.
///
/// All fields are NaN when the grid has no valid cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridStatistics {
    /// Arithmetic mean
    pub mean: f64,
    /// Median (mean of the two middle values for even counts)
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Number of valid cells
    pub count: usize,
}

impl GridStatistics {
    /// Statistics of an empty sample.
    pub fn empty() -> Self {
        Self {
            mean: f64::NAN,
            median: f64::NAN,
            std_dev: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            count: 0,
        }
    }

    /// Compute statistics over the valid cells of a layer.
    pub fn of_layer(layer: &Layer<'_>) -> Self {
        Self::compute(layer.valid_values().collect())
    }

    /// Compute statistics from a sample of finite values.
    pub fn compute(mut values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Self::empty();
        }

        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n as f64;

        values.sort_by(|a, b| a.total_cmp(b));
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };

        Self {
            mean,
            median,
            std_dev: variance.sqrt(),
            min: values[0],
            max: values[n - 1],
            count: n,
        }
    }
}

/// One row of the summary table.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRow {
    /// Row label
    pub raster: String,
    /// Statistics of that raster
    pub statistics: GridStatistics,
}

/// Summary statistics for the risk, inundation and land-use grids.
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryTable {
    /// Rows in output order
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Look up a row by label.
    pub fn row(&self, raster: &str) -> Option<&GridStatistics> {
        self.rows
            .iter()
            .find(|r| r.raster == raster)
            .map(|r| &r.statistics)
    }
}

/// Row labels of the summary table, in order.
pub const SUMMARY_ROWS: [&str; 3] = ["Risk", "Inundation", "Land Use"];

/// Compute the global summary table.
///
/// Each layer is summarised independently; rows are labelled
/// `Risk`, `Inundation` and `Land Use`.
pub fn global_summary(risk: &Layer<'_>, depth: &Layer<'_>, land_use: &Layer<'_>) -> SummaryTable {
    let statistics = [
        GridStatistics::of_layer(risk),
        GridStatistics::of_layer(depth),
        GridStatistics::of_layer(land_use),
    ];
    let rows = SUMMARY_ROWS
        .iter()
        .zip(statistics)
        .map(|(name, statistics)| SummaryRow {
            raster: (*name).to_string(),
            statistics,
        })
        .collect();
    SummaryTable { rows }
}
