//! Statistics over the computed risk surface.
//!
//! This module provides:
//! - Global descriptive statistics (mean, median, standard deviation, min, max)
//!   for the risk, inundation and land-use grids
//! - Risk totals, averages and pixel counts per land-use category
//!
//! # Example
//!
//! ```
//! use flood_risk::analysis::{global_summary, risk_by_category, Layer};
//! use ndarray::array;
//!
//! let risk = array![[10.0, -9999.0], [10.0, 2.5]];
//! let depth = array![[2.0, 0.0], [4.0, 1.0]];
//! let land_use = array![[10.0, 10.0], [5.0, 5.0]];
//!
//! let summary = global_summary(
//!     &Layer::new(risk.view()).with_no_data(Some(-9999.0)),
//!     &Layer::new(depth.view()),
//!     &Layer::new(land_use.view()),
//! );
//! assert_eq!(summary.row("Risk").unwrap().max, 10.0);
//!
//! let by_category = risk_by_category(risk.view(), land_use.view(), -9999.0);
//! assert_eq!(by_category[0].category, 5.0);
//! assert_eq!(by_category[0].total_risk, 12.5);
//! ```

mod by_category;
mod summary;

pub use by_category::{risk_by_category, CategoryRisk};
pub use summary::{global_summary, GridStatistics, Layer, SummaryRow, SummaryTable, SUMMARY_ROWS};
