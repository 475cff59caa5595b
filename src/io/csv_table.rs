//! CSV writers for the statistics tables.
//!
//! Floats are written in their shortest round-trip form with a trailing
//! `.0` for whole numbers; NaN statistics become empty fields.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::analysis::{CategoryRisk, SummaryTable};

/// Header of `summary_table.csv`.
pub const SUMMARY_HEADER: &str = "Raster,Mean,Median,Standard Deviation,Minimum,Maximum";

/// Header of `land_use_risk.csv`.
pub const CATEGORY_HEADER: &str = "Land Use Category,Total Risk,Average Risk,Pixel Count";

fn field(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{:?}", value)
    }
}

/// Write the global summary table.
pub fn write_summary_csv(path: &Path, table: &SummaryTable) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_summary(&mut out, table)?;
    out.flush()
}

/// Write the per-category risk table.
pub fn write_category_csv(path: &Path, rows: &[CategoryRisk]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_categories(&mut out, rows)?;
    out.flush()
}

fn write_summary<W: Write>(out: &mut W, table: &SummaryTable) -> std::io::Result<()> {
    writeln!(out, "{}", SUMMARY_HEADER)?;
    for row in &table.rows {
        let s = &row.statistics;
        writeln!(
            out,
            "{},{},{},{},{},{}",
            row.raster,
            field(s.mean),
            field(s.median),
            field(s.std_dev),
            field(s.min),
            field(s.max)
        )?;
    }
    Ok(())
}

fn write_categories<W: Write>(out: &mut W, rows: &[CategoryRisk]) -> std::io::Result<()> {
    writeln!(out, "{}", CATEGORY_HEADER)?;
    for row in rows {
        writeln!(
            out,
            "{},{},{},{}",
            field(row.category),
            field(row.total_risk),
            field(row.average_risk),
            row.pixel_count
        )?;
    }
    Ok(())
}
