//! Command-line driver for the flood-risk pipeline.
//!
//! ```text
//! flood_risk --depth depth_hq100.tif --return-period 100 --no-data -9999 --output-dir out
//! flood_risk --params run.json --config corine.json
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use flood_risk::config::{RiskConfig, RunParameters};
use flood_risk::raster::Resampling;
use flood_risk::risk::RiskEngine;

#[derive(Parser, Debug)]
#[command(author, version, about = "Annualized flood risk from depth, velocity and land-use rasters", long_about = None)]
struct Cli {
    /// JSON file with run parameters; individual flags override its fields
    #[arg(long)]
    params: Option<PathBuf>,

    /// Flood return period in years
    #[arg(long)]
    return_period: Option<u32>,

    /// Value written to cells without a risk estimate
    #[arg(long, allow_hyphen_values = true)]
    no_data: Option<f64>,

    /// Inundation depth GeoTIFF; defines the output grid
    #[arg(long)]
    depth: Option<PathBuf>,

    /// Flow velocity GeoTIFF
    #[arg(long)]
    velocity: Option<PathBuf>,

    /// Directory for the outputs
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Also produce a PDF report
    #[arg(long)]
    generate_pdf: bool,

    /// JSON file with the damage table and other static settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Land-use GeoTIFF (overrides the configuration)
    #[arg(long)]
    land_use: Option<PathBuf>,

    /// Resampling used for land use
    #[arg(long)]
    land_use_resampling: Option<Resampling>,

    /// Keep cells with zero risk instead of writing them as no-data
    #[arg(long)]
    keep_zero_risk: bool,
}

impl Cli {
    fn run_parameters(&self) -> Result<RunParameters> {
        let base = match &self.params {
            Some(path) => Some(
                RunParameters::from_json_file(path)
                    .with_context(|| format!("Failed to read run parameters {}", path.display()))?,
            ),
            None => None,
        };

        let return_period = self
            .return_period
            .or(base.as_ref().map(|p| p.return_period));
        let no_data_value = self.no_data.or(base.as_ref().map(|p| p.no_data_value));
        let flood_depth_file = self
            .depth
            .clone()
            .or(base.as_ref().map(|p| p.flood_depth_file.clone()));
        let output_dir = self
            .output_dir
            .clone()
            .or(base.as_ref().map(|p| p.output_dir.clone()));

        let (Some(return_period), Some(no_data_value), Some(flood_depth_file), Some(output_dir)) =
            (return_period, no_data_value, flood_depth_file, output_dir)
        else {
            bail!("--return-period, --no-data, --depth and --output-dir are required without --params");
        };

        Ok(RunParameters {
            return_period,
            no_data_value,
            flood_depth_file,
            velocity_file: self
                .velocity
                .clone()
                .or(base.as_ref().and_then(|p| p.velocity_file.clone())),
            output_dir,
            generate_pdf: self.generate_pdf || base.as_ref().is_some_and(|p| p.generate_pdf),
        })
    }

    fn risk_config(&self) -> Result<RiskConfig> {
        let mut config = match &self.config {
            Some(path) => RiskConfig::from_json_file(path)
                .with_context(|| format!("Failed to read configuration {}", path.display()))?,
            None => RiskConfig::default(),
        };
        if let Some(path) = &self.land_use {
            config = config.with_land_use_path(path);
        }
        if let Some(method) = self.land_use_resampling {
            config = config.with_land_use_resampling(method);
        }
        if self.keep_zero_risk {
            config = config.with_zero_as_no_data(false);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let params = cli.run_parameters()?;
    let config = cli.risk_config()?;

    let outcome = RiskEngine::new(config)
        .run(&params)
        .context("Flood risk analysis failed")?;

    info!(
        "Done: {} cells, {} without risk, {} land-use categories",
        outcome.risk.len(),
        outcome.no_data_cells,
        outcome.categories.len()
    );
    println!("{}", outcome.risk_path.display());
    println!("{}", outcome.summary_path.display());
    println!("{}", outcome.category_path.display());
    if let Some(report) = &outcome.report_path {
        println!("{}", report.display());
    }
    Ok(())
}
