//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;
use crate::report::{audit_path, efficiency_path, impact_path, OutputFormat};

/// impactscout - Role-relative player impact scoring and value comparison
#[derive(Parser, Debug)]
#[command(name = "impactscout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every configured season and, with market values, rank value efficiency
    Run(RunArgs),

    /// Validate a configuration file and print the weight table
    Check {
        /// Configuration file (TOML). Defaults are checked when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write the default configuration as TOML
    InitConfig {
        /// Destination path
        #[arg(default_value = "impactscout.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value = "false")]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory holding the fbref_<table>_<season> files
    #[arg(short, long)]
    pub data_dir: PathBuf,

    /// Season to process (repeatable). Overrides `seasons` from the config file.
    #[arg(short, long = "season")]
    pub seasons: Vec<String>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Market valuation file (CSV or Parquet). Without it only impact scores are written.
    #[arg(short, long)]
    pub market_values: Option<PathBuf>,

    /// Manual valuation overrides (player, team, market_value_eur)
    #[arg(long, requires = "market_values")]
    pub manual_values: Option<PathBuf>,

    /// Output directory. Defaults to the data directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output table format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Override cleaner.min_minutes
    #[arg(long, value_parser = validate_min_minutes)]
    pub min_minutes: Option<f64>,

    /// Override normalizer.min_peer_count
    #[arg(long)]
    pub min_peer_count: Option<usize>,

    /// Override logging.level (RUST_LOG still wins)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,
}

impl RunArgs {
    /// Output directory, falling back to the data directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.clone())
    }

    /// Every table path this run will write.
    pub fn artifact_paths(&self, seasons: &[String]) -> Vec<PathBuf> {
        let out = self.output_dir();
        let mut paths = Vec::new();
        for season in seasons {
            paths.push(impact_path(&out, season, self.format));
            if self.market_values.is_some() {
                paths.push(efficiency_path(&out, season, self.format));
                paths.push(audit_path(&out, season, self.format));
            }
        }
        if let Some(report) = &self.report {
            paths.push(report.clone());
        }
        paths
    }

    /// Apply command-line overrides on top of file settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if !self.seasons.is_empty() {
            settings.seasons = self.seasons.clone();
        }
        if let Some(m) = self.min_minutes {
            settings.cleaner.min_minutes = m;
        }
        if let Some(n) = self.min_peer_count {
            settings.normalizer.min_peer_count = n;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
    }
}

/// Validator for min_minutes parameter
fn validate_min_minutes(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !value.is_finite() || value < 0.0 {
        Err(format!("min_minutes must be a non-negative number, got {}", value))
    } else {
        Ok(value)
    }
}
