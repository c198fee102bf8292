//! Output tables: impact scores and value efficiency, as CSV or Parquet

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use polars::prelude::*;

use crate::pipeline::{ImpactTable, ValueComparison};

/// File format of the output tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// `<out_dir>/impact_<season>.<ext>`
pub fn impact_path(out_dir: &Path, season: &str, format: OutputFormat) -> PathBuf {
    out_dir.join(format!("impact_{}.{}", season, format.extension()))
}

/// `<out_dir>/value_efficiency_<season>.<ext>`
pub fn efficiency_path(out_dir: &Path, season: &str, format: OutputFormat) -> PathBuf {
    out_dir.join(format!("value_efficiency_{}.{}", season, format.extension()))
}

/// `<out_dir>/match_audit_<season>.<ext>`
pub fn audit_path(out_dir: &Path, season: &str, format: OutputFormat) -> PathBuf {
    out_dir.join(format!("match_audit_{}.{}", season, format.extension()))
}

/// Impact scores as a frame, in the table's sort order.
pub fn impact_frame(table: &ImpactTable) -> PolarsResult<DataFrame> {
    let s = &table.scores;
    DataFrame::new(vec![
        Column::new("player".into(), s.iter().map(|r| r.player.as_str()).collect::<Vec<_>>()),
        Column::new("team".into(), s.iter().map(|r| r.team.as_str()).collect::<Vec<_>>()),
        Column::new("season".into(), s.iter().map(|r| r.season.as_str()).collect::<Vec<_>>()),
        Column::new("role".into(), s.iter().map(|r| r.role.as_str()).collect::<Vec<_>>()),
        Column::new("minutes".into(), s.iter().map(|r| r.minutes).collect::<Vec<_>>()),
        Column::new("reliability".into(), s.iter().map(|r| r.reliability).collect::<Vec<_>>()),
        Column::new("raw_impact".into(), s.iter().map(|r| r.raw).collect::<Vec<_>>()),
        Column::new("adjusted_impact".into(), s.iter().map(|r| r.adjusted).collect::<Vec<_>>()),
        Column::new("low_confidence".into(), s.iter().map(|r| r.low_confidence).collect::<Vec<_>>()),
    ])
}

/// Value-efficiency entries as a frame, sorted by role then rank.
pub fn efficiency_frame(comparison: &ValueComparison) -> PolarsResult<DataFrame> {
    let e = &comparison.entries;
    DataFrame::new(vec![
        Column::new("rank".into(), e.iter().map(|r| r.rank as u32).collect::<Vec<_>>()),
        Column::new("player".into(), e.iter().map(|r| r.player.as_str()).collect::<Vec<_>>()),
        Column::new("team".into(), e.iter().map(|r| r.team.as_str()).collect::<Vec<_>>()),
        Column::new("role".into(), e.iter().map(|r| r.role.as_str()).collect::<Vec<_>>()),
        Column::new("adjusted_impact".into(), e.iter().map(|r| r.adjusted_impact).collect::<Vec<_>>()),
        Column::new("market_value_eur".into(), e.iter().map(|r| r.market_value_eur).collect::<Vec<_>>()),
        Column::new("normalized_value".into(), e.iter().map(|r| r.normalized_value).collect::<Vec<_>>()),
        Column::new("efficiency".into(), e.iter().map(|r| r.efficiency).collect::<Vec<_>>()),
    ])
}

/// Fuzzy matches and unmatched players, in impact-table order.
pub fn audit_frame(comparison: &ValueComparison) -> PolarsResult<DataFrame> {
    let a = &comparison.audit;
    DataFrame::new(vec![
        Column::new("player".into(), a.iter().map(|r| r.player.as_str()).collect::<Vec<_>>()),
        Column::new("team".into(), a.iter().map(|r| r.team.as_str()).collect::<Vec<_>>()),
        Column::new("status".into(), a.iter().map(|r| r.status.as_str()).collect::<Vec<_>>()),
        Column::new("candidate".into(), a.iter().map(|r| r.candidate.as_deref()).collect::<Vec<_>>()),
        Column::new("similarity".into(), a.iter().map(|r| r.similarity).collect::<Vec<_>>()),
    ])
}

/// Write a frame, overwriting any existing file. The format follows the extension.
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}
