//! JSON run report export

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::summary::RunSummary;
use crate::config::Settings;

/// Metadata about the run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub impactscout_version: String,
    pub data_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_values: Option<String>,
    pub output_dir: String,
    /// Effective settings after CLI overrides
    pub settings: Settings,
}

/// Totals across every season
#[derive(Serialize)]
pub struct RunTotals {
    pub seasons: usize,
    pub records: usize,
    pub excluded: usize,
    pub scored: usize,
    pub matched: usize,
    pub warnings: usize,
}

/// Complete JSON run report
#[derive(Serialize)]
pub struct RunReport<'a> {
    pub metadata: RunMetadata,
    pub totals: RunTotals,
    #[serde(flatten)]
    pub summary: &'a RunSummary,
}

pub struct ExportParams<'a> {
    pub data_dir: &'a Path,
    pub market_values: Option<&'a Path>,
    pub output_dir: &'a Path,
    pub settings: &'a Settings,
}

impl RunTotals {
    fn from_summary(summary: &RunSummary) -> Self {
        let s = &summary.seasons;
        Self {
            seasons: s.len(),
            records: s.iter().map(|x| x.records).sum(),
            excluded: s.iter().map(|x| x.exclusions.total_excluded()).sum(),
            scored: s.iter().map(|x| x.scored).sum(),
            matched: s
                .iter()
                .filter_map(|x| x.coverage.as_ref())
                .map(|c| c.matched)
                .sum(),
            warnings: summary.total_warnings(),
        }
    }
}

/// Write the run report as pretty-printed JSON.
pub fn export_run_report(
    summary: &RunSummary,
    output_path: &Path,
    params: &ExportParams,
) -> Result<()> {
    let report = RunReport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            impactscout_version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: params.data_dir.display().to_string(),
            market_values: params.market_values.map(|p| p.display().to_string()),
            output_dir: params.output_dir.display().to_string(),
            settings: params.settings.clone(),
        },
        totals: RunTotals::from_summary(summary),
        summary,
    };

    let json =
        serde_json::to_string_pretty(&report).context("Failed to serialize run report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write run report to {}", output_path.display()))?;

    Ok(())
}
