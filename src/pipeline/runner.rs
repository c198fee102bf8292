//! Per-season orchestration of the five stages
//!
//! Loader -> Cleaner -> Normalizer -> Scorer -> Comparator. Each stage takes
//! the previous stage's table by reference and returns a new one.

use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::cleaner::{clean_season, CleanedSeason, CleanerConfig};
use super::columns::{ColumnDictionary, SourceTable};
use super::comparator::{compare_values, ComparatorConfig, ValueComparison};
use super::loader::{load_season, LoaderConfig};
use super::normalizer::{normalize_season, NormalizerConfig, PercentileTable};
use super::scorer::{ImpactTable, Scorer};
use super::valuation::{apply_manual_values, load_market_values, MarketValues};
use crate::config::Settings;
use crate::error::{ConfigError, CoverageWarning, DataError};

/// Everything one season's pass produced.
#[derive(Debug, Clone)]
pub struct SeasonOutcome {
    pub season: String,
    pub tables_loaded: Vec<SourceTable>,
    pub tables_skipped: Vec<SourceTable>,
    pub cleaned: CleanedSeason,
    pub percentiles: PercentileTable,
    pub impacts: ImpactTable,
    /// Present when market values were supplied.
    pub comparison: Option<ValueComparison>,
    pub warnings: Vec<CoverageWarning>,
}

/// A validated pipeline, ready to process seasons.
#[derive(Debug, Clone)]
pub struct Pipeline {
    dictionary: ColumnDictionary,
    loader: LoaderConfig,
    cleaner: CleanerConfig,
    normalizer: NormalizerConfig,
    scorer: Scorer,
    comparator: ComparatorConfig,
    as_of: Option<NaiveDate>,
}

impl Pipeline {
    /// Validate settings and build every stage. No data is read.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        settings.cleaner.validate()?;
        settings.normalizer.validate()?;
        let as_of = settings.comparator.validate()?;
        let dictionary = settings.dictionary()?;
        let scorer = Scorer::new(&settings.scoring, &dictionary)?;

        Ok(Self {
            dictionary,
            loader: settings.loader.clone(),
            cleaner: settings.cleaner.clone(),
            normalizer: settings.normalizer.clone(),
            scorer,
            comparator: settings.comparator.clone(),
            as_of,
        })
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Load the valuation snapshot, then apply manual overrides if given.
    pub fn load_market_values(
        &self,
        path: &Path,
        manual: Option<&Path>,
    ) -> Result<MarketValues, DataError> {
        let values = load_market_values(path, self.as_of)?;
        match manual {
            Some(manual_path) => apply_manual_values(&values, manual_path),
            None => Ok(values),
        }
    }

    /// Run all stages for one season.
    pub fn run_season(
        &self,
        data_dir: &Path,
        season: &str,
        values: Option<&MarketValues>,
    ) -> Result<SeasonOutcome, DataError> {
        let table = load_season(data_dir, season, &self.loader, &self.dictionary)?;
        let cleaned = clean_season(&table, &self.cleaner, &self.dictionary);

        let metrics = self.scorer.metrics_of_interest();
        let percentiles = normalize_season(&cleaned, &metrics, &self.normalizer);
        let impacts = self.scorer.score_season(&percentiles);
        let comparison = values.map(|v| compare_values(&impacts, v, &self.comparator));

        let mut warnings = percentiles.coverage_warnings(self.normalizer.min_peer_count);
        warnings.extend(impacts.coverage_warnings());
        if let Some(c) = &comparison {
            warnings.extend(c.coverage_warnings());
        }
        for warning in &warnings {
            warn!(season, "{}", warning);
        }

        info!(
            season,
            records = cleaned.records.len(),
            excluded = cleaned.tally.total_excluded(),
            scored = impacts.scores.len(),
            "season complete"
        );

        Ok(SeasonOutcome {
            season: season.to_string(),
            tables_loaded: table.tables_loaded,
            tables_skipped: table.tables_skipped,
            cleaned,
            percentiles,
            impacts,
            comparison,
            warnings,
        })
    }
}

/// Run every configured season without market values.
pub fn score_seasons(settings: &Settings, data_dir: &Path) -> crate::Result<Vec<SeasonOutcome>> {
    let pipeline = Pipeline::from_settings(settings)?;
    let mut outcomes = Vec::with_capacity(settings.seasons.len());
    for season in &settings.seasons {
        outcomes.push(pipeline.run_season(data_dir, season, None)?);
    }
    Ok(outcomes)
}
