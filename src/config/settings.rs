//! Top-level run settings.
//!
//! Loaded once from TOML and immutable for the rest of the run. Every section
//! is optional and falls back to its defaults:
//!
//! ```toml
//! seasons = ["2024-2025"]
//!
//! [cleaner]
//! min_minutes = 450
//! position_priority = ["GK", "DF", "MF", "FW"]
//!
//! [scoring.weights.FW]
//! xg_per90 = 0.35
//! shots_per90 = 0.20
//! key_passes_per90 = 0.20
//! prog_carries_per90 = 0.25
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use crate::error::ConfigError;
use crate::pipeline::{
    CleanerConfig, ColumnDictionary, ComparatorConfig, LoaderConfig, NormalizerConfig,
    ScoringConfig,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seasons processed in order, e.g. `2024-2025`.
    pub seasons: Vec<String>,
    pub loader: LoaderConfig,
    pub cleaner: CleanerConfig,
    pub normalizer: NormalizerConfig,
    pub scoring: ScoringConfig,
    pub comparator: ComparatorConfig,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seasons: vec!["2024-2025".to_string()],
            loader: LoaderConfig::default(),
            cleaner: CleanerConfig::default(),
            normalizer: NormalizerConfig::default(),
            scoring: ScoringConfig::default(),
            comparator: ComparatorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text and validate them.
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and validate a TOML settings file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_toml(&content)
    }

    /// Settings from `path`, or the defaults when no file is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Column dictionary with the configured aliases applied.
    pub fn dictionary(&self) -> Result<ColumnDictionary, ConfigError> {
        ColumnDictionary::fbref().with_aliases(&self.loader.aliases)
    }

    /// Check every section. Weight vectors are validated by building the scorer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bad) = self
            .seasons
            .iter()
            .find(|s| s.trim().is_empty() || s.contains(['/', '\\']))
        {
            return Err(ConfigError::InvalidValue {
                field: "seasons",
                reason: format!("invalid season label '{}'", bad),
            });
        }
        if self.loader.required_tables.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "loader.required_tables",
                reason: "at least the standard table is required".to_string(),
            });
        }
        self.cleaner.validate()?;
        self.normalizer.validate()?;
        self.comparator.validate()?;
        let dictionary = self.dictionary()?;
        self.scoring.validate(&dictionary)?;
        Ok(())
    }
}
