//! Error taxonomy for the scoring pipeline.
//!
//! Four families of failure, each with its own propagation policy:
//!
//! * [`DataError`] - a required input is missing or unreadable. Fatal to the run.
//! * [`ValidationError`] - a single row is unusable. The row is dropped and counted.
//! * [`ConfigError`] - configuration is invalid. Fatal before any data is read.
//! * [`CoverageWarning`] - a non-fatal coverage gap, surfaced in the run summary.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::pipeline::Role;

/// Errors raised while reading input tables.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("required table '{table}' is missing for season {season} (looked for {})", .path.display())]
    MissingTable {
        table: String,
        season: String,
        path: PathBuf,
    },

    #[error("malformed input {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: polars::prelude::PolarsError,
    },

    #[error("failed to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
}

/// Per-row problems found while cleaning. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{player}: no minutes or 90s value")]
    MissingMinutes { player: String },

    #[error("{player}: zero minutes played")]
    ZeroMinutes { player: String },

    #[error("{player}: unrecognized position '{label}'")]
    UnknownPosition { player: String, label: String },
}

/// Configuration problems. Always raised before data is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown role label '{0}' (expected one of DF, MF, FW, GK)")]
    UnknownRole(String),

    #[error("no weight vector configured for role {0}")]
    MissingRole(Role),

    #[error("role {0} has more than one weight vector")]
    DuplicateRole(Role),

    #[error("weights for role {role} sum to {sum:.6}, expected 1.0")]
    WeightSum { role: Role, sum: f64 },

    #[error("weight for {role}/{metric} must be a finite non-negative number, got {value}")]
    InvalidWeight {
        role: Role,
        metric: String,
        value: f64,
    },

    #[error("'{metric}' is not a metric the column dictionary produces (used by {context})")]
    UnknownMetric { metric: String, context: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Non-fatal coverage gaps reported at the end of a run.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoverageWarning {
    #[error("{season} {role}: only {peers} player(s), percentiles are low-confidence (minimum {minimum})")]
    LowConfidencePartition {
        season: String,
        role: Role,
        peers: usize,
        minimum: usize,
    },

    #[error("{season}: {count} scored player(s) have no market valuation")]
    UnmatchedImpact { season: String, count: usize },

    #[error("{season}: {count} valuation record(s) matched no scored player")]
    UnmatchedValuations { season: String, count: usize },

    #[error("{season}: {count} player(s) matched several valuations and were skipped")]
    AmbiguousValuations { season: String, count: usize },

    #[error("{season}: {count} player(s) had no weighted metric and were not scored")]
    Unscored { season: String, count: usize },
}

/// Top-level error for library entry points.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
