//! Cleaner: one canonical record per player-season
//!
//! Steps, in order:
//! 1. drop aggregate rows ("Squad Total", "Opponent Total", team totals)
//! 2. coerce cells to numbers and resolve minutes (`minutes`, else `nineties * 90`)
//! 3. merge mid-season transfer rows: minutes and counts summed, rates
//!    minutes-weighted, team and position taken from the last-listed row
//! 4. normalize the position into a [`Role`]
//! 5. drop zero-minute rows and rows below the minutes threshold
//! 6. derive per-90 metrics
//!
//! Every dropped row is tallied in [`ExclusionTally`]; none is dropped silently.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::columns::{derived_name, ColumnDictionary, MetricKind, MINUTES, NINETIES, POSITION};
use super::loader::{RawRow, RawValue, SeasonTable};
use super::position::{normalize_position, validate_priority, Role, DEFAULT_POSITION_PRIORITY};
use crate::error::{ConfigError, ValidationError};

/// Cleaner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Rows with fewer minutes are dropped to reduce small-sample noise.
    pub min_minutes: f64,
    /// Role chosen when a player lists several positions, highest priority first.
    pub position_priority: Vec<Role>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            min_minutes: 450.0,
            position_priority: DEFAULT_POSITION_PRIORITY.to_vec(),
        }
    }
}

impl CleanerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_minutes.is_finite() || self.min_minutes < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "cleaner.min_minutes",
                reason: format!("must be a non-negative number, got {}", self.min_minutes),
            });
        }
        validate_priority(&self.position_priority)
    }
}

/// A cleaned player-season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSeasonRecord {
    pub player: String,
    pub team: String,
    pub season: String,
    pub role: Role,
    pub minutes: f64,
    /// Derived metric name (`key_passes_per90`, `pass_completion_pct`) -> value.
    pub metrics: BTreeMap<String, f64>,
}

impl PlayerSeasonRecord {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Counts of rows the cleaner removed, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionTally {
    pub input_rows: usize,
    pub aggregate_rows: usize,
    pub missing_minutes: usize,
    pub zero_minutes: usize,
    pub unknown_position: usize,
    pub below_min_minutes: usize,
    /// Team rows folded into another row of the same player (not exclusions).
    pub transfer_rows_merged: usize,
}

impl ExclusionTally {
    pub fn record(&mut self, error: &ValidationError) {
        debug!(reason = %error, "row excluded");
        match error {
            ValidationError::MissingMinutes { .. } => self.missing_minutes += 1,
            ValidationError::ZeroMinutes { .. } => self.zero_minutes += 1,
            ValidationError::UnknownPosition { .. } => self.unknown_position += 1,
        }
    }

    pub fn total_excluded(&self) -> usize {
        self.aggregate_rows
            + self.missing_minutes
            + self.zero_minutes
            + self.unknown_position
            + self.below_min_minutes
    }
}

/// Cleaner output for one season.
#[derive(Debug, Clone)]
pub struct CleanedSeason {
    pub season: String,
    pub records: Vec<PlayerSeasonRecord>,
    pub tally: ExclusionTally,
}

/// Parse a numeric cell. Strings may carry thousands separators or padding.
pub fn coerce_number(value: Option<&RawValue>) -> Option<f64> {
    let n = match value? {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => {
            let stripped: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
            stripped.parse::<f64>().ok()?
        }
    };
    n.is_finite().then_some(n)
}

fn is_aggregate(row: &RawRow) -> bool {
    let player = row.player.to_lowercase();
    let team = row.team.to_lowercase();
    player.is_empty()
        || player.contains("squad total")
        || player.contains("opponent total")
        || team.contains("squad total")
        || team.contains("opponent total")
        || team == "total"
        || team.ends_with(" total")
}

/// A row after coercion, before transfer merging.
struct TypedRow<'a> {
    source: &'a RawRow,
    minutes: f64,
    position: Option<String>,
    counts: BTreeMap<String, f64>,
    rates: BTreeMap<String, f64>,
}

fn resolve_minutes(row: &RawRow) -> Result<f64, ValidationError> {
    if let Some(minutes) = coerce_number(row.field(MINUTES)) {
        return Ok(minutes);
    }
    coerce_number(row.field(NINETIES))
        .map(|n| n * 90.0)
        .ok_or_else(|| ValidationError::MissingMinutes {
            player: row.player.clone(),
        })
}

fn type_row<'a>(
    row: &'a RawRow,
    dictionary: &ColumnDictionary,
) -> Result<TypedRow<'a>, ValidationError> {
    let minutes = resolve_minutes(row)?;
    let position = match row.field(POSITION) {
        Some(RawValue::Text(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    };

    let mut counts = BTreeMap::new();
    let mut rates = BTreeMap::new();
    for (name, kind) in dictionary.metrics() {
        let Some(value) = coerce_number(row.field(name)) else {
            continue;
        };
        match kind {
            MetricKind::Count => counts.insert(name.to_string(), value),
            MetricKind::Rate => rates.insert(name.to_string(), value),
        };
    }

    Ok(TypedRow {
        source: row,
        minutes,
        position,
        counts,
        rates,
    })
}

/// Merged totals for one player across team rows.
struct MergedPlayer {
    player: String,
    team: String,
    position: Option<String>,
    minutes: f64,
    /// Summed count and the minutes of the rows that reported it.
    counts: BTreeMap<String, (f64, f64)>,
    rates: BTreeMap<String, f64>,
}

/// Fold a player's team rows (in source order) into one record.
///
/// The last-listed row is treated as the most recent team.
fn merge_transfers(rows: &[TypedRow<'_>]) -> MergedPlayer {
    let last = &rows[rows.len() - 1];
    let minutes: f64 = rows.iter().map(|r| r.minutes).sum();

    let mut counts: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for row in rows {
        for (name, value) in &row.counts {
            let acc = counts.entry(name.clone()).or_insert((0.0, 0.0));
            acc.0 += value;
            acc.1 += row.minutes;
        }
    }

    // Minutes-weighted mean; plain mean if every contributing row has zero minutes.
    let mut rate_sums: BTreeMap<String, (f64, f64, f64, usize)> = BTreeMap::new();
    for row in rows {
        for (name, value) in &row.rates {
            let acc = rate_sums.entry(name.clone()).or_insert((0.0, 0.0, 0.0, 0));
            acc.0 += value * row.minutes;
            acc.1 += row.minutes;
            acc.2 += value;
            acc.3 += 1;
        }
    }
    let rates = rate_sums
        .into_iter()
        .map(|(name, (weighted, weight, plain, n))| {
            let value = if weight > 0.0 {
                weighted / weight
            } else {
                plain / n as f64
            };
            (name, value)
        })
        .collect();

    MergedPlayer {
        player: last.source.player.clone(),
        team: last.source.team.clone(),
        position: rows.iter().rev().find_map(|r| r.position.clone()),
        minutes,
        counts,
        rates,
    }
}

/// Clean one season's merged table into canonical records.
pub fn clean_season(
    table: &SeasonTable,
    config: &CleanerConfig,
    dictionary: &ColumnDictionary,
) -> CleanedSeason {
    let mut tally = ExclusionTally {
        input_rows: table.rows.len(),
        ..Default::default()
    };

    // Group typed rows by player, preserving first-appearance order.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<TypedRow<'_>>> = HashMap::new();

    for row in &table.rows {
        if is_aggregate(row) {
            tally.aggregate_rows += 1;
            debug!(player = %row.player, team = %row.team, "aggregate row dropped");
            continue;
        }
        match type_row(row, dictionary) {
            Ok(typed) => {
                let group = groups.entry(row.player.clone()).or_insert_with(|| {
                    order.push(row.player.clone());
                    Vec::new()
                });
                group.push(typed);
            }
            Err(e) => tally.record(&e),
        }
    }

    let mut records = Vec::with_capacity(order.len());
    for player in &order {
        let rows = &groups[player];
        tally.transfer_rows_merged += rows.len() - 1;
        let merged = merge_transfers(rows);

        if merged.minutes <= 0.0 {
            tally.record(&ValidationError::ZeroMinutes {
                player: merged.player,
            });
            continue;
        }

        let label = merged.position.clone().unwrap_or_default();
        let Some(role) = normalize_position(&label, &config.position_priority) else {
            tally.record(&ValidationError::UnknownPosition {
                player: merged.player,
                label,
            });
            continue;
        };

        if merged.minutes < config.min_minutes {
            tally.below_min_minutes += 1;
            debug!(
                player = %merged.player,
                minutes = merged.minutes,
                threshold = config.min_minutes,
                "below minutes threshold"
            );
            continue;
        }

        let mut metrics = BTreeMap::new();
        // A count missing from one team row is rated over the other rows' minutes.
        for (name, (total, minutes)) in &merged.counts {
            if *minutes > 0.0 {
                metrics.insert(derived_name(name, MetricKind::Count), total * 90.0 / minutes);
            }
        }
        for (name, value) in &merged.rates {
            metrics.insert(derived_name(name, MetricKind::Rate), *value);
        }

        records.push(PlayerSeasonRecord {
            player: merged.player,
            team: merged.team,
            season: table.season.clone(),
            role,
            minutes: merged.minutes,
            metrics,
        });
    }

    info!(
        season = %table.season,
        input = tally.input_rows,
        kept = records.len(),
        excluded = tally.total_excluded(),
        "cleaned season"
    );

    CleanedSeason {
        season: table.season.clone(),
        records,
        tally,
    }
}
