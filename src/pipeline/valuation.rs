//! Market valuation records
//!
//! Loads a valuation snapshot, keeps the latest record per identity as of a
//! cut-off date, and applies optional manual overrides. Identities are
//! matched on accent-folded, lowercased names.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::loader::{clean_name, load_dataset};
use crate::error::DataError;

const PLAYER_ALIASES: &[&str] = &["player", "name", "tm_name", "player_name"];
const TEAM_ALIASES: &[&str] = &["team", "club", "squad", "current_club_name"];
const VALUE_ALIASES: &[&str] = &["market_value_eur", "market_value_in_eur", "value", "value_eur"];
const DATE_ALIASES: &[&str] = &["date", "snapshot_date", "value_date"];

/// One player's valuation at a snapshot date.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketValueRecord {
    pub player: String,
    pub team: Option<String>,
    pub value_eur: f64,
    pub snapshot_date: Option<NaiveDate>,
}

/// A loaded valuation snapshot.
#[derive(Debug, Clone, Default)]
pub struct MarketValues {
    pub records: Vec<MarketValueRecord>,
    /// Rows dropped for a missing, non-numeric or non-positive value.
    pub invalid: usize,
    /// Older records replaced by a later one for the same identity.
    pub superseded: usize,
    /// Records dated after the as-of cut-off.
    pub after_cutoff: usize,
    /// Records replaced by a manual override.
    pub overridden: usize,
}

/// Identity key used for joining: accents stripped, lowercase, only
/// `[a-z0-9 -.']` kept, whitespace collapsed.
pub fn normalize_identity(name: &str) -> String {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '.' | '\''))
        .collect();
    clean_name(&folded)
}

/// Parse `YYYY-MM-DD`, ignoring any time suffix.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn find_column<'a>(df: &'a DataFrame, aliases: &[&str]) -> Option<&'a Column> {
    df.get_columns().iter().find(|c| {
        let name = c.name().as_str().trim().to_lowercase();
        aliases.contains(&name.as_str())
    })
}

fn string_cells(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    let cast = column.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
        .collect())
}

fn numeric_cells(column: &Column) -> PolarsResult<Vec<Option<f64>>> {
    if column.dtype().is_primitive_numeric() {
        let cast = column.cast(&DataType::Float64)?;
        Ok(cast.f64()?.into_iter().collect())
    } else {
        Ok(string_cells(column)?
            .into_iter()
            .map(|v| {
                v.and_then(|s| {
                    s.chars()
                        .filter(|c| *c != ',' && !c.is_whitespace())
                        .collect::<String>()
                        .parse::<f64>()
                        .ok()
                })
            })
            .collect())
    }
}

/// Load a valuation file and reduce it to one record per identity.
///
/// With `as_of`, records dated after the cut-off are ignored. Among the rest
/// the latest date wins; equal dates go to the later file row.
pub fn load_market_values(path: &Path, as_of: Option<NaiveDate>) -> Result<MarketValues, DataError> {
    let df = load_dataset(path, 10000)?;
    let malformed = |reason: String| DataError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let player_col = find_column(&df, PLAYER_ALIASES)
        .ok_or_else(|| malformed("no player/name column".to_string()))?;
    let value_col = find_column(&df, VALUE_ALIASES)
        .ok_or_else(|| malformed("no market_value_eur column".to_string()))?;

    let players = string_cells(player_col).map_err(|e| malformed(e.to_string()))?;
    let values = numeric_cells(value_col).map_err(|e| malformed(e.to_string()))?;
    let teams = match find_column(&df, TEAM_ALIASES) {
        Some(c) => string_cells(c).map_err(|e| malformed(e.to_string()))?,
        None => vec![None; df.height()],
    };
    let dates: Vec<Option<NaiveDate>> = match find_column(&df, DATE_ALIASES) {
        Some(c) => string_cells(c)
            .map_err(|e| malformed(e.to_string()))?
            .into_iter()
            .map(|v| v.as_deref().and_then(parse_date))
            .collect(),
        None => vec![None; df.height()],
    };

    let mut out = MarketValues::default();
    let mut latest: HashMap<(String, String), usize> = HashMap::new();

    for i in 0..df.height() {
        let (Some(player), Some(value)) = (&players[i], values[i]) else {
            out.invalid += 1;
            continue;
        };
        if !value.is_finite() || value <= 0.0 {
            out.invalid += 1;
            continue;
        }
        let snapshot_date = dates[i];
        if let (Some(cutoff), Some(date)) = (as_of, snapshot_date) {
            if date > cutoff {
                out.after_cutoff += 1;
                continue;
            }
        }

        let record = MarketValueRecord {
            player: clean_name(player),
            team: teams[i].as_deref().map(clean_name),
            value_eur: value,
            snapshot_date,
        };
        let key = (
            normalize_identity(&record.player),
            record.team.as_deref().map(normalize_identity).unwrap_or_default(),
        );

        match latest.get(&key) {
            Some(&pos) => {
                out.superseded += 1;
                if record.snapshot_date >= out.records[pos].snapshot_date {
                    out.records[pos] = record;
                }
            }
            None => {
                latest.insert(key, out.records.len());
                out.records.push(record);
            }
        }
    }

    if out.invalid > 0 {
        warn!(path = %path.display(), count = out.invalid, "valuation rows without a usable value");
    }
    info!(
        path = %path.display(),
        records = out.records.len(),
        superseded = out.superseded,
        after_cutoff = out.after_cutoff,
        "loaded market values"
    );

    Ok(out)
}

/// Replace valuations with manual figures from a `player, team, market_value_eur` file.
///
/// An override replaces every record with the same normalized name whose team
/// matches; an override without a team, or a record without one, matches on
/// name alone. Overrides for players absent from `values` are added as new
/// records. Override rows without a usable value are added to `invalid`.
pub fn apply_manual_values(values: &MarketValues, path: &Path) -> Result<MarketValues, DataError> {
    let manual = load_market_values(path, None)?;
    let mut out = values.clone();
    out.invalid += manual.invalid;

    for entry in manual.records {
        let player_key = normalize_identity(&entry.player);
        let team_key = entry.team.as_deref().map(normalize_identity);
        let mut replaced = 0;
        for record in out.records.iter_mut() {
            let same_team = match (&team_key, &record.team) {
                (Some(t), Some(rt)) => normalize_identity(rt) == *t,
                _ => true,
            };
            if same_team && normalize_identity(&record.player) == player_key {
                record.value_eur = entry.value_eur;
                replaced += 1;
            }
        }
        if replaced == 0 {
            out.records.push(entry);
        }
        out.overridden += replaced;
    }

    info!(
        path = %path.display(),
        overridden = out.overridden,
        invalid = manual.invalid,
        "applied manual values"
    );
    Ok(out)
}
