//! Table loader for the per-season FBref CSV/Parquet files
//!
//! Reads every source table of a season, renames columns through the
//! [`ColumnDictionary`], and merges the tables with an outer join on
//! (player, team). Cells are kept as [`RawValue`]s; type coercion belongs to
//! the cleaner.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::columns::{normalize_header, ColumnAlias, ColumnDictionary, SourceTable, PLAYER, TEAM};
use crate::error::DataError;

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Tables that must exist for every requested season.
    pub required_tables: Vec<SourceTable>,
    /// Rows used for CSV schema inference. 0 means a full scan.
    pub infer_schema_length: usize,
    /// Extra header mappings on top of the FBref dictionary.
    pub aliases: Vec<ColumnAlias>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            required_tables: SourceTable::ALL.to_vec(),
            infer_schema_length: 10000,
            aliases: Vec::new(),
        }
    }
}

/// A cell as read from the source file, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

/// One merged source row for a (player, team) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub player: String,
    pub team: String,
    /// Canonical column name -> first non-missing value seen across tables.
    pub fields: BTreeMap<String, RawValue>,
}

impl RawRow {
    pub fn field(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }
}

/// Unified table for one season.
#[derive(Debug, Clone, Default)]
pub struct SeasonTable {
    pub season: String,
    /// Rows in merge order: base-table order first, then rows new to later tables.
    pub rows: Vec<RawRow>,
    pub tables_loaded: Vec<SourceTable>,
    pub tables_skipped: Vec<SourceTable>,
}

/// Collapse internal whitespace and trim, keeping case and accents.
pub fn clean_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Locate the file for a table and season, preferring CSV over Parquet.
pub fn find_table_file(data_dir: &Path, table: SourceTable, season: &str) -> Option<PathBuf> {
    let stem = table.file_stem(season);
    ["csv", "parquet"]
        .iter()
        .map(|ext| data_dir.join(format!("{}.{}", stem, ext)))
        .find(|p| p.is_file())
}

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame, DataError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let read_err = |source| DataError::Read {
        path: path.to_path_buf(),
        source,
    };

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()
            .map_err(read_err)?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default()).map_err(read_err)?,
        _ => {
            return Err(DataError::Malformed {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported file format '{}'. Supported formats: csv, parquet",
                    extension
                ),
            })
        }
    };

    lf.collect().map_err(read_err)
}

/// Extract a column as raw cells. Numeric columns keep their numbers; every
/// other type is read as text. Nulls and blank strings become `None`.
fn column_values(column: &Column) -> PolarsResult<Vec<Option<RawValue>>> {
    if column.dtype().is_primitive_numeric() {
        let cast = column.cast(&DataType::Float64)?;
        Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()).map(RawValue::Number))
            .collect())
    } else {
        let cast = column.cast(&DataType::String)?;
        Ok(cast
            .str()?
            .into_iter()
            .map(|v| match v {
                Some(s) if !s.trim().is_empty() => Some(RawValue::Text(s.to_string())),
                _ => None,
            })
            .collect())
    }
}

fn text_of(value: &Option<RawValue>) -> String {
    match value {
        Some(RawValue::Text(s)) => clean_name(s),
        Some(RawValue::Number(n)) => n.to_string(),
        None => String::new(),
    }
}

/// Convert one source DataFrame into dictionary-mapped rows.
pub fn frame_to_rows(
    df: &DataFrame,
    table: SourceTable,
    dictionary: &ColumnDictionary,
    path: &Path,
) -> Result<Vec<RawRow>, DataError> {
    let malformed = |reason: String| DataError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    // Canonical name -> cells. The first source column mapping to a name wins.
    let mut mapped: Vec<(String, Vec<Option<RawValue>>)> = Vec::new();
    for column in df.get_columns() {
        let header = normalize_header(column.name().as_str());
        let Some(canonical) = dictionary.canonical(table, &header) else {
            continue;
        };
        if mapped.iter().any(|(name, _)| name == canonical) {
            continue;
        }
        let values = column_values(column)
            .map_err(|e| malformed(format!("column '{}': {}", column.name(), e)))?;
        mapped.push((canonical.to_string(), values));
    }

    let player_idx = mapped
        .iter()
        .position(|(name, _)| name == PLAYER)
        .ok_or_else(|| malformed(format!("no player column in {} table", table)))?;
    let team_idx = mapped.iter().position(|(name, _)| name == TEAM);

    let rows = (0..df.height())
        .map(|i| {
            let mut row = RawRow {
                player: text_of(&mapped[player_idx].1[i]),
                team: team_idx
                    .map(|t| text_of(&mapped[t].1[i]))
                    .unwrap_or_default(),
                fields: BTreeMap::new(),
            };
            for (j, (name, values)) in mapped.iter().enumerate() {
                if j == player_idx || Some(j) == team_idx {
                    continue;
                }
                if let Some(value) = &values[i] {
                    row.fields.insert(name.clone(), value.clone());
                }
            }
            row
        })
        .collect();

    Ok(rows)
}

/// Outer-join `incoming` into `rows` on (player, team).
///
/// Existing cells are never overwritten; the incoming table only fills gaps.
/// Duplicate keys inside `incoming` keep their first occurrence.
fn merge_rows(
    rows: &mut Vec<RawRow>,
    index: &mut HashMap<(String, String), usize>,
    incoming: Vec<RawRow>,
) {
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for row in incoming {
        let key = (row.player.clone(), row.team.clone());
        if !seen.insert(key.clone()) {
            continue;
        }
        match index.get(&key) {
            Some(&pos) => {
                let target = &mut rows[pos];
                for (name, value) in row.fields {
                    target.fields.entry(name).or_insert(value);
                }
            }
            None => {
                index.insert(key, rows.len());
                rows.push(row);
            }
        }
    }
}

/// Load and merge every source table of one season.
pub fn load_season(
    data_dir: &Path,
    season: &str,
    config: &LoaderConfig,
    dictionary: &ColumnDictionary,
) -> Result<SeasonTable, DataError> {
    let mut table = SeasonTable {
        season: season.to_string(),
        ..Default::default()
    };
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for source in SourceTable::ALL {
        let Some(path) = find_table_file(data_dir, source, season) else {
            if config.required_tables.contains(&source) {
                return Err(DataError::MissingTable {
                    table: source.to_string(),
                    season: season.to_string(),
                    path: data_dir.join(format!("{}.csv", source.file_stem(season))),
                });
            }
            warn!(table = %source, season, "optional table not found, skipping");
            table.tables_skipped.push(source);
            continue;
        };

        let df = load_dataset(&path, config.infer_schema_length)?;
        let (rows, cols) = df.shape();
        info!(table = %source, season, rows, cols, path = %path.display(), "loaded table");

        let source_rows = frame_to_rows(&df, source, dictionary, &path)?;
        let before = table.rows.len();
        merge_rows(&mut table.rows, &mut index, source_rows);
        debug!(
            table = %source,
            new_rows = table.rows.len() - before,
            "merged table"
        );

        table.tables_loaded.push(source);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(player: &str, team: &str, fields: &[(&str, f64)]) -> RawRow {
        RawRow {
            player: player.to_string(),
            team: team.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), RawValue::Number(*v)))
                .collect(),
        }
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  Bukayo   Saka "), "Bukayo Saka");
    }

    #[test]
    fn test_merge_fills_gaps_without_overwriting() {
        let mut rows = Vec::new();
        let mut index = HashMap::new();
        merge_rows(
            &mut rows,
            &mut index,
            vec![row("A", "X", &[("minutes", 900.0)])],
        );
        merge_rows(
            &mut rows,
            &mut index,
            vec![row("A", "X", &[("minutes", 1.0), ("key_passes", 12.0)])],
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field("minutes"), Some(&RawValue::Number(900.0)));
        assert_eq!(rows[0].field("key_passes"), Some(&RawValue::Number(12.0)));
    }

    #[test]
    fn test_merge_is_outer_join() {
        let mut rows = Vec::new();
        let mut index = HashMap::new();
        merge_rows(&mut rows, &mut index, vec![row("A", "X", &[])]);
        merge_rows(
            &mut rows,
            &mut index,
            vec![row("B", "Y", &[]), row("A", "X", &[])],
        );

        let players: Vec<&str> = rows.iter().map(|r| r.player.as_str()).collect();
        assert_eq!(players, vec!["A", "B"]);
    }

    #[test]
    fn test_duplicate_keys_keep_first() {
        let mut rows = Vec::new();
        let mut index = HashMap::new();
        merge_rows(
            &mut rows,
            &mut index,
            vec![
                row("A", "X", &[("goals", 3.0)]),
                row("A", "X", &[("goals", 99.0)]),
            ],
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field("goals"), Some(&RawValue::Number(3.0)));
    }
}
