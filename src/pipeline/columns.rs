//! Column-name dictionary for the FBref source tables
//!
//! Each source table type names the same concept differently ("Squad" vs
//! "Team", "PrgP" vs "Prog"). Headers are first normalized with
//! [`normalize_header`], then mapped to a canonical name through the
//! per-table dictionary. Columns the dictionary does not know are dropped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Canonical identity columns shared by every source table.
pub const PLAYER: &str = "player";
pub const TEAM: &str = "team";
pub const POSITION: &str = "position";
pub const MINUTES: &str = "minutes";
pub const NINETIES: &str = "nineties";

const IDENTITY_ALIASES: &[(&str, &str)] = &[
    ("player", PLAYER),
    ("squad", TEAM),
    ("team", TEAM),
    ("club", TEAM),
    ("pos", POSITION),
    ("position", POSITION),
    ("min", MINUTES),
    ("minutes", MINUTES),
    ("90s", NINETIES),
    ("nineties", NINETIES),
];

/// The five FBref player tables, in merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTable {
    Standard,
    Shooting,
    Passing,
    Possession,
    Defending,
}

impl SourceTable {
    pub const ALL: [SourceTable; 5] = [
        SourceTable::Standard,
        SourceTable::Shooting,
        SourceTable::Passing,
        SourceTable::Possession,
        SourceTable::Defending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTable::Standard => "standard",
            SourceTable::Shooting => "shooting",
            SourceTable::Passing => "passing",
            SourceTable::Possession => "possession",
            SourceTable::Defending => "defending",
        }
    }

    /// File stem written by the scraper, e.g. `fbref_passing_2024-2025`.
    pub fn file_stem(&self, season: &str) -> String {
        format!("fbref_{}_{}", self.as_str(), season)
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a metric behaves when rows are merged and scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Counting stat: summed across team rows, then scaled to per-90.
    Count,
    /// Already a ratio: minutes-weighted mean across team rows, not scaled.
    Rate,
}

/// Name of the metric after the cleaner has derived it.
pub fn derived_name(canonical: &str, kind: MetricKind) -> String {
    match kind {
        MetricKind::Count => format!("{}_per90", canonical),
        MetricKind::Rate => canonical.to_string(),
    }
}

/// A user-supplied extra mapping from a source header to a known canonical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAlias {
    pub table: SourceTable,
    pub source: String,
    pub canonical: String,
}

/// Per-table mapping from normalized source headers to canonical names.
#[derive(Debug, Clone)]
pub struct ColumnDictionary {
    tables: BTreeMap<SourceTable, BTreeMap<String, String>>,
    kinds: BTreeMap<String, MetricKind>,
}

impl ColumnDictionary {
    /// The dictionary for FBref's "big five" player tables.
    pub fn fbref() -> Self {
        use MetricKind::{Count, Rate};

        let metric_entries: &[(SourceTable, &str, &str, MetricKind)] = &[
            (SourceTable::Standard, "gls", "goals", Count),
            (SourceTable::Standard, "ast", "assists", Count),
            (SourceTable::Standard, "xg", "xg", Count),
            (SourceTable::Standard, "xag", "xa", Count),
            (SourceTable::Standard, "xa", "xa", Count),
            (SourceTable::Shooting, "sh", "shots", Count),
            (SourceTable::Shooting, "sot", "shots_on_target", Count),
            (SourceTable::Shooting, "xg", "xg", Count),
            (SourceTable::Passing, "cmp", "passes_completed", Count),
            (SourceTable::Passing, "att", "passes_attempted", Count),
            (SourceTable::Passing, "cmp_pct", "pass_completion_pct", Rate),
            (SourceTable::Passing, "kp", "key_passes", Count),
            (SourceTable::Passing, "prgp", "prog_passes", Count),
            (SourceTable::Possession, "prgc", "prog_carries", Count),
            (SourceTable::Possession, "succ", "take_ons_won", Count),
            (SourceTable::Possession, "touches_att_3rd", "touches_att_3rd", Count),
            (SourceTable::Possession, "att_3rd", "touches_att_3rd", Count),
            (SourceTable::Defending, "tkl", "tackles", Count),
            (SourceTable::Defending, "tklw", "tackles_won", Count),
            (SourceTable::Defending, "tkl_w", "tackles_won", Count),
            (SourceTable::Defending, "int", "interceptions", Count),
            (SourceTable::Defending, "blocks", "blocks", Count),
            (SourceTable::Defending, "clr", "clearances", Count),
        ];

        let mut tables: BTreeMap<SourceTable, BTreeMap<String, String>> = BTreeMap::new();
        for table in SourceTable::ALL {
            let entry = tables.entry(table).or_default();
            for (source, canonical) in IDENTITY_ALIASES {
                entry.insert(source.to_string(), canonical.to_string());
            }
        }

        let mut kinds = BTreeMap::new();
        for (table, source, canonical, kind) in metric_entries {
            tables
                .entry(*table)
                .or_default()
                .insert(source.to_string(), canonical.to_string());
            kinds.insert(canonical.to_string(), *kind);
        }

        Self { tables, kinds }
    }

    /// Extend the dictionary with configured aliases.
    ///
    /// An alias may only point at a canonical column that already exists, so
    /// every metric keeps a known [`MetricKind`].
    pub fn with_aliases(mut self, aliases: &[ColumnAlias]) -> Result<Self, ConfigError> {
        for alias in aliases {
            let known_identity = IDENTITY_ALIASES.iter().any(|(_, c)| *c == alias.canonical);
            if !known_identity && !self.kinds.contains_key(&alias.canonical) {
                return Err(ConfigError::InvalidValue {
                    field: "loader.aliases",
                    reason: format!(
                        "alias '{}' points at unknown canonical column '{}'",
                        alias.source, alias.canonical
                    ),
                });
            }
            self.tables
                .entry(alias.table)
                .or_default()
                .insert(normalize_header(&alias.source), alias.canonical.clone());
        }
        Ok(self)
    }

    /// Canonical name for a normalized header of the given table.
    pub fn canonical(&self, table: SourceTable, header: &str) -> Option<&str> {
        self.tables
            .get(&table)
            .and_then(|m| m.get(header))
            .map(String::as_str)
    }

    pub fn metric_kind(&self, canonical: &str) -> Option<MetricKind> {
        self.kinds.get(canonical).copied()
    }

    /// Canonical metric names with their kinds, in name order.
    pub fn metrics(&self) -> impl Iterator<Item = (&str, MetricKind)> {
        self.kinds.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Every metric name the cleaner can produce (`goals_per90`, `pass_completion_pct`, ...).
    pub fn derived_metric_names(&self) -> Vec<String> {
        self.metrics()
            .map(|(name, kind)| derived_name(name, kind))
            .collect()
    }

    pub fn produces(&self, derived: &str) -> bool {
        self.metrics()
            .any(|(name, kind)| derived_name(name, kind) == derived)
    }
}

impl Default for ColumnDictionary {
    fn default() -> Self {
        Self::fbref()
    }
}

/// Normalize a raw header: lowercase, `%` becomes `_pct`, runs of other
/// non-alphanumeric characters become a single `_`.
///
/// `"Cmp%"` -> `"cmp_pct"`, `"Tkl+Int"` -> `"tkl_int"`, `"90s"` -> `"90s"`.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut pending_sep = false;

    for c in raw.trim().chars() {
        if c == '%' {
            out.push_str("_pct");
            pending_sep = false;
        } else if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }

    out.trim_matches('_').to_string()
}
