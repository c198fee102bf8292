//! Value efficiency: impact per unit of normalized market value
//!
//! Joins a season's impact scores with valuations on player identity, then
//! ranks players within each role by `adjusted_impact / normalized_value`.
//!
//! Identity resolution, in order:
//! 1. exact normalized name; several candidates are split by team, then by
//!    the latest snapshot date
//! 2. with `fuzzy_matching`, the most similar valuation name (token-sorted
//!    Levenshtein, 0-100) at or above `min_similarity`
//!
//! Every fuzzy match and every player left unmatched is listed in the audit.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::position::Role;
use super::scorer::{ImpactScore, ImpactTable};
use super::valuation::{normalize_identity, parse_date, MarketValueRecord, MarketValues};
use crate::error::{ConfigError, CoverageWarning};

/// How market values are mapped before dividing impact by them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueNormalization {
    /// `ln(1 + value_eur)`.
    #[default]
    #[serde(rename = "log")]
    Log,
    /// Linear map of the joined values onto [1, 100].
    #[serde(rename = "minmax")]
    MinMax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    pub normalization: ValueNormalization,
    /// Top N per role kept in the output; 0 keeps everyone.
    pub shortlist_size: usize,
    /// Fall back to name similarity when no valuation has the exact name.
    pub fuzzy_matching: bool,
    /// Lowest similarity (0-100) the fallback accepts.
    pub min_similarity: f64,
    /// Snapshot cut-off, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<String>,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            normalization: ValueNormalization::Log,
            shortlist_size: 20,
            fuzzy_matching: true,
            min_similarity: 92.0,
            as_of: None,
        }
    }
}

impl ComparatorConfig {
    /// Validate and return the parsed as-of date.
    pub fn validate(&self) -> Result<Option<NaiveDate>, ConfigError> {
        if !(self.min_similarity > 0.0 && self.min_similarity <= 100.0) {
            return Err(ConfigError::InvalidValue {
                field: "comparator.min_similarity",
                reason: format!("must be in (0, 100], got {}", self.min_similarity),
            });
        }
        match &self.as_of {
            None => Ok(None),
            Some(raw) => parse_date(raw).map(Some).ok_or_else(|| ConfigError::InvalidValue {
                field: "comparator.as_of",
                reason: format!("expected YYYY-MM-DD, got '{}'", raw),
            }),
        }
    }
}

/// One ranked row of the value-efficiency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueEfficiencyEntry {
    pub rank: usize,
    pub player: String,
    pub team: String,
    pub role: Role,
    pub adjusted_impact: f64,
    pub market_value_eur: f64,
    pub normalized_value: f64,
    pub efficiency: f64,
}

/// Join statistics for one season.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinCoverage {
    pub matched: usize,
    /// Scored players with no valuation.
    pub impact_only: usize,
    /// Valuations no scored player claimed.
    pub valuation_only: usize,
    /// Players whose name matched several valuations that neither team nor date could split.
    pub ambiguous: usize,
    /// Matches found by the similarity fallback (included in `matched`).
    pub fuzzy_matched: usize,
    /// Matches decided by the latest snapshot date (included in `matched`).
    pub resolved_by_date: usize,
    /// Valuation rows dropped for an unusable value.
    pub invalid_values: usize,
}

/// Why a player appears in the match audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    FuzzyMatched,
    /// Best candidate scored below `min_similarity`.
    UnmatchedLowScore,
    Unmatched,
    Ambiguous,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::FuzzyMatched => "fuzzy_matched",
            MatchStatus::UnmatchedLowScore => "unmatched_low_score",
            MatchStatus::Unmatched => "unmatched",
            MatchStatus::Ambiguous => "ambiguous",
        }
    }
}

/// A scored player that was not joined on an exact name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchAuditEntry {
    pub player: String,
    pub team: String,
    pub status: MatchStatus,
    /// Closest valuation name, when one was considered.
    pub candidate: Option<String>,
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ValueComparison {
    pub season: String,
    /// Sorted by role, then rank.
    pub entries: Vec<ValueEfficiencyEntry>,
    pub coverage: JoinCoverage,
    pub unmatched_players: Vec<String>,
    /// In impact-table order.
    pub audit: Vec<MatchAuditEntry>,
}

impl ValueComparison {
    pub fn coverage_warnings(&self) -> Vec<CoverageWarning> {
        let season = || self.season.clone();
        let mut warnings = Vec::new();
        if self.coverage.impact_only > 0 {
            warnings.push(CoverageWarning::UnmatchedImpact {
                season: season(),
                count: self.coverage.impact_only,
            });
        }
        if self.coverage.valuation_only > 0 {
            warnings.push(CoverageWarning::UnmatchedValuations {
                season: season(),
                count: self.coverage.valuation_only,
            });
        }
        if self.coverage.ambiguous > 0 {
            warnings.push(CoverageWarning::AmbiguousValuations {
                season: season(),
                count: self.coverage.ambiguous,
            });
        }
        warnings
    }
}

type Candidates<'a> = [(usize, &'a MarketValueRecord)];

enum Match<'a> {
    Found {
        record: &'a MarketValueRecord,
        /// Valuation rows accounted for by this player.
        claimed: Vec<usize>,
        by_date: bool,
    },
    Missing,
    Ambiguous,
}

/// Order used by the efficiency ranking: higher first, NaN last.
fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Pick one valuation among records sharing a normalized name.
fn pick<'a>(team: &str, candidates: &Candidates<'a>) -> Match<'a> {
    if let [(idx, record)] = candidates {
        return Match::Found {
            record: *record,
            claimed: vec![*idx],
            by_date: false,
        };
    }

    let same_team: Vec<(usize, &MarketValueRecord)> = candidates
        .iter()
        .filter(|(_, r)| r.team.as_deref().map(normalize_identity).as_deref() == Some(team))
        .copied()
        .collect();
    if let [(idx, record)] = same_team.as_slice() {
        return Match::Found {
            record: *record,
            claimed: vec![*idx],
            by_date: false,
        };
    }

    let pool = if same_team.is_empty() {
        candidates
    } else {
        same_team.as_slice()
    };
    latest(pool)
}

/// The single most recent record of `pool`. Undated records or a tie on the
/// newest date leave the player ambiguous.
fn latest<'a>(pool: &Candidates<'a>) -> Match<'a> {
    let Some(dates) = pool
        .iter()
        .map(|(_, r)| r.snapshot_date)
        .collect::<Option<Vec<NaiveDate>>>()
    else {
        return Match::Ambiguous;
    };
    let Some(newest) = dates.iter().max() else {
        return Match::Ambiguous;
    };

    let mut at_newest = pool.iter().filter(|(_, r)| r.snapshot_date == Some(*newest));
    match (at_newest.next(), at_newest.next()) {
        (Some((_, record)), None) => Match::Found {
            record: *record,
            claimed: pool.iter().map(|(idx, _)| *idx).collect(),
            by_date: true,
        },
        _ => Match::Ambiguous,
    }
}

fn token_sort(name: &str) -> String {
    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity of two player names on a 0-100 scale.
///
/// Names are accent-folded and their tokens sorted, so "Son Heung-min" and
/// "Heung-min Son" score 100.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = token_sort(&normalize_identity(a));
    let b = token_sort(&normalize_identity(b));
    strsim::normalized_levenshtein(&a, &b) * 100.0
}

/// Most similar choice to `query`; the first in key order wins a tie.
fn closest<'k>(query: &str, choices: &[(&'k str, String)]) -> Option<(&'k str, f64)> {
    let query = token_sort(query);
    let mut best: Option<(&'k str, f64)> = None;
    for (key, sorted) in choices {
        let similarity = strsim::normalized_levenshtein(&query, sorted) * 100.0;
        if best.map_or(true, |(_, b)| similarity > b) {
            best = Some((*key, similarity));
        }
    }
    best
}

/// Normalized value for every joined valuation, in input order.
fn normalize_values(values: &[f64], method: ValueNormalization) -> Vec<f64> {
    match method {
        ValueNormalization::Log => values.iter().map(|v| v.ln_1p()).collect(),
        ValueNormalization::MinMax => {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let span = max - min;
            values
                .iter()
                .map(|v| {
                    if span > 0.0 {
                        1.0 + 99.0 * (v - min) / span
                    } else {
                        1.0
                    }
                })
                .collect()
        }
    }
}

/// Join impacts with valuations and rank by efficiency within each role.
pub fn compare_values(
    impacts: &ImpactTable,
    values: &MarketValues,
    config: &ComparatorConfig,
) -> ValueComparison {
    let mut by_name: BTreeMap<String, Vec<(usize, &MarketValueRecord)>> = BTreeMap::new();
    for (idx, record) in values.records.iter().enumerate() {
        by_name
            .entry(normalize_identity(&record.player))
            .or_default()
            .push((idx, record));
    }
    let choices: Vec<(&str, String)> = by_name
        .keys()
        .map(|k| (k.as_str(), token_sort(k)))
        .collect();

    let mut coverage = JoinCoverage {
        invalid_values: values.invalid,
        ..Default::default()
    };
    let mut unmatched_players = Vec::new();
    let mut audit = Vec::new();
    let mut claimed = BTreeSet::new();
    let mut joined: Vec<(&ImpactScore, &MarketValueRecord)> = Vec::new();

    for score in &impacts.scores {
        let key = normalize_identity(&score.player);
        let team = normalize_identity(&score.team);
        let audit_entry = |status, candidate: Option<&str>, similarity| MatchAuditEntry {
            player: score.player.clone(),
            team: score.team.clone(),
            status,
            candidate: candidate.map(str::to_string),
            similarity,
        };

        let (found, fuzzy) = match by_name.get(&key) {
            Some(candidates) => (pick(&team, candidates), None),
            None if config.fuzzy_matching => match closest(&key, &choices) {
                Some((name, similarity)) if similarity >= config.min_similarity => {
                    (pick(&team, &by_name[name]), Some(similarity))
                }
                Some((name, similarity)) => {
                    audit.push(audit_entry(
                        MatchStatus::UnmatchedLowScore,
                        Some(name),
                        Some(similarity),
                    ));
                    (Match::Missing, None)
                }
                None => {
                    audit.push(audit_entry(MatchStatus::Unmatched, None, None));
                    (Match::Missing, None)
                }
            },
            None => {
                audit.push(audit_entry(MatchStatus::Unmatched, None, None));
                (Match::Missing, None)
            }
        };

        match found {
            Match::Found {
                record,
                claimed: rows,
                by_date,
            } => {
                if let Some(similarity) = fuzzy {
                    coverage.fuzzy_matched += 1;
                    audit.push(audit_entry(
                        MatchStatus::FuzzyMatched,
                        Some(record.player.as_str()),
                        Some(similarity),
                    ));
                }
                if by_date {
                    coverage.resolved_by_date += 1;
                }
                claimed.extend(rows);
                joined.push((score, record));
            }
            Match::Missing => {
                coverage.impact_only += 1;
                unmatched_players.push(score.player.clone());
            }
            Match::Ambiguous => {
                coverage.ambiguous += 1;
                audit.push(audit_entry(MatchStatus::Ambiguous, None, None));
                unmatched_players.push(score.player.clone());
            }
        }
    }
    coverage.matched = joined.len();
    coverage.valuation_only = values.records.len() - claimed.len();

    let raw_values: Vec<f64> = joined.iter().map(|(_, r)| r.value_eur).collect();
    let normalized = normalize_values(&raw_values, config.normalization);

    let mut entries = Vec::with_capacity(joined.len());
    for role in Role::ALL {
        let mut ranked: Vec<ValueEfficiencyEntry> = joined
            .iter()
            .zip(&normalized)
            .filter(|((score, _), _)| score.role == role)
            .map(|((score, record), &norm)| ValueEfficiencyEntry {
                rank: 0,
                player: score.player.clone(),
                team: score.team.clone(),
                role,
                adjusted_impact: score.adjusted,
                market_value_eur: record.value_eur,
                normalized_value: norm,
                efficiency: if norm > 0.0 { score.adjusted / norm } else { 0.0 },
            })
            .collect();

        ranked.sort_by(|a, b| {
            descending(a.efficiency, b.efficiency)
                .then_with(|| a.player.cmp(&b.player))
                .then_with(|| a.team.cmp(&b.team))
        });
        if config.shortlist_size > 0 {
            ranked.truncate(config.shortlist_size);
        }
        for (i, entry) in ranked.iter_mut().enumerate() {
            entry.rank = i + 1;
        }
        entries.extend(ranked);
    }

    if coverage.impact_only > 0 || coverage.ambiguous > 0 {
        warn!(
            season = %impacts.season,
            impact_only = coverage.impact_only,
            ambiguous = coverage.ambiguous,
            "scored players without a usable valuation"
        );
    }
    info!(
        season = %impacts.season,
        matched = coverage.matched,
        fuzzy_matched = coverage.fuzzy_matched,
        valuation_only = coverage.valuation_only,
        "value comparison complete"
    );

    ValueComparison {
        season: impacts.season.clone(),
        entries,
        coverage,
        unmatched_players,
        audit,
    }
}
