//! Role-relative percentile ranking
//!
//! Records are partitioned by role within a season, and every metric of
//! interest is ranked inside its partition only. Ties take the average rank:
//!
//! `percentile = (avg_rank - 1) / (n - 1) * 100`
//!
//! so the unique minimum scores 0, the unique maximum 100, and tied players
//! share one value. Partitions smaller than `min_peer_count` are flagged
//! low-confidence.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cleaner::{CleanedSeason, PlayerSeasonRecord};
use super::position::Role;
use crate::error::{ConfigError, CoverageWarning};

/// Normalizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Partitions with fewer players are flagged low-confidence.
    pub min_peer_count: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { min_peer_count: 5 }
    }
}

impl NormalizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_peer_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "normalizer.min_peer_count",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Size and confidence of one (season, role) partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RolePartition {
    pub role: Role,
    pub peers: usize,
    pub low_confidence: bool,
}

/// Percentiles for one player-season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileRow {
    pub player: String,
    pub team: String,
    pub role: Role,
    pub minutes: f64,
    pub low_confidence: bool,
    /// Metric name -> percentile in [0, 100]. Absent when the player lacks the metric.
    pub percentiles: BTreeMap<String, f64>,
}

/// Role-relative percentiles for one season.
#[derive(Debug, Clone)]
pub struct PercentileTable {
    pub season: String,
    /// Rows grouped by role (DF, MF, FW, GK), input order inside each role.
    pub rows: Vec<PercentileRow>,
    pub partitions: Vec<RolePartition>,
    index: HashMap<String, usize>,
}

impl PercentileTable {
    /// Percentile of `metric` for `player`, if both are present.
    pub fn percentile(&self, player: &str, metric: &str) -> Option<f64> {
        self.index
            .get(player)
            .and_then(|&i| self.rows[i].percentiles.get(metric))
            .copied()
    }

    pub fn row(&self, player: &str) -> Option<&PercentileRow> {
        self.index.get(player).map(|&i| &self.rows[i])
    }

    pub fn partition(&self, role: Role) -> Option<&RolePartition> {
        self.partitions.iter().find(|p| p.role == role)
    }

    /// One warning per low-confidence partition.
    pub fn coverage_warnings(&self, min_peer_count: usize) -> Vec<CoverageWarning> {
        self.partitions
            .iter()
            .filter(|p| p.low_confidence)
            .map(|p| CoverageWarning::LowConfidencePartition {
                season: self.season.clone(),
                role: p.role,
                peers: p.peers,
                minimum: min_peer_count,
            })
            .collect()
    }
}

/// Average-rank percentiles for a column of optional values.
///
/// Missing and non-finite values get `None` and are excluded from the peer set.
pub fn percentile_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();
    present.sort_by(|a, b| a.1.total_cmp(&b.1));

    let n = present.len();
    let mut out = vec![None; values.len()];
    if n == 0 {
        return out;
    }
    if n == 1 {
        out[present[0].0] = Some(100.0);
        return out;
    }

    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && present[end + 1].1 == present[start].1 {
            end += 1;
        }
        // 1-based ranks start+1 ..= end+1 share their mean.
        let avg_rank = (start + end) as f64 / 2.0 + 1.0;
        let pct = (avg_rank - 1.0) / (n - 1) as f64 * 100.0;
        for (idx, _) in &present[start..=end] {
            out[*idx] = Some(pct);
        }
        start = end + 1;
    }

    out
}

/// Rank every metric inside one role partition.
fn rank_partition(
    records: &[&PlayerSeasonRecord],
    metrics: &[String],
) -> Vec<BTreeMap<String, f64>> {
    let columns: Vec<(&String, Vec<Option<f64>>)> = metrics
        .par_iter()
        .map(|metric| {
            let values: Vec<Option<f64>> = records.iter().map(|r| r.metric(metric)).collect();
            (metric, percentile_ranks(&values))
        })
        .collect();

    let mut rows = vec![BTreeMap::new(); records.len()];
    for (metric, ranks) in columns {
        for (row, rank) in rows.iter_mut().zip(ranks) {
            if let Some(pct) = rank {
                row.insert(metric.clone(), pct);
            }
        }
    }
    rows
}

/// Compute role-relative percentiles for one cleaned season.
pub fn normalize_season(
    cleaned: &CleanedSeason,
    metrics: &[String],
    config: &NormalizerConfig,
) -> PercentileTable {
    let mut rows = Vec::with_capacity(cleaned.records.len());
    let mut partitions = Vec::new();

    for role in Role::ALL {
        let members: Vec<&PlayerSeasonRecord> = cleaned
            .records
            .iter()
            .filter(|r| r.role == role)
            .collect();
        if members.is_empty() {
            continue;
        }

        let low_confidence = members.len() < config.min_peer_count;
        if low_confidence {
            warn!(
                season = %cleaned.season,
                role = %role,
                peers = members.len(),
                minimum = config.min_peer_count,
                "low-confidence partition"
            );
        }
        partitions.push(RolePartition {
            role,
            peers: members.len(),
            low_confidence,
        });

        let ranked = rank_partition(&members, metrics);
        for (record, percentiles) in members.into_iter().zip(ranked) {
            rows.push(PercentileRow {
                player: record.player.clone(),
                team: record.team.clone(),
                role,
                minutes: record.minutes,
                low_confidence,
                percentiles,
            });
        }
    }

    let index = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (r.player.clone(), i))
        .collect();

    PercentileTable {
        season: cleaned.season.clone(),
        rows,
        partitions,
        index,
    }
}
