//! Impact scoring
//!
//! Raw Impact is a weighted sum of role-relative percentiles. Adjusted Impact
//! scales it by a minutes reliability factor, and by `low_confidence_factor`
//! when the player's role partition was too small to rank reliably.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::columns::ColumnDictionary;
use super::normalizer::{PercentileRow, PercentileTable};
use super::position::Role;
use super::weights::{default_weights, validate_weights, RawWeights, RoleWeights};
use crate::error::{ConfigError, CoverageWarning};

/// Shape of the reliability ramp below the saturation point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReliabilityCurve {
    /// `minutes / saturation`, clipped to 1.
    #[default]
    Linear,
    /// `3x^2 - 2x^3` of the linear ramp; flatter near both ends.
    Smoothstep,
}

impl ReliabilityCurve {
    /// Reliability in [0, 1]. Non-decreasing in `minutes`, exactly 1.0 at or above `saturation`.
    pub fn factor(&self, minutes: f64, saturation: f64) -> f64 {
        let x = if minutes.is_finite() {
            (minutes / saturation).clamp(0.0, 1.0)
        } else {
            0.0
        };
        match self {
            ReliabilityCurve::Linear => x,
            ReliabilityCurve::Smoothstep => x * x * (3.0 - 2.0 * x),
        }
    }
}

/// Scorer settings, including the per-role weight vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minutes at which reliability reaches 1.0.
    pub saturation_minutes: f64,
    pub reliability_curve: ReliabilityCurve,
    /// Extra multiplier on Adjusted Impact for low-confidence partitions, in (0, 1].
    pub low_confidence_factor: f64,
    /// Share of Raw Impact given to the mean of non-core bonus metrics, in [0, 1).
    pub bonus_weight: f64,
    /// Candidate bonus metrics; a role's own weighted metrics are excluded from its bonus.
    pub bonus_metrics: Vec<String>,
    /// Role label -> metric -> weight. Each role must sum to 1.0.
    pub weights: RawWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            saturation_minutes: 900.0,
            reliability_curve: ReliabilityCurve::Linear,
            low_confidence_factor: 0.75,
            bonus_weight: 0.0,
            bonus_metrics: [
                "key_passes_per90",
                "prog_passes_per90",
                "shots_per90",
                "xg_per90",
                "interceptions_per90",
                "tackles_won_per90",
                "prog_carries_per90",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            weights: default_weights(),
        }
    }
}

impl ScoringConfig {
    /// Check thresholds and weight vectors, returning the validated weights.
    pub fn validate(&self, dictionary: &ColumnDictionary) -> Result<RoleWeights, ConfigError> {
        if !self.saturation_minutes.is_finite() || self.saturation_minutes <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "scoring.saturation_minutes",
                reason: format!("must be positive, got {}", self.saturation_minutes),
            });
        }
        if !(self.low_confidence_factor > 0.0 && self.low_confidence_factor <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "scoring.low_confidence_factor",
                reason: format!("must be in (0, 1], got {}", self.low_confidence_factor),
            });
        }
        if !(0.0..1.0).contains(&self.bonus_weight) {
            return Err(ConfigError::InvalidValue {
                field: "scoring.bonus_weight",
                reason: format!("must be in [0, 1), got {}", self.bonus_weight),
            });
        }
        for metric in &self.bonus_metrics {
            if !dictionary.produces(metric) {
                return Err(ConfigError::UnknownMetric {
                    metric: metric.clone(),
                    context: "scoring.bonus_metrics".to_string(),
                });
            }
        }

        validate_weights(&self.weights, dictionary)
    }
}

/// Impact scores for one player-season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactScore {
    pub player: String,
    pub team: String,
    pub season: String,
    pub role: Role,
    pub minutes: f64,
    pub reliability: f64,
    pub raw: f64,
    pub adjusted: f64,
    pub low_confidence: bool,
}

/// Scored season, sorted by role, adjusted impact (descending), player, team.
#[derive(Debug, Clone)]
pub struct ImpactTable {
    pub season: String,
    pub scores: Vec<ImpactScore>,
    /// Players with none of their role's weighted metrics.
    pub unscored: Vec<String>,
}

impl ImpactTable {
    pub fn coverage_warnings(&self) -> Vec<CoverageWarning> {
        if self.unscored.is_empty() {
            return Vec::new();
        }
        vec![CoverageWarning::Unscored {
            season: self.season.clone(),
            count: self.unscored.len(),
        }]
    }
}

/// Validated scoring model. Construction fails before any data is touched.
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: RoleWeights,
    saturation_minutes: f64,
    curve: ReliabilityCurve,
    low_confidence_factor: f64,
    bonus_weight: f64,
    bonus_metrics: Vec<String>,
}

impl Scorer {
    pub fn new(config: &ScoringConfig, dictionary: &ColumnDictionary) -> Result<Self, ConfigError> {
        let weights = config.validate(dictionary)?;

        Ok(Self {
            weights,
            saturation_minutes: config.saturation_minutes,
            curve: config.reliability_curve,
            low_confidence_factor: config.low_confidence_factor,
            bonus_weight: config.bonus_weight,
            bonus_metrics: config.bonus_metrics.clone(),
        })
    }

    pub fn weights(&self) -> &RoleWeights {
        &self.weights
    }

    /// Metrics the normalizer must rank for this model.
    pub fn metrics_of_interest(&self) -> Vec<String> {
        let mut metrics = self.weights.metrics();
        if self.bonus_weight > 0.0 {
            metrics.extend(self.bonus_metrics.iter().cloned());
        }
        metrics.into_iter().collect()
    }

    pub fn reliability(&self, minutes: f64) -> f64 {
        self.curve.factor(minutes, self.saturation_minutes)
    }

    /// Weighted sum over the role's metrics, renormalized over the metrics present.
    fn core_score(&self, row: &PercentileRow) -> Option<f64> {
        let mut total = 0.0;
        let mut weight_present = 0.0;
        for (metric, weight) in self.weights.get(row.role) {
            if let Some(pct) = row.percentiles.get(metric) {
                total += pct * weight;
                weight_present += weight;
            }
        }
        (weight_present > 0.0).then(|| total / weight_present)
    }

    fn bonus_score(&self, row: &PercentileRow) -> Option<f64> {
        let core: BTreeSet<&str> = self
            .weights
            .get(row.role)
            .iter()
            .map(|(m, _)| m.as_str())
            .collect();
        let values: Vec<f64> = self
            .bonus_metrics
            .iter()
            .filter(|m| !core.contains(m.as_str()))
            .filter_map(|m| row.percentiles.get(m).copied())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// Raw Impact for one row, or `None` when no weighted metric is present.
    pub fn raw_impact(&self, row: &PercentileRow) -> Option<f64> {
        let core = self.core_score(row)?;
        if self.bonus_weight == 0.0 {
            return Some(core);
        }
        Some(match self.bonus_score(row) {
            Some(bonus) => (1.0 - self.bonus_weight) * core + self.bonus_weight * bonus,
            None => core,
        })
    }

    /// Score every row of a percentile table.
    pub fn score_season(&self, table: &PercentileTable) -> ImpactTable {
        let mut scores = Vec::with_capacity(table.rows.len());
        let mut unscored = Vec::new();

        for row in &table.rows {
            let Some(raw) = self.raw_impact(row) else {
                unscored.push(row.player.clone());
                continue;
            };
            let reliability = self.reliability(row.minutes);
            let confidence = if row.low_confidence {
                self.low_confidence_factor
            } else {
                1.0
            };
            scores.push(ImpactScore {
                player: row.player.clone(),
                team: row.team.clone(),
                season: table.season.clone(),
                role: row.role,
                minutes: row.minutes,
                reliability,
                raw,
                adjusted: raw * reliability * confidence,
                low_confidence: row.low_confidence,
            });
        }

        scores.sort_by(|a, b| {
            a.role
                .cmp(&b.role)
                .then_with(|| b.adjusted.total_cmp(&a.adjusted))
                .then_with(|| a.player.cmp(&b.player))
                .then_with(|| a.team.cmp(&b.team))
        });

        info!(
            season = %table.season,
            scored = scores.len(),
            unscored = unscored.len(),
            "scored season"
        );

        ImpactTable {
            season: table.season.clone(),
            scores,
            unscored,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn scorer() -> Scorer {
        Scorer::new(&ScoringConfig::default(), &ColumnDictionary::fbref()).unwrap()
    }

    fn df_row(minutes: f64, percentiles: &[(&str, f64)]) -> PercentileRow {
        PercentileRow {
            player: "A".to_string(),
            team: "X".to_string(),
            role: Role::Defender,
            minutes,
            low_confidence: false,
            percentiles: percentiles
                .iter()
                .map(|(m, p)| (m.to_string(), *p))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_linear_reliability() {
        let curve = ReliabilityCurve::Linear;
        assert_eq!(curve.factor(0.0, 900.0), 0.0);
        assert_eq!(curve.factor(450.0, 900.0), 0.5);
        assert_eq!(curve.factor(900.0, 900.0), 1.0);
        assert_eq!(curve.factor(3000.0, 900.0), 1.0);
    }

    #[test]
    fn test_smoothstep_is_monotonic_and_saturates() {
        let curve = ReliabilityCurve::Smoothstep;
        let mut prev = 0.0;
        for minutes in (0..=1200).step_by(50) {
            let f = curve.factor(minutes as f64, 900.0);
            assert!(f >= prev);
            assert!((0.0..=1.0).contains(&f));
            prev = f;
        }
        assert_eq!(curve.factor(900.0, 900.0), 1.0);
    }

    #[test]
    fn test_raw_is_weighted_sum() {
        let row = df_row(
            1800.0,
            &[
                ("interceptions_per90", 100.0),
                ("tackles_won_per90", 50.0),
                ("prog_passes_per90", 0.0),
                ("prog_carries_per90", 20.0),
            ],
        );
        // 0.35*100 + 0.25*50 + 0.25*0 + 0.15*20
        let raw = scorer().raw_impact(&row).unwrap();
        assert!((raw - 50.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_metrics_renormalize() {
        let row = df_row(
            1800.0,
            &[("interceptions_per90", 80.0), ("tackles_won_per90", 20.0)],
        );
        // (0.35*80 + 0.25*20) / 0.60
        let raw = scorer().raw_impact(&row).unwrap();
        assert!((raw - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_weighted_metric_is_unscored() {
        let row = df_row(1800.0, &[("shots_per90", 80.0)]);
        assert!(scorer().raw_impact(&row).is_none());
    }

    #[test]
    fn test_bonus_blend() {
        let config = ScoringConfig {
            bonus_weight: 0.15,
            ..Default::default()
        };
        let scorer = Scorer::new(&config, &ColumnDictionary::fbref()).unwrap();
        let row = df_row(
            1800.0,
            &[
                ("interceptions_per90", 100.0),
                ("tackles_won_per90", 100.0),
                ("prog_passes_per90", 100.0),
                ("prog_carries_per90", 100.0),
                ("shots_per90", 0.0),
                ("xg_per90", 0.0),
            ],
        );
        let raw = scorer.raw_impact(&row).unwrap();
        assert!((raw - 85.0).abs() < 1e-9);
        assert!(scorer.metrics_of_interest().contains(&"shots_per90".to_string()));
    }

    #[test]
    fn test_invalid_scoring_values() {
        let dict = ColumnDictionary::fbref();
        for config in [
            ScoringConfig {
                saturation_minutes: 0.0,
                ..Default::default()
            },
            ScoringConfig {
                low_confidence_factor: 0.0,
                ..Default::default()
            },
            ScoringConfig {
                bonus_weight: 1.0,
                ..Default::default()
            },
            ScoringConfig {
                bonus_metrics: vec!["nope".to_string()],
                ..Default::default()
            },
        ] {
            assert!(Scorer::new(&config, &dict).is_err());
        }
    }
}
