//! Role weight vectors: defaults, extraction and validation

use std::collections::{BTreeMap, BTreeSet};

use super::columns::ColumnDictionary;
use super::position::Role;
use crate::error::ConfigError;

/// Allowed distance of a role's weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Weights as written in configuration: role label -> metric -> weight.
pub type RawWeights = BTreeMap<String, BTreeMap<String, f64>>;

/// Built-in weight vectors. GK weighs distribution, the outfield roles weigh progression.
pub fn default_weights() -> RawWeights {
    let table: &[(&str, &[(&str, f64)])] = &[
        (
            "DF",
            &[
                ("interceptions_per90", 0.35),
                ("tackles_won_per90", 0.25),
                ("prog_passes_per90", 0.25),
                ("prog_carries_per90", 0.15),
            ],
        ),
        (
            "MF",
            &[
                ("prog_passes_per90", 0.30),
                ("prog_carries_per90", 0.25),
                ("key_passes_per90", 0.25),
                ("interceptions_per90", 0.20),
            ],
        ),
        (
            "FW",
            &[
                ("xg_per90", 0.35),
                ("shots_per90", 0.20),
                ("key_passes_per90", 0.20),
                ("prog_carries_per90", 0.25),
            ],
        ),
        (
            "GK",
            &[
                ("pass_completion_pct", 0.40),
                ("passes_completed_per90", 0.35),
                ("prog_passes_per90", 0.25),
            ],
        ),
    ];

    table
        .iter()
        .map(|(role, metrics)| {
            (
                role.to_string(),
                metrics.iter().map(|(m, w)| (m.to_string(), *w)).collect(),
            )
        })
        .collect()
}

/// Validated weight vectors, one per role.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleWeights {
    by_role: BTreeMap<Role, Vec<(String, f64)>>,
}

impl RoleWeights {
    /// Weight vector of a role, in metric-name order.
    pub fn get(&self, role: Role) -> &[(String, f64)] {
        self.by_role.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every metric any role weighs.
    pub fn metrics(&self) -> BTreeSet<String> {
        self.by_role
            .values()
            .flat_map(|v| v.iter().map(|(m, _)| m.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &[(String, f64)])> {
        self.by_role.iter().map(|(r, v)| (*r, v.as_slice()))
    }
}

/// Validate configured weights.
///
/// # Errors
/// * unknown role label
/// * two labels for the same role (`DF` and `df`)
/// * a role without a weight vector
/// * NaN, infinite or negative weight
/// * a metric the column dictionary cannot produce
/// * a weight vector whose sum is not 1.0 within [`WEIGHT_TOLERANCE`]
pub fn validate_weights(
    raw: &RawWeights,
    dictionary: &ColumnDictionary,
) -> Result<RoleWeights, ConfigError> {
    let mut by_role = BTreeMap::new();

    for (label, metrics) in raw {
        let role: Role = label.parse()?;
        if by_role.contains_key(&role) {
            return Err(ConfigError::DuplicateRole(role));
        }

        let mut vector = Vec::with_capacity(metrics.len());
        for (metric, &weight) in metrics {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    role,
                    metric: metric.clone(),
                    value: weight,
                });
            }
            if !dictionary.produces(metric) {
                return Err(ConfigError::UnknownMetric {
                    metric: metric.clone(),
                    context: format!("scoring.weights.{}", role),
                });
            }
            vector.push((metric.clone(), weight));
        }

        let sum: f64 = vector.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightSum { role, sum });
        }

        by_role.insert(role, vector);
    }

    for role in Role::ALL {
        if !by_role.contains_key(&role) {
            return Err(ConfigError::MissingRole(role));
        }
    }

    Ok(RoleWeights { by_role })
}
