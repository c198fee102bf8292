//! Run summary: exclusions, confidence and join coverage per season

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use serde::Serialize;

use crate::error::CoverageWarning;
use crate::pipeline::{ExclusionTally, JoinCoverage, Role, RoleWeights, SeasonOutcome};

/// Aggregated counts for one season.
#[derive(Debug, Clone, Serialize)]
pub struct SeasonSummary {
    pub season: String,
    pub tables_loaded: usize,
    pub tables_skipped: Vec<String>,
    pub records: usize,
    pub exclusions: ExclusionTally,
    pub low_confidence_roles: Vec<Role>,
    pub scored: usize,
    pub unscored: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<JoinCoverage>,
    pub warnings: Vec<CoverageWarning>,
}

impl From<&SeasonOutcome> for SeasonSummary {
    fn from(outcome: &SeasonOutcome) -> Self {
        Self {
            season: outcome.season.clone(),
            tables_loaded: outcome.tables_loaded.len(),
            tables_skipped: outcome.tables_skipped.iter().map(|t| t.to_string()).collect(),
            records: outcome.cleaned.records.len(),
            exclusions: outcome.cleaned.tally.clone(),
            low_confidence_roles: outcome
                .percentiles
                .partitions
                .iter()
                .filter(|p| p.low_confidence)
                .map(|p| p.role)
                .collect(),
            scored: outcome.impacts.scores.len(),
            unscored: outcome.impacts.unscored.len(),
            coverage: outcome.comparison.as_ref().map(|c| c.coverage.clone()),
            warnings: outcome.warnings.clone(),
        }
    }
}

/// Summary of a whole run, one entry per season in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub seasons: Vec<SeasonSummary>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_season(&mut self, outcome: &SeasonOutcome) {
        self.seasons.push(SeasonSummary::from(outcome));
    }

    pub fn total_warnings(&self) -> usize {
        self.seasons.iter().map(|s| s.warnings.len()).sum()
    }

    fn count_cell(n: usize) -> Cell {
        Cell::new(n).fg(if n == 0 { Color::White } else { Color::Yellow })
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Season").add_attribute(Attribute::Bold),
            Cell::new("Rows In").add_attribute(Attribute::Bold),
            Cell::new("Excluded").add_attribute(Attribute::Bold),
            Cell::new("Transfers").add_attribute(Attribute::Bold),
            Cell::new("Scored").add_attribute(Attribute::Bold),
            Cell::new("Low-Conf Roles").add_attribute(Attribute::Bold),
            Cell::new("Matched").add_attribute(Attribute::Bold),
            Cell::new("Unmatched").add_attribute(Attribute::Bold),
        ]);

        for s in &self.seasons {
            let low_conf = if s.low_confidence_roles.is_empty() {
                "-".to_string()
            } else {
                s.low_confidence_roles
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            };
            let (matched, unmatched) = match &s.coverage {
                Some(c) if c.fuzzy_matched > 0 => (
                    Cell::new(format!("{} ({} fuzzy)", c.matched, c.fuzzy_matched))
                        .fg(Color::Green),
                    Self::count_cell(c.impact_only + c.ambiguous),
                ),
                Some(c) => (
                    Cell::new(c.matched).fg(Color::Green),
                    Self::count_cell(c.impact_only + c.ambiguous),
                ),
                None => (Cell::new("-"), Cell::new("-")),
            };
            table.add_row(vec![
                Cell::new(&s.season).add_attribute(Attribute::Bold),
                Cell::new(s.exclusions.input_rows),
                Self::count_cell(s.exclusions.total_excluded()),
                Cell::new(s.exclusions.transfer_rows_merged),
                Cell::new(s.scored)
                    .fg(Color::Green)
                    .add_attribute(Attribute::Bold),
                Cell::new(low_conf).fg(if s.low_confidence_roles.is_empty() {
                    Color::White
                } else {
                    Color::Yellow
                }),
                matched,
                unmatched,
            ]);
        }

        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        for s in &self.seasons {
            if s.exclusions.total_excluded() == 0 {
                continue;
            }
            let e = &s.exclusions;
            println!();
            println!(
                "      {} {}:",
                style(format!("Exclusions {}", s.season)).yellow(),
                style(format!("({})", e.total_excluded())).dim()
            );
            for (label, n) in [
                ("aggregate rows", e.aggregate_rows),
                ("missing minutes", e.missing_minutes),
                ("zero minutes", e.zero_minutes),
                ("unknown position", e.unknown_position),
                ("below minimum minutes", e.below_min_minutes),
            ] {
                if n > 0 {
                    println!("        {} {} {}", style("•").dim(), label, style(n).yellow());
                }
            }
        }
    }
}

/// Print the validated weight vectors, one block per role.
pub fn display_weights(weights: &RoleWeights) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Role").add_attribute(Attribute::Bold),
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Weight").add_attribute(Attribute::Bold),
    ]);

    for (role, vector) in weights.iter() {
        for (i, (metric, weight)) in vector.iter().enumerate() {
            let role_cell = if i == 0 {
                Cell::new(role.as_str()).fg(Color::Cyan).add_attribute(Attribute::Bold)
            } else {
                Cell::new("")
            };
            table.add_row(vec![
                role_cell,
                Cell::new(metric),
                Cell::new(format!("{:.2}", weight)),
            ]);
        }
    }

    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}
