//! Tests for valuation loading, identity matching and value efficiency

#[path = "common/mod.rs"]
mod common;

use chrono::NaiveDate;
use common::*;
use impactscout::error::CoverageWarning;
use impactscout::pipeline::{
    apply_manual_values, compare_values, load_market_values, ComparatorConfig, ImpactScore,
    ImpactTable, MarketValueRecord, MarketValues, MatchStatus, Role, ValueNormalization,
};
use tempfile::TempDir;

fn score(player: &str, team: &str, role: Role, adjusted: f64) -> ImpactScore {
    ImpactScore {
        player: player.to_string(),
        team: team.to_string(),
        season: SEASON.to_string(),
        role,
        minutes: 1800.0,
        reliability: 1.0,
        raw: adjusted,
        adjusted,
        low_confidence: false,
    }
}

fn value(player: &str, team: Option<&str>, eur: f64) -> MarketValueRecord {
    MarketValueRecord {
        player: player.to_string(),
        team: team.map(str::to_string),
        value_eur: eur,
        snapshot_date: NaiveDate::from_ymd_opt(2025, 1, 15),
    }
}

fn impacts(scores: Vec<ImpactScore>) -> ImpactTable {
    ImpactTable {
        season: SEASON.to_string(),
        scores,
        unscored: Vec::new(),
    }
}

fn values(records: Vec<MarketValueRecord>) -> MarketValues {
    MarketValues {
        records,
        ..Default::default()
    }
}

#[test]
fn test_efficiency_uses_log_value() {
    let table = impacts(vec![score("A", "X", Role::Forward, 80.0)]);
    let vals = values(vec![value("A", Some("X"), 1_000_000.0)]);

    let result = compare_values(&table, &vals, &ComparatorConfig::default());
    let entry = &result.entries[0];
    let expected_norm = (1_000_001.0_f64).ln();
    assert!((entry.normalized_value - expected_norm).abs() < 1e-12);
    assert!((entry.efficiency - 80.0 / expected_norm).abs() < 1e-12);
    assert_eq!(entry.rank, 1);
    assert_eq!(entry.market_value_eur, 1_000_000.0);
}

#[test]
fn test_ranked_within_role_by_efficiency() {
    let table = impacts(vec![
        score("Cheap Good", "X", Role::Midfielder, 70.0),
        score("Pricey Good", "X", Role::Midfielder, 90.0),
        score("Cheap Bad", "X", Role::Midfielder, 10.0),
        score("Lone Keeper", "X", Role::Goalkeeper, 50.0),
    ]);
    let vals = values(vec![
        value("Cheap Good", None, 1_000_000.0),
        value("Pricey Good", None, 100_000_000.0),
        value("Cheap Bad", None, 1_000_000.0),
        value("Lone Keeper", None, 2_000_000.0),
    ]);
    let config = ComparatorConfig {
        normalization: ValueNormalization::MinMax,
        ..Default::default()
    };

    let result = compare_values(&table, &vals, &config);
    let mf: Vec<(&str, usize)> = result
        .entries
        .iter()
        .filter(|e| e.role == Role::Midfielder)
        .map(|e| (e.player.as_str(), e.rank))
        .collect();
    // Cheap players normalize to 1.0, the expensive one to 100.0.
    assert_eq!(
        mf,
        vec![("Cheap Good", 1), ("Cheap Bad", 2), ("Pricey Good", 3)]
    );
    let gk = result.entries.last().unwrap();
    assert_eq!((gk.player.as_str(), gk.rank), ("Lone Keeper", 1));
    assert!(result
        .entries
        .iter()
        .all(|e| (1.0..=100.0).contains(&e.normalized_value)));
}

#[test]
fn test_efficiency_ties_break_by_player_then_team() {
    let table = impacts(vec![
        score("Zed", "X", Role::Defender, 50.0),
        score("Abe", "Y", Role::Defender, 50.0),
    ]);
    let vals = values(vec![
        value("Zed", None, 5_000_000.0),
        value("Abe", None, 5_000_000.0),
    ]);

    let result = compare_values(&table, &vals, &ComparatorConfig::default());
    assert_eq!(result.entries[0].player, "Abe");
    assert_eq!(result.entries[1].player, "Zed");
}

#[test]
fn test_shortlist_keeps_top_n_per_role() {
    let mut scores = Vec::new();
    let mut records = Vec::new();
    for i in 0..5 {
        let name = format!("FW{}", i);
        scores.push(score(&name, "X", Role::Forward, 10.0 * (i + 1) as f64));
        records.push(value(&name, None, 1_000_000.0));
    }
    let config = ComparatorConfig {
        shortlist_size: 2,
        ..Default::default()
    };

    let result = compare_values(&impacts(scores), &values(records), &config);
    let names: Vec<&str> = result.entries.iter().map(|e| e.player.as_str()).collect();
    assert_eq!(names, vec!["FW4", "FW3"]);
    assert_eq!(result.coverage.matched, 5);
}

#[test]
fn test_unmatched_player_is_excluded_and_counted() {
    let table = impacts(vec![
        score("Known", "X", Role::Forward, 60.0),
        score("Unknown", "X", Role::Forward, 90.0),
    ]);
    let vals = values(vec![
        value("Known", Some("X"), 2_000_000.0),
        value("Elsewhere", Some("Z"), 2_000_000.0),
    ]);

    let result = compare_values(&table, &vals, &ComparatorConfig::default());
    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].player, "Known");
    assert_eq!(result.coverage.matched, 1);
    assert_eq!(result.coverage.impact_only, 1);
    assert_eq!(result.coverage.valuation_only, 1);
    assert_eq!(result.unmatched_players, vec!["Unknown".to_string()]);
    assert!(result
        .coverage_warnings()
        .contains(&CoverageWarning::UnmatchedImpact {
            season: SEASON.to_string(),
            count: 1,
        }));
}

#[test]
fn test_team_breaks_name_ties() {
    let table = impacts(vec![
        score("Danilo", "Juventus", Role::Defender, 60.0),
        score("Rodri", "Betis", Role::Midfielder, 60.0),
    ]);
    let vals = values(vec![
        value("Danilo", Some("Juventus"), 8_000_000.0),
        value("Danilo", Some("Nottingham"), 3_000_000.0),
        value("Rodri", Some("Man City"), 100_000_000.0),
        value("Rodri", Some("Real Sociedad"), 5_000_000.0),
    ]);

    let result = compare_values(&table, &vals, &ComparatorConfig::default());
    assert_eq!(result.coverage.matched, 1);
    assert_eq!(result.coverage.ambiguous, 1);
    assert_eq!(result.entries[0].market_value_eur, 8_000_000.0);
    assert_eq!(result.unmatched_players, vec!["Rodri".to_string()]);
}

#[test]
fn test_accents_and_case_are_folded() {
    let table = impacts(vec![score("Kylian Mbappé", "Real Madrid", Role::Forward, 99.0)]);
    let vals = values(vec![value("KYLIAN  MBAPPE", None, 180_000_000.0)]);

    let result = compare_values(&table, &vals, &ComparatorConfig::default());
    assert_eq!(result.coverage.matched, 1);
    assert_eq!(result.entries[0].player, "Kylian Mbappé");
}

#[test]
fn test_comparison_does_not_mutate_inputs() {
    let table = impacts(vec![score("A", "X", Role::Forward, 80.0)]);
    let vals = values(vec![value("A", None, 1_000_000.0)]);
    let before = table.scores.clone();

    let _ = compare_values(&table, &vals, &ComparatorConfig::default());
    assert_eq!(table.scores, before);
    assert_eq!(vals.records.len(), 1);
}

#[test]
fn test_load_market_values_with_as_of_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = write_market_values(
        dir.path(),
        "values.csv",
        &[
            ("A", "X", 10_000_000.0, "2024-07-01"),
            ("A", "X", 12_000_000.0, "2025-01-15"),
            ("A", "X", 20_000_000.0, "2025-07-01"),
            ("B", "Y", 0.0, "2025-01-15"),
            ("C", "Z", -5.0, "2025-01-15"),
        ],
    );

    let latest = load_market_values(&path, None).unwrap();
    assert_eq!(latest.records.len(), 1);
    assert_eq!(latest.records[0].value_eur, 20_000_000.0);
    assert_eq!(latest.superseded, 2);
    assert_eq!(latest.invalid, 2);

    let as_of = NaiveDate::from_ymd_opt(2025, 3, 1);
    let snapshot = load_market_values(&path, as_of).unwrap();
    assert_eq!(snapshot.records[0].value_eur, 12_000_000.0);
    assert_eq!(snapshot.after_cutoff, 1);
}

#[test]
fn test_column_aliases_are_accepted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tm.csv");
    std::fs::write(
        &path,
        "name,club,market_value_in_eur,snapshot_date\n\
         Bukayo Saka,Arsenal,\"140,000,000\",2025-01-15\n",
    )
    .unwrap();

    let loaded = load_market_values(&path, None).unwrap();
    assert_eq!(loaded.records.len(), 1);
    assert_eq!(loaded.records[0].team.as_deref(), Some("Arsenal"));
    assert_eq!(loaded.records[0].value_eur, 140_000_000.0);
}

#[test]
fn test_missing_value_column_is_malformed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "player,team\nA,X\n").unwrap();
    assert!(load_market_values(&path, None).is_err());
}

#[test]
fn test_manual_values_override() {
    let dir = TempDir::new().unwrap();
    let base = values(vec![
        value("A", Some("X"), 1_000_000.0),
        value("B", Some("Y"), 2_000_000.0),
    ]);
    let manual = write_market_values(
        dir.path(),
        "manual.csv",
        &[
            ("A", "X", 9_000_000.0, "2025-02-01"),
            ("New Signing", "Y", 4_000_000.0, "2025-02-01"),
        ],
    );

    let merged = apply_manual_values(&base, &manual).unwrap();
    assert_eq!(merged.overridden, 1);
    assert_eq!(merged.records.len(), 3);
    assert_eq!(merged.records[0].value_eur, 9_000_000.0);
    assert_eq!(merged.records[1].value_eur, 2_000_000.0);
    assert_eq!(merged.records[2].player, "New Signing");
}

#[test]
fn test_former_club_valuation_gives_way_to_latest() {
    let dir = TempDir::new().unwrap();
    let path = write_market_values(
        dir.path(),
        "history.csv",
        &[
            ("Max Muster", "Old FC", 1_000_000.0, "2023-01-01"),
            ("Max Muster", "FC New Town", 9_000_000.0, "2024-12-01"),
        ],
    );
    let vals = load_market_values(&path, None).unwrap();
    assert_eq!(vals.records.len(), 2);

    // The FBref club label matches neither valuation club exactly.
    let table = impacts(vec![score("Max Muster", "New Town", Role::Midfielder, 70.0)]);
    let result = compare_values(&table, &vals, &ComparatorConfig::default());

    assert_eq!(result.coverage.matched, 1);
    assert_eq!(result.coverage.ambiguous, 0);
    assert_eq!(result.coverage.resolved_by_date, 1);
    assert_eq!(result.coverage.valuation_only, 0);
    assert_eq!(result.entries[0].market_value_eur, 9_000_000.0);
}

#[test]
fn test_undated_namesakes_stay_ambiguous() {
    let table = impacts(vec![score("Rodri", "Betis", Role::Midfielder, 60.0)]);
    let mut a = value("Rodri", Some("Man City"), 100_000_000.0);
    let mut b = value("Rodri", Some("Real Sociedad"), 5_000_000.0);
    a.snapshot_date = None;
    b.snapshot_date = NaiveDate::from_ymd_opt(2025, 6, 1);

    let result = compare_values(&table, &values(vec![a, b]), &ComparatorConfig::default());
    assert_eq!(result.coverage.ambiguous, 1);
    assert_eq!(result.audit[0].status, MatchStatus::Ambiguous);
}

#[test]
fn test_misspelled_name_matches_by_similarity() {
    let table = impacts(vec![
        score("Gabriel Martinelli", "Arsenal", Role::Forward, 80.0),
        score("Bukayo Saka", "Arsenal", Role::Forward, 90.0),
    ]);
    let vals = values(vec![
        value("Gabriel Martineli", Some("Arsenal"), 60_000_000.0),
        value("Declan Rice", Some("Arsenal"), 120_000_000.0),
    ]);

    let result = compare_values(&table, &vals, &ComparatorConfig::default());
    assert_eq!(result.coverage.matched, 1);
    assert_eq!(result.coverage.fuzzy_matched, 1);
    assert_eq!(result.coverage.impact_only, 1);
    assert_eq!(result.entries[0].player, "Gabriel Martinelli");
    assert_eq!(result.entries[0].market_value_eur, 60_000_000.0);

    assert_eq!(result.audit.len(), 2);
    let fuzzy = &result.audit[0];
    assert_eq!(fuzzy.status, MatchStatus::FuzzyMatched);
    assert_eq!(fuzzy.candidate.as_deref(), Some("Gabriel Martineli"));
    assert!(fuzzy.similarity.unwrap() >= 92.0);
    let saka = &result.audit[1];
    assert_eq!(saka.player, "Bukayo Saka");
    assert_eq!(saka.status, MatchStatus::UnmatchedLowScore);
}

#[test]
fn test_fuzzy_fallback_can_be_disabled() {
    let table = impacts(vec![score("Gabriel Martinelli", "Arsenal", Role::Forward, 80.0)]);
    let vals = values(vec![value("Gabriel Martineli", Some("Arsenal"), 60_000_000.0)]);
    let config = ComparatorConfig {
        fuzzy_matching: false,
        ..Default::default()
    };

    let result = compare_values(&table, &vals, &config);
    assert_eq!(result.coverage.matched, 0);
    assert_eq!(result.coverage.fuzzy_matched, 0);
    assert_eq!(result.audit[0].status, MatchStatus::Unmatched);
    assert_eq!(result.audit[0].candidate, None);
}

#[test]
fn test_manual_value_without_team_replaces_every_namesake() {
    let dir = TempDir::new().unwrap();
    let base = values(vec![
        value("A", Some("X"), 1_000_000.0),
        value("A", Some("Y"), 2_000_000.0),
        value("B", Some("Y"), 3_000_000.0),
    ]);
    let manual = dir.path().join("manual.csv");
    std::fs::write(&manual, "player,market_value_eur\nA,7000000\n").unwrap();

    let merged = apply_manual_values(&base, &manual).unwrap();
    assert_eq!(merged.overridden, 2);
    assert_eq!(merged.records.len(), 3);
    assert_eq!(merged.records[0].value_eur, 7_000_000.0);
    assert_eq!(merged.records[1].value_eur, 7_000_000.0);
    assert_eq!(merged.records[2].value_eur, 3_000_000.0);
}

#[test]
fn test_unusable_manual_rows_are_counted() {
    let dir = TempDir::new().unwrap();
    let base = MarketValues {
        records: vec![value("A", Some("X"), 1_000_000.0)],
        invalid: 1,
        ..Default::default()
    };
    let manual = dir.path().join("manual.csv");
    std::fs::write(
        &manual,
        "player,team,market_value_eur\nA,X,5000000\nB,Y,-1\nC,Z,unknown\n",
    )
    .unwrap();

    let merged = apply_manual_values(&base, &manual).unwrap();
    assert_eq!(merged.invalid, 3);
    assert_eq!(merged.overridden, 1);
    assert_eq!(merged.records.len(), 1);
}
