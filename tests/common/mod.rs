//! Shared test utilities and fixture generators
#![allow(dead_code)]

use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use impactscout::pipeline::SourceTable;

pub const SEASON: &str = "2024-2025";

/// One source row. Every counting stat scales with `level * minutes`, so the
/// per-90 rate (and hence the role percentile) is monotonic in `level`.
#[derive(Debug, Clone)]
pub struct FixturePlayer {
    pub name: String,
    pub team: String,
    pub pos: String,
    pub minutes: f64,
    pub level: f64,
}

pub fn player(name: &str, team: &str, pos: &str, minutes: f64, level: f64) -> FixturePlayer {
    FixturePlayer {
        name: name.to_string(),
        team: team.to_string(),
        pos: pos.to_string(),
        minutes,
        level,
    }
}

impl FixturePlayer {
    fn stat(&self, base: f64) -> f64 {
        (base * self.level * self.minutes / 900.0 * 100.0).round() / 100.0
    }
}

/// A small league:
/// - 6 defenders (one listed as "DF,MF"), plus one with 200 minutes
/// - 6 midfielders plus one mid-season transfer listed for two teams
/// - 6 forwards, one with an accented name
/// - 2 goalkeepers (a low-confidence partition)
/// - one "Squad Total" aggregate row
///
/// Inside each role, the player with level 6 is the best on every metric.
pub fn league() -> Vec<FixturePlayer> {
    let mut players = vec![
        player("Dan Dual", "Alpha", "DF,MF", 2700.0, 6.0),
        player("Dave Back", "Beta", "DF", 2500.0, 5.0),
        player("Dirk Wall", "Gamma", "DF", 2000.0, 4.0),
        player("Dom Stopper", "Alpha", "DF", 1800.0, 3.0),
        player("Don Keeper", "Beta", "DF", 1500.0, 2.0),
        player("Dex Slow", "Gamma", "DF", 1200.0, 1.0),
        player("Sam Short", "Alpha", "DF", 200.0, 6.0),
        player("Mo Engine", "Alpha", "MF", 2600.0, 6.0),
        player("Max Pivot", "Beta", "MF", 2400.0, 5.0),
        player("Mick Link", "Gamma", "MF", 2200.0, 4.0),
        player("Matt Runner", "Alpha", "MF", 1900.0, 3.0),
        player("Mark Shuttle", "Beta", "MF", 1600.0, 2.0),
        player("Miles Quiet", "Gamma", "MF", 1000.0, 1.0),
        player("Tom Transfer", "Alpha", "MF", 500.0, 3.5),
        player("Tom Transfer", "Beta", "MF,FW", 500.0, 3.5),
        player("Kylian Mbappé", "Alpha", "FW", 2500.0, 6.0),
        player("Fred Finisher", "Beta", "FW", 2300.0, 5.0),
        player("Finn Poacher", "Gamma", "FW", 2100.0, 4.0),
        player("Felix Wide", "Alpha", "FW", 1700.0, 3.0),
        player("Frank Target", "Beta", "FW", 1400.0, 2.0),
        player("Floyd Bench", "Gamma", "FW", 950.0, 1.0),
        player("Gus Gloves", "Alpha", "GK", 3000.0, 2.0),
        player("Gil Hands", "Beta", "GK", 2800.0, 1.0),
    ];
    players.push(player("Squad Total", "Alpha", "", 9900.0, 1.0));
    players
}

fn col<T, F: Fn(&FixturePlayer) -> T>(players: &[FixturePlayer], f: F) -> Vec<T> {
    players.iter().map(f).collect()
}

/// Build one FBref-style source table with its native headers.
pub fn table_frame(table: SourceTable, players: &[FixturePlayer]) -> DataFrame {
    let names = col(players, |p| p.name.clone());
    let teams = col(players, |p| p.team.clone());
    match table {
        SourceTable::Standard => df! {
            "Player" => names,
            "Squad" => teams,
            "Pos" => col(players, |p| p.pos.clone()),
            "Min" => col(players, |p| p.minutes),
            "90s" => col(players, |p| (p.minutes / 90.0 * 10.0).round() / 10.0),
            "Gls" => col(players, |p| p.stat(0.4)),
            "Ast" => col(players, |p| p.stat(0.3)),
            "xG" => col(players, |p| p.stat(0.35)),
        },
        SourceTable::Shooting => df! {
            "Player" => names,
            "Squad" => teams,
            "Sh" => col(players, |p| p.stat(2.0)),
            "SoT" => col(players, |p| p.stat(0.9)),
            "xG" => col(players, |p| p.stat(0.35)),
        },
        SourceTable::Passing => df! {
            "Player" => names,
            "Squad" => teams,
            "Cmp" => col(players, |p| p.stat(30.0)),
            "Att" => col(players, |p| p.stat(36.0)),
            "Cmp%" => col(players, |p| 60.0 + p.level * 4.0),
            "KP" => col(players, |p| p.stat(1.1)),
            "PrgP" => col(players, |p| p.stat(4.0)),
        },
        SourceTable::Possession => df! {
            "Player" => names,
            "Squad" => teams,
            "PrgC" => col(players, |p| p.stat(2.5)),
            "Succ" => col(players, |p| p.stat(0.8)),
        },
        SourceTable::Defending => df! {
            "Player" => names,
            "Squad" => teams,
            "Tkl" => col(players, |p| p.stat(2.2)),
            "TklW" => col(players, |p| p.stat(1.4)),
            "Int" => col(players, |p| p.stat(1.2)),
        },
    }
    .unwrap()
}

pub fn write_csv(df: &mut DataFrame, path: &Path) {
    let mut file = std::fs::File::create(path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
}

pub fn write_parquet(df: &mut DataFrame, path: &Path) {
    let file = std::fs::File::create(path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();
}

/// Write the given tables for one season as `fbref_<table>_<season>.csv`.
pub fn write_season_tables(
    dir: &Path,
    season: &str,
    players: &[FixturePlayer],
    tables: &[SourceTable],
) {
    for table in tables {
        let mut df = table_frame(*table, players);
        let path = dir.join(format!("{}.csv", table.file_stem(season)));
        write_csv(&mut df, &path);
    }
}

/// Temporary data directory holding all five tables of the fixture league.
pub fn create_league_dir() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_season_tables(temp_dir.path(), SEASON, &league(), &SourceTable::ALL);
    temp_dir
}

/// Write a valuation CSV with `player, team, market_value_eur, date` columns.
pub fn write_market_values(dir: &Path, name: &str, rows: &[(&str, &str, f64, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut df = df! {
        "player" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        "team" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        "market_value_eur" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        "date" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
    }
    .unwrap();
    write_csv(&mut df, &path);
    path
}

/// Valuations for the fixture league. "Floyd Bench" has none; "Ghost Player"
/// matches nobody; Mbappé is listed without the accent.
pub fn league_market_values(dir: &Path) -> PathBuf {
    write_market_values(
        dir,
        "market_values.csv",
        &[
            ("Dan Dual", "Alpha", 40_000_000.0, "2025-01-15"),
            ("Dave Back", "Beta", 10_000_000.0, "2025-01-15"),
            ("Dirk Wall", "Gamma", 8_000_000.0, "2025-01-15"),
            ("Dom Stopper", "Alpha", 5_000_000.0, "2025-01-15"),
            ("Don Keeper", "Beta", 3_000_000.0, "2025-01-15"),
            ("Dex Slow", "Gamma", 1_000_000.0, "2025-01-15"),
            ("Mo Engine", "Alpha", 60_000_000.0, "2025-01-15"),
            ("Max Pivot", "Beta", 12_000_000.0, "2025-01-15"),
            ("Mick Link", "Gamma", 9_000_000.0, "2025-01-15"),
            ("Matt Runner", "Alpha", 4_000_000.0, "2025-01-15"),
            ("Mark Shuttle", "Beta", 2_000_000.0, "2025-01-15"),
            ("Miles Quiet", "Gamma", 500_000.0, "2025-01-15"),
            ("Tom Transfer", "Beta", 7_000_000.0, "2025-01-15"),
            ("Kylian Mbappe", "Alpha", 180_000_000.0, "2025-01-15"),
            ("Fred Finisher", "Beta", 20_000_000.0, "2025-01-15"),
            ("Finn Poacher", "Gamma", 15_000_000.0, "2025-01-15"),
            ("Felix Wide", "Alpha", 6_000_000.0, "2025-01-15"),
            ("Frank Target", "Beta", 2_500_000.0, "2025-01-15"),
            ("Gus Gloves", "Alpha", 5_000_000.0, "2025-01-15"),
            ("Gil Hands", "Beta", 1_500_000.0, "2025-01-15"),
            ("Ghost Player", "Nowhere", 3_000_000.0, "2025-01-15"),
        ],
    )
}
