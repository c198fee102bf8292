//! impactscout: Player Impact Scoring CLI Tool
//!
//! Scores players against their role peers from FBref season tables and
//! ranks them by impact per unit of market value.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;

use impactscout::cli::{confirm_overwrite, Cli, Commands, RunArgs};
use impactscout::config::Settings;
use impactscout::pipeline::Pipeline;
use impactscout::report::{
    audit_frame, audit_path, display_weights, efficiency_frame, efficiency_path,
    export_run_report, impact_frame, impact_path, save_dataset, ExportParams, RunSummary,
};
use impactscout::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_success, ConfigCard,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => run(args),
        Commands::Check { config } => check(config.as_deref()),
        Commands::InitConfig { path, force } => init_config(path, *force),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = Settings::load_or_default(path).with_context(|| match path {
        Some(p) => format!("Invalid configuration in {}", p.display()),
        None => "Invalid default configuration".to_string(),
    })?;
    Ok(settings)
}

fn run(args: &RunArgs) -> Result<()> {
    let mut settings = load_settings(args.config.as_deref())?;
    args.apply_overrides(&mut settings);
    settings
        .validate()
        .context("Invalid configuration after command-line overrides")?;
    settings.logging.init();

    if settings.seasons.is_empty() {
        bail!("No seasons to process. Use -s/--season or set `seasons` in the config file.");
    }

    let pipeline = Pipeline::from_settings(&settings)?;
    let output_dir = args.output_dir();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        data_dir: &args.data_dir,
        seasons: &settings.seasons,
        market_values: args.market_values.as_deref(),
        output_dir: &output_dir,
        min_minutes: settings.cleaner.min_minutes,
        saturation_minutes: settings.scoring.saturation_minutes,
        min_peer_count: settings.normalizer.min_peer_count,
    });

    if !args.no_confirm && !confirm_overwrite(&args.artifact_paths(&settings.seasons))? {
        println!("Cancelled by user.");
        return Ok(());
    }

    let values = match &args.market_values {
        Some(path) => {
            let spinner = create_spinner("Loading market values...");
            let values = pipeline
                .load_market_values(path, args.manual_values.as_deref())
                .with_context(|| format!("Failed to load market values from {}", path.display()))?;
            finish_with_success(
                &spinner,
                &format!("{} market values loaded", values.records.len()),
            );
            Some(values)
        }
        None => None,
    };

    // Every season is scored before anything is written, so a failing
    // season leaves no partial output behind.
    let mut outcomes = Vec::with_capacity(settings.seasons.len());
    for season in &settings.seasons {
        let step_start = Instant::now();
        print_step_header("SEASON", season);

        let spinner = create_spinner("Loading, cleaning and scoring...");
        let outcome = pipeline
            .run_season(&args.data_dir, season, values.as_ref())
            .with_context(|| format!("Season {} failed", season))?;
        if outcome.warnings.is_empty() {
            finish_with_success(&spinner, "Season scored");
        } else {
            finish_with_warning(
                &spinner,
                &format!("Season scored with {} coverage warning(s)", outcome.warnings.len()),
            );
        }

        print_count("player-seasons kept", outcome.cleaned.records.len(), None);
        print_count(
            "rows excluded",
            outcome.cleaned.tally.total_excluded(),
            Some(format!("(min {:.0} minutes)", settings.cleaner.min_minutes).as_str()),
        );
        print_count("players scored", outcome.impacts.scores.len(), None);
        if let Some(comparison) = &outcome.comparison {
            print_count("players matched to a valuation", comparison.coverage.matched, None);
        }

        print_info(&format!(
            "Completed in {}",
            style(format!("{:.2}s", step_start.elapsed().as_secs_f64())).dim()
        ));
        outcomes.push(outcome);
    }

    print_step_header("OUTPUT", "Writing tables");
    fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let mut summary = RunSummary::new();
    for outcome in &outcomes {
        let season = outcome.season.as_str();
        let path = impact_path(&output_dir, season, args.format);
        let mut df = impact_frame(&outcome.impacts)?;
        save_dataset(&mut df, &path)?;
        print_success(&format!("Impact scores saved to {}", path.display()));

        if let Some(comparison) = &outcome.comparison {
            let path = efficiency_path(&output_dir, season, args.format);
            let mut df = efficiency_frame(comparison)?;
            save_dataset(&mut df, &path)?;
            print_success(&format!("Value efficiency saved to {}", path.display()));

            let path = audit_path(&output_dir, season, args.format);
            let mut df = audit_frame(comparison)?;
            save_dataset(&mut df, &path)?;
            print_success(&format!("Match audit saved to {}", path.display()));
        }
        summary.add_season(outcome);
    }

    summary.display();

    if let Some(report_path) = &args.report {
        export_run_report(
            &summary,
            report_path,
            &ExportParams {
                data_dir: &args.data_dir,
                market_values: args.market_values.as_deref(),
                output_dir: &output_dir,
                settings: &settings,
            },
        )?;
        print_success(&format!("Run report saved to {}", report_path.display()));
    }

    print_completion();
    Ok(())
}

fn check(config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    let pipeline = Pipeline::from_settings(&settings)?;

    print_step_header("CHECK", "Role weights");
    display_weights(pipeline.scorer().weights());
    println!();
    print_success(&format!(
        "Configuration is valid ({} season(s): {})",
        settings.seasons.len(),
        settings.seasons.join(", ")
    ));
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }
    let text = Settings::default().to_toml_string()?;
    fs::write(path, text)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    print_success(&format!("Default configuration written to {}", path.display()));
    Ok(())
}
