//! Interactive prompts using dialoguer

use std::path::PathBuf;

use anyhow::Result;
use console::style;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// List the files that already exist and ask before overwriting them.
///
/// Returns `true` without prompting when none of `paths` exist.
pub fn confirm_overwrite(paths: &[PathBuf]) -> Result<bool> {
    let existing: Vec<&PathBuf> = paths.iter().filter(|p| p.exists()).collect();
    if existing.is_empty() {
        return Ok(true);
    }

    println!(
        "    {} {} existing file(s) will be overwritten:",
        style("⚠").yellow().bold(),
        existing.len()
    );
    for path in &existing {
        println!("      {} {}", style("•").dim(), path.display());
    }
    confirm_step("Overwrite?")
}
