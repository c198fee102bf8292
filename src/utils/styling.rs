//! Terminal styling utilities

use console::{style, Emoji};
use std::path::Path;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static CALENDAR: Emoji<'_, '_> = Emoji("📅 ", "");
pub static MONEY: Emoji<'_, '_> = Emoji("💶 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ╦╔╦╗╔═╗╔═╗╔═╗╔╦╗  ╔═╗╔═╗╔═╗╦ ╦╔╦╗
    ║║║║╠═╝╠═╣║   ║   ╚═╗║  ║ ║║ ║ ║
    ╩╩ ╩╩  ╩ ╩╚═╝ ╩   ╚═╝╚═╝╚═╝╚═╝ ╩
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {} {}",
        style("⚽").green().bold(),
        style("Role-relative impact per euro").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Values shown on the configuration card
pub struct ConfigCard<'a> {
    pub data_dir: &'a Path,
    pub seasons: &'a [String],
    pub market_values: Option<&'a Path>,
    pub output_dir: &'a Path,
    pub min_minutes: f64,
    pub saturation_minutes: f64,
    pub min_peer_count: usize,
}

/// Print configuration card
pub fn print_config(card: &ConfigCard) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);
    let values = card
        .market_values
        .map(|p| truncate_path(p, 38))
        .unwrap_or_else(|| "(none, impact only)".to_string());

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!("    │  {} Data:    {:<38}│", FOLDER, truncate_path(card.data_dir, 38));
    println!(
        "    │  {} Seasons: {:<38}│",
        CALENDAR,
        truncate_string(&card.seasons.join(", "), 38)
    );
    println!("    │  {} Values:  {:<38}│", MONEY, values);
    println!("    │  {} Output:  {:<38}│", SAVE, truncate_path(card.output_dir, 38));
    println!("    ├{}┤", line);
    println!(
        "    │  {} Minimum minutes:     {:<26}│",
        CLOCK,
        style(format!("{:.0}", card.min_minutes)).yellow()
    );
    println!(
        "    │  {} Saturation minutes:  {:<26}│",
        CLOCK,
        style(format!("{:.0}", card.saturation_minutes)).yellow()
    );
    println!(
        "    │  {} Minimum role peers:  {:<26}│",
        CHART,
        style(card.min_peer_count).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(label: &str, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(label).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    match detail {
        Some(info) => println!(
            "      {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        ),
        None => println!("      {} {}", style(count).yellow().bold(), description),
    }
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("impactscout run complete!").green().bold()
    );
    println!();
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

/// Keep the tail of `s` within `max_len` characters.
fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("abcdefghijkl", 8), "...hijkl");
        assert_eq!(truncate_string("ééééééééé", 5), "...éé");
    }
}
