//! CLI command implementations.

pub mod functions;
pub mod inspect;
pub mod predict;
pub mod session;
pub mod survey;
pub mod train;
pub mod transform;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;
use kiln::config::DEFAULT_CONFIG_FILE;
use kiln::{ApplyReport, ColumnSummary, Confirm, Kiln, KilnConfig, KilnError, Prompt};

/// Load the configuration named on the command line, or `kiln.toml` when
/// present, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<KilnConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => KilnConfig::load(path)?,
        None => KilnConfig::load_or_default(DEFAULT_CONFIG_FILE)?,
    };
    log::debug!("transform store at '{}'", config.store_path.display());
    Ok(config)
}

pub fn open_kiln(config: Option<&Path>) -> Result<Kiln, Box<dyn std::error::Error>> {
    Ok(Kiln::new(load_config(config)?)?)
}

/// `Error:` heading for a reported error, tagged with its kind when it
/// comes from the library.
pub fn error_heading(error: &(dyn std::error::Error + 'static)) -> String {
    match error.downcast_ref::<KilnError>() {
        Some(e) => format!("Error [{}]:", e.kind()),
        None => "Error:".to_string(),
    }
}

/// `<dir>/<stem>_<suffix>.<ext>` next to `file`.
pub fn sibling_path(file: &Path, suffix: &str) -> PathBuf {
    let stem = file.file_stem().unwrap_or_default().to_string_lossy();
    let name = match file.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    file.with_file_name(name)
}

/// Asks on the terminal. Anything but `y`/`yes` declines.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &Prompt<'_>) -> bool {
        println!("{}", prompt.to_string().yellow());
        print!("[y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

pub fn print_summary(summary: &ColumnSummary) {
    let mut lines = summary.to_string().lines().map(str::to_string).collect::<Vec<_>>();
    if let Some(first) = lines.first_mut() {
        *first = first.cyan().bold().to_string();
    }
    for line in lines {
        println!("{}", line);
    }
}

pub fn print_report(report: &ApplyReport) {
    println!(
        "{} {} on '{}'",
        "Applied".green().bold(),
        report.transform.white().bold(),
        report.column
    );
    if report.rows_removed() > 0 {
        println!(
            "  Rows: {} -> {} ({} removed)",
            report.rows_before,
            report.rows_after,
            report.rows_removed().to_string().yellow()
        );
    }
    if !report.columns_added.is_empty() {
        println!("  Added: {}", report.columns_added.join(", ").green());
    }
    if !report.columns_removed.is_empty() {
        println!("  Removed: {}", report.columns_removed.join(", ").red());
    }
    match &report.summary {
        Some(summary) => print_summary(summary),
        None => println!("  Column '{}' is no longer in the dataset", report.column),
    }
}
