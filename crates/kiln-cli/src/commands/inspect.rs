//! Inspect command - column overview, summaries and valid values.

use std::path::PathBuf;

use colored::Colorize;

use super::{open_kiln, print_summary};

pub fn run(
    file: PathBuf,
    column: Option<String>,
    json_output: bool,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let kiln = open_kiln(config.as_deref())?;
    let state = kiln.open_dataset(&file)?;

    let columns: Vec<String> = match column {
        Some(name) => vec![name],
        None => state.table().headers.clone(),
    };
    let summaries = columns
        .iter()
        .map(|c| state.column_summary(c))
        .collect::<kiln::Result<Vec<_>>>()?;

    if json_output {
        let valid_values: serde_json::Map<String, serde_json::Value> = state
            .valid_values()
            .iter()
            .filter(|(name, _)| columns.contains(*name))
            .map(|(name, values)| Ok((name.clone(), serde_json::to_value(values)?)))
            .collect::<Result<_, serde_json::Error>>()?;
        let report = serde_json::json!({
            "file": state.source().map(|s| s.file.clone()),
            "rows": state.table().row_count(),
            "columns": state.column_overview(),
            "selected": state.selected_columns(),
            "summaries": summaries,
            "valid_values": valid_values,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {} ({} rows, {} columns)",
        "Dataset".cyan().bold(),
        file.display().to_string().white(),
        state.table().row_count(),
        state.table().column_count()
    );
    println!();

    println!("{}", "Columns:".yellow().bold());
    for overview in state.column_overview() {
        let marker = if overview.selected { "*" } else { " " };
        let dtype = overview.dtype.dtype_name();
        let dtype = if overview.compatible {
            dtype.green()
        } else {
            dtype.red()
        };
        println!("  {} {:24} {}", marker, overview.name, dtype);
        if let Some(warning) = overview.warning {
            println!("      {}", warning.yellow());
        }
    }
    println!();

    for summary in &summaries {
        print_summary(summary);
        if let Some(valid) = state.valid_values().get(&summary.column) {
            println!("- Valid values: {}", valid);
        }
        println!();
    }

    Ok(())
}
