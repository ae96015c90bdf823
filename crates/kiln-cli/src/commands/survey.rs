//! Survey command - run the survey pipeline over an export.

use std::path::PathBuf;

use colored::Colorize;
use kiln::input::Parser;

use super::{load_config, sibling_path};

pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let config = load_config(config.as_deref())?;
    let (table, _) = Parser::with_config(config.parser.clone()).parse_file(&file)?;
    let columns = config.survey.clone();
    let kiln = kiln::Kiln::new(config)?;

    println!(
        "{} {} ({} rows)",
        "Processing".cyan().bold(),
        file.display().to_string().white(),
        table.row_count()
    );

    let processed = kiln.run_survey(&table)?;
    for column in [&columns.bdate, &columns.education_status, &columns.education_form] {
        println!("  {} {}", "Normalized".green(), column);
    }
    let added: Vec<&String> = processed
        .headers
        .iter()
        .filter(|h| !table.has_column(h))
        .collect();
    for column in added {
        println!("  {} {}", "Added".green(), column);
    }

    let output_path = output.unwrap_or_else(|| sibling_path(&file, "processed"));
    processed.write_delimited(&output_path)?;
    println!();
    println!(
        "{} {}",
        "Saved to".green().bold(),
        output_path.display().to_string().white()
    );

    Ok(())
}
