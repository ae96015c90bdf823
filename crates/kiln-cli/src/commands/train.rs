//! Train command - fit a KNN classifier and save the model bundle.

use std::path::PathBuf;

use colored::Colorize;
use kiln::Kiln;
use kiln::model::training_columns;

use super::load_config;

pub fn run(
    file: PathBuf,
    columns: Vec<String>,
    neighbors: Option<usize>,
    out: PathBuf,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let mut config = load_config(config.as_deref())?;
    if let Some(k) = neighbors {
        config.model.neighbors = k;
        config.validate()?;
    }
    let kiln = Kiln::new(config)?;

    let mut state = kiln.open_dataset(&file)?;
    for column in &columns {
        state.select(column)?;
    }
    for overview in state.column_overview() {
        if let Some(warning) = overview.warning.filter(|_| overview.selected) {
            println!("{} {}", "Warning:".yellow().bold(), warning);
        }
    }

    println!(
        "{} k={} on {}",
        "Training".cyan().bold(),
        kiln.config().model.neighbors,
        training_columns(&state).join(", ").white()
    );

    let (bundle, metrics) = kiln.train_and_save(&state, &out)?;

    println!(
        "  Train rows: {}  Test rows: {}",
        metrics.train_size, metrics.test_size
    );
    let accuracy = format!("{:.1}%", metrics.accuracy * 100.0);
    let accuracy = if metrics.accuracy >= 0.8 {
        accuracy.green()
    } else if metrics.accuracy >= 0.5 {
        accuracy.yellow()
    } else {
        accuracy.red()
    };
    println!("  Accuracy: {}", accuracy);
    println!();
    println!(
        "{} {} ({} features)",
        "Saved model to".green().bold(),
        out.display().to_string().white(),
        bundle.training_columns.len()
    );

    Ok(())
}
