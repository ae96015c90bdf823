//! Predict command - batch or single-record prediction with a saved bundle.

use std::path::PathBuf;

use colored::Colorize;
use indexmap::IndexMap;
use kiln::ModelBundle;

use super::load_config;

pub fn run(
    dir: PathBuf,
    input: Option<PathBuf>,
    values: Vec<String>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config.as_deref())?;
    let bundle = ModelBundle::load(&dir)?;

    if let Some(input) = input {
        if !input.exists() {
            return Err(format!("File not found: {}", input.display()).into());
        }
        let batch = bundle.predict_batch(&input, &config.parser, &config.dataset)?;
        let positive = batch.predictions.iter().filter(|p| p.label == 1).count();
        println!(
            "{} {} records ({} positive, {} negative)",
            "Predicted".cyan().bold(),
            batch.predictions.len().to_string().white().bold(),
            positive.to_string().green(),
            (batch.predictions.len() - positive).to_string().red()
        );
        println!(
            "{} {}",
            "Saved to".green().bold(),
            batch.output.display().to_string().white()
        );
        return Ok(());
    }

    let record = parse_record(&values)?;
    let prediction = bundle.predict_record(&record)?;
    let label = prediction.label.to_string();
    let label = if prediction.label == 1 {
        label.green().bold()
    } else {
        label.red().bold()
    };
    println!("Prediction: {}", label);
    println!(
        "Probability of 1: {:.2}",
        prediction.positive_probability()
    );

    Ok(())
}

/// Parse `column=value` pairs into a record.
fn parse_record(values: &[String]) -> Result<IndexMap<String, f64>, String> {
    let mut record = IndexMap::new();
    for pair in values {
        let (column, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Expected COLUMN=VALUE, got '{}'", pair))?;
        let number: f64 = value
            .trim()
            .parse()
            .map_err(|_| format!("Value for '{}' is not a number: '{}'", column, value))?;
        record.insert(column.trim().to_string(), number);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let record =
            parse_record(&["income=1000".to_string(), "bdate_age = 30".to_string()]).unwrap();
        assert_eq!(record.get("income"), Some(&1000.0));
        assert_eq!(record.get("bdate_age"), Some(&30.0));
    }

    #[test]
    fn test_parse_record_rejects_bad_pairs() {
        assert!(parse_record(&["income".to_string()]).is_err());
        assert!(parse_record(&["income=lots".to_string()]).is_err());
    }
}
