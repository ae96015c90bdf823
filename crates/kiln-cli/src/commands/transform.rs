//! Transform command - apply transforms to one column and save the result.

use std::path::PathBuf;

use colored::Colorize;
use kiln::transform::{Answer, NullRemoval};
use kiln::{ColumnSession, Confirm};

use super::{TerminalConfirm, open_kiln, print_report, sibling_path};

pub fn run(
    file: PathBuf,
    column: String,
    transforms: Vec<String>,
    output: Option<PathBuf>,
    yes: bool,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let kiln = open_kiln(config.as_deref())?;
    let mut state = kiln.open_dataset(&file)?;
    let mut confirm: Box<dyn Confirm> = if yes {
        Box::new(Answer::Yes)
    } else {
        Box::new(TerminalConfirm)
    };

    println!(
        "{} '{}' in {}",
        "Transforming".cyan().bold(),
        column,
        file.display().to_string().white()
    );

    let mut applied = 0;
    {
        let mut session = ColumnSession::open(&mut state, &column)?;
        for spec in &transforms {
            if spec == "remove_nulls" {
                match kiln.remove_nulls(&mut session, confirm.as_mut())? {
                    NullRemoval::NoNulls => {
                        println!("{} No missing values in '{}'", "Note:".yellow(), column)
                    }
                    NullRemoval::Cancelled(_) => println!("{}", "Cancelled.".yellow()),
                    NullRemoval::Removed(report) => {
                        print_report(&report);
                        applied += 1;
                    }
                }
            } else {
                let report = kiln.apply(&mut session, spec)?;
                print_report(&report);
                applied += 1;
            }
            println!();
        }
    }

    if applied == 0 {
        println!("{}", "Nothing changed; no file written.".yellow());
        return Ok(());
    }

    let output_path = output.unwrap_or_else(|| sibling_path(&file, "transformed"));
    state.table().write_delimited(&output_path)?;
    println!(
        "{} {}",
        "Saved to".green().bold(),
        output_path.display().to_string().white()
    );

    Ok(())
}
