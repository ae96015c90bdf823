//! Functions command - manage custom transforms in the text store.

use std::fs;
use std::io;
use std::path::PathBuf;

use colored::Colorize;
use kiln::TransformKind;
use kiln::transform::Answer;

use super::{TerminalConfirm, open_kiln};
use crate::cli::FunctionsAction;

pub fn run(
    action: FunctionsAction,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kiln = open_kiln(config.as_deref())?;

    match action {
        FunctionsAction::List { json } => {
            let catalog = kiln.registry().catalog();
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
                return Ok(());
            }
            for kind in [TransformKind::Builtin, TransformKind::Survey, TransformKind::Custom] {
                let entries: Vec<_> = catalog.iter().filter(|t| t.kind == kind).collect();
                println!(
                    "{} ({})",
                    format!("{} transforms", kind).yellow().bold(),
                    entries.len()
                );
                if entries.is_empty() {
                    println!("  (none)");
                }
                for info in entries {
                    println!(
                        "  {}{}  {}",
                        info.name.white().bold(),
                        info.signature,
                        info.description.dimmed()
                    );
                }
                println!();
            }
            println!(
                "Custom transforms live in {}",
                kiln.registry().path().display().to_string().cyan()
            );
        }

        FunctionsAction::Show { name } => {
            println!("{}", kiln.registry().source(&name)?);
        }

        FunctionsAction::Add { name, file } => {
            let source = read_source(file)?;
            kiln.registry_mut().add(&name, &source)?;
            println!("{} {}", "Added".green().bold(), name.white().bold());
        }

        FunctionsAction::Edit { name, rename, file } => {
            let source = read_source(file)?;
            let new_name = rename.unwrap_or_else(|| name.clone());
            kiln.registry_mut().edit(&name, &new_name, &source)?;
            if new_name == name {
                println!("{} {}", "Updated".green().bold(), name.white().bold());
            } else {
                println!(
                    "{} {} -> {}",
                    "Renamed".green().bold(),
                    name,
                    new_name.white().bold()
                );
            }
        }

        FunctionsAction::Delete { name, yes } => {
            let deleted = if yes {
                kiln.registry_mut().delete(&name, &mut Answer::Yes)?
            } else {
                kiln.registry_mut().delete(&name, &mut TerminalConfirm)?
            };
            if deleted {
                println!("{} {}", "Deleted".green().bold(), name.white().bold());
            } else {
                println!("{}", "Cancelled.".yellow());
            }
        }
    }

    Ok(())
}

/// Function source from a file, or stdin when no file is given.
fn read_source(file: Option<PathBuf>) -> Result<String, Box<dyn std::error::Error>> {
    match file {
        Some(path) => fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e).into()),
        None => Ok(io::read_to_string(io::stdin())?),
    }
}
