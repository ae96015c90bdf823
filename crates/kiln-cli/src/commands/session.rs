//! Session command - line-driven cleaning of a dataset.
//!
//! The top level works on the whole dataset. `column <name>` opens a
//! column session with its own undo history, which lasts until `back`.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;
use kiln::transform::{NullRemoval, UndoOutcome};
use kiln::{ColumnSession, DatasetState, Kiln, KilnError, TransformKind};

use super::{TerminalConfirm, open_kiln, print_report, print_summary};

enum Flow {
    Back,
    Quit,
}

pub fn run(file: PathBuf, config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let kiln = open_kiln(config.as_deref())?;
    let mut state = kiln.open_dataset(&file)?;

    println!(
        "{} {} ({} rows, {} columns)",
        "Loaded".green().bold(),
        file.display().to_string().white(),
        state.table().row_count(),
        state.table().column_count()
    );
    println!("Type {} for a list of commands.", "help".cyan());

    while let Some(line) = read_command("kiln> ")? {
        let (command, arg) = split_command(&line);
        match command {
            "" => {}
            "help" => print_help(),
            "columns" => print_columns(&state),
            "functions" => print_functions(&kiln),
            "column" if arg.is_empty() => println!("Usage: column <name>"),
            "column" => {
                if let Flow::Quit = column_session(&kiln, &mut state, arg)? {
                    break;
                }
            }
            "select" => match state.select(arg) {
                Ok(()) => println!("Selected: {}", state.selected_columns().join(", ")),
                Err(e) => print_error(&e),
            },
            "deselect" => match state.deselect(arg) {
                Ok(()) => println!("Selected: {}", state.selected_columns().join(", ")),
                Err(e) => print_error(&e),
            },
            "save" => save(&state, arg),
            "quit" | "exit" => break,
            other => println!("Unknown command '{}'. Type 'help'.", other),
        }
    }

    Ok(())
}

fn column_session(kiln: &Kiln, state: &mut DatasetState, column: &str) -> io::Result<Flow> {
    let mut session = match ColumnSession::open(state, column) {
        Ok(session) => session,
        Err(e) => {
            print_error(&e);
            return Ok(Flow::Back);
        }
    };
    show(&session);

    let prompt = format!("kiln:{}> ", column);
    while let Some(line) = read_command(&prompt)? {
        let (command, arg) = split_command(&line);
        match command {
            "" => {}
            "help" => print_help(),
            "apply" if arg.is_empty() => println!("Usage: apply <transform>"),
            "apply" if arg == "remove_nulls" => {
                match kiln.remove_nulls(&mut session, &mut TerminalConfirm) {
                    Ok(NullRemoval::NoNulls) => println!("No missing values in '{}'", column),
                    Ok(NullRemoval::Cancelled(_)) => println!("{}", "Cancelled.".yellow()),
                    Ok(NullRemoval::Removed(report)) => print_report(&report),
                    Err(e) => print_error(&e),
                }
            }
            "apply" => match kiln.apply(&mut session, arg) {
                Ok(report) => print_report(&report),
                Err(e) => print_error(&e),
            },
            "undo" => match session.undo() {
                UndoOutcome::Restored { summary, remaining } => {
                    println!("{} ({} left)", "Undone.".green(), remaining);
                    if let Some(summary) = summary {
                        print_summary(&summary);
                    }
                }
                UndoOutcome::NothingToUndo => println!("{}", "Nothing to undo.".yellow()),
            },
            "show" => show(&session),
            "columns" => print_columns(session.state()),
            "functions" => print_functions(kiln),
            "save" => save(session.state(), arg),
            "select" | "deselect" => println!("Leave the column with 'back' first."),
            "back" | "done" => return Ok(Flow::Back),
            "quit" | "exit" => return Ok(Flow::Quit),
            other => println!("Unknown command '{}'. Type 'help'.", other),
        }
    }

    Ok(Flow::Quit)
}

/// Prompt and read one line. `None` at end of input.
fn read_command(prompt: &str) -> io::Result<Option<String>> {
    print!("{}", prompt.cyan());
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        println!();
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    }
}

fn show(session: &ColumnSession<'_>) {
    match session.summary() {
        Ok(summary) => print_summary(&summary),
        Err(_) => println!("Column '{}' is no longer in the dataset", session.column()),
    }
}

fn save(state: &DatasetState, arg: &str) {
    if arg.is_empty() {
        println!("Usage: save <path>");
        return;
    }
    let path = Path::new(arg);
    match state.table().write_delimited(path) {
        Ok(()) => println!("{} {}", "Saved to".green().bold(), path.display()),
        Err(e) => print_error(&e),
    }
}

fn print_columns(state: &DatasetState) {
    for overview in state.column_overview() {
        let marker = if overview.selected { "*" } else { " " };
        let dtype = overview.dtype.dtype_name();
        let dtype = if overview.compatible {
            dtype.green()
        } else {
            dtype.red()
        };
        println!("  {} {:24} {}", marker, overview.name, dtype);
    }
}

fn print_functions(kiln: &Kiln) {
    for info in kiln.registry().catalog() {
        let kind = match info.kind {
            TransformKind::Builtin => info.kind.to_string().blue(),
            TransformKind::Survey => info.kind.to_string().magenta(),
            TransformKind::Custom => info.kind.to_string().green(),
        };
        println!("  {:28} {:8} {}", info.name, kind, info.description);
    }
}

fn print_error(error: &KilnError) {
    println!("{} {}", format!("Error [{}]:", error.kind()).red().bold(), error);
}

fn print_help() {
    println!("{}", "Dataset commands:".yellow().bold());
    println!("  columns              list columns and the selection");
    println!("  column <name>        work on one column");
    println!("  select <name>        add a column to the training selection");
    println!("  deselect <name>      remove a column from the selection");
    println!("  functions            list available transforms");
    println!("  save <path>          write the dataset");
    println!("  quit                 leave");
    println!("{}", "Column commands:".yellow().bold());
    println!("  apply <transform>    apply a transform to the column");
    println!("  undo                 revert the last transform");
    println!("  show                 summarize the column");
    println!("  back                 return to the dataset");
}
