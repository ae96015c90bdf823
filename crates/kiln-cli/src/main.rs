//! Kiln CLI - column cleaning, custom transforms and KNN training.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = cli.config;
    let result = match cli.command {
        Commands::Inspect { file, column, json } => {
            commands::inspect::run(file, column, json, config)
        }

        Commands::Transform {
            file,
            column,
            transforms,
            output,
            yes,
        } => commands::transform::run(file, column, transforms, output, yes, config),

        Commands::Session { file } => commands::session::run(file, config),

        Commands::Functions { action } => commands::functions::run(action, config),

        Commands::Survey { file, output } => commands::survey::run(file, output, config),

        Commands::Train {
            file,
            columns,
            neighbors,
            out,
        } => commands::train::run(file, columns, neighbors, out, config),

        Commands::Predict { dir, input, values } => {
            commands::predict::run(dir, input, values, config)
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", commands::error_heading(e.as_ref()), e);
        std::process::exit(1);
    }
}
