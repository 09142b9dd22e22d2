//! Crackscan CLI - training, evaluation and explanation tool.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod dataset;
mod metrics;

use commands::{Cli, Commands};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Train(ref args) => commands::train::run(args),
        Commands::Finetune(ref args) => commands::finetune::run(args),
        Commands::Evaluate(ref args) => commands::evaluate::run(args),
        Commands::Sweep(ref args) => commands::sweep::run(args),
        Commands::Explain(ref args) => commands::explain::run(args),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}
