//! CLI command definitions and handlers.

pub mod evaluate;
pub mod explain;
pub mod finetune;
pub mod sweep;
pub mod train;

use clap::{Parser, Subcommand};

/// Crackscan - concrete crack detection training and evaluation
#[derive(Parser)]
#[command(name = "crackscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Train a classifier head on a labeled image directory
    Train(train::TrainArgs),
    /// Fine-tune the top feature blocks of a trained model
    Finetune(finetune::FinetuneArgs),
    /// Evaluate a trained model on the validation split
    Evaluate(evaluate::EvaluateArgs),
    /// Sweep decision thresholds and report the best F1
    Sweep(sweep::SweepArgs),
    /// Predict and explain a single image
    Explain(explain::ExplainArgs),
}
