//! Command line argument parsing for the vietcat CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// vietcat - categorize Vietnamese transaction descriptions
#[derive(Parser, Debug, Clone)]
#[command(name = "vietcat")]
#[command(about = "Train and run a Vietnamese transaction categorizer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct VietcatArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl VietcatArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train a model from a labelled corpus and save it
    Train(TrainArgs),

    /// Categorize a single transaction description
    Classify(ClassifyArgs),

    /// Measure the accuracy of a saved model on a labelled corpus
    Evaluate(EvaluateArgs),

    /// Show model metadata and artifact headers
    Inspect(InspectArgs),
}

/// Arguments for training a model
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Training corpus (JSON array of samples)
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// Directory the model artifacts are written to
    #[arg(value_name = "MODEL_DIR")]
    pub model_dir: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Maximum vocabulary size
    #[arg(long)]
    pub max_features: Option<usize>,

    /// Seed for the split and training shuffles
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of training epochs
    #[arg(long)]
    pub epochs: Option<usize>,
}

/// Arguments for classifying a description
#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    /// Directory holding a trained model
    #[arg(value_name = "MODEL_DIR")]
    pub model_dir: PathBuf,

    /// Transaction description
    #[arg(value_name = "DESCRIPTION")]
    pub description: String,

    /// Transaction amount
    #[arg(short, long, allow_negative_numbers = true)]
    pub amount: Option<f64>,

    /// Category catalog overriding the one stored with the model
    #[arg(long, value_name = "CATALOG_FILE")]
    pub catalog: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for evaluating a saved model
#[derive(Parser, Debug, Clone)]
pub struct EvaluateArgs {
    /// Directory holding a trained model
    #[arg(value_name = "MODEL_DIR")]
    pub model_dir: PathBuf,

    /// Labelled corpus to evaluate on
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,
}

/// Arguments for inspecting a saved model
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// Directory holding a trained model
    #[arg(value_name = "MODEL_DIR")]
    pub model_dir: PathBuf,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
