//! CLI command definitions and handlers.

pub mod estimate;
pub mod models;

use clap::{Parser, Subcommand};

/// Clo-Scan - Garment detection to thermal insulation estimation
#[derive(Parser)]
#[command(name = "clo-scan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared estimate arguments (paths, thresholds, flags).
    #[command(flatten)]
    pub estimate: estimate::EstimateArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Estimate garment insulation for images
    Estimate(estimate::EstimateArgs),
    /// Manage detector model files
    Models(models::ModelsArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Run completed.
    Success,
    /// Run aborted on an error.
    Error,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => Self::from(0),
            ExitCode::Error => Self::from(2),
        }
    }
}
