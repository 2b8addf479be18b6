//! Models command - manage detector model files.

use anyhow::Result;
use clap::{Args, Subcommand};
use clo_scan_adapters::models::{ensure_models, list_models, models_dir};

/// Arguments for the models command
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Models subcommands
#[derive(Subcommand)]
pub enum ModelsCommand {
    /// Download required model files
    Fetch,
    /// List model files and their install status
    List,
    /// Print the models directory path
    Path,
}

/// Run the models command.
pub fn run(args: &ModelsArgs) -> Result<()> {
    match args.command {
        ModelsCommand::Fetch => fetch(),
        ModelsCommand::List => list(),
        ModelsCommand::Path => print_path(),
    }
}

fn fetch() -> Result<()> {
    ensure_models()?;
    println!("All model files installed in {}", models_dir().display());
    Ok(())
}

fn list() -> Result<()> {
    for (name, installed) in list_models() {
        let status = if installed { "installed" } else { "missing" };
        println!("{name}: {status}");
    }
    Ok(())
}

fn print_path() -> Result<()> {
    println!("{}", models_dir().display());
    Ok(())
}
