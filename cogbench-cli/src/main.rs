// SPDX-License-Identifier: Apache-2.0

//! cogbench CLI
//!
//! Command-line interface for the raster compression benchmark driver.

use clap::{Parser, Subcommand};
use tracing::{error, info};

use cogbench_core::{BenchmarkOrchestrator, ConfigLoader, GdalCliEngine, RunId};

/// cogbench - resumable raster compression benchmark
#[derive(Parser)]
#[command(name = "cogbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "cogbench.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the benchmark, resuming any prior progress for the run id
    Run {
        /// Resume key; overrides the configured run_id
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let outcome = match cli.command {
        Commands::Run { run_id } => run(&cli.config, run_id),
        Commands::Validate { file } => validate(&file),
    };

    match outcome {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run(config_path: &str, run_id: Option<String>) -> cogbench_core::BenchResult<()> {
    let mut config = ConfigLoader::load_file(config_path)?;
    if let Some(run_id) = run_id {
        config.run_id = Some(RunId::new(run_id)?);
    }

    let engine = GdalCliEngine::new();
    let orchestrator = BenchmarkOrchestrator::new(config, &engine)?;
    info!(
        "results will be written to {}",
        orchestrator.result_dir().display()
    );
    orchestrator.run()
}

fn validate(file: &str) -> cogbench_core::BenchResult<()> {
    let config = ConfigLoader::load_file(file)?;
    info!(
        "configuration valid: {} root(s), {} compression variant(s)",
        config.files.len(),
        config.compressions.len()
    );
    Ok(())
}
