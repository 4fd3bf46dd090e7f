//! Distributor CLI.
//!
//! Generates message-queue workers for functions distributed across
//! servers.
//!
//! # Architecture
//!
//! The CLI is organized around subcommands:
//! - `generate` - Scan sources and write one worker per queue server
//! - `plan` - Show the workers a generation run would produce
//! - `completions` - Generate shell completions
//!
//! # Examples
//!
//! ```bash
//! # Generate workers into ./src-gen
//! distributor generate --declarations declarations.json src/
//!
//! # Add workers for new functions without repeating imports
//! distributor generate --declarations declarations.json --append src/
//!
//! # Inspect the grouping
//! distributor plan --declarations declarations.toml --format json
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use distributor_cli::commands;
use distributor_cli::commands::generate::GenerateArgs;
use distributor_cli::commands::plan::PlanArgs;
use distributor_core::cli::{ExitCode, OutputFormat};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Distributor - queue workers for distributed functions.
///
/// Reads function and server declarations, finds declaration sites in the
/// sources, and writes an amqplib worker per server that dispatches queued
/// calls to the local implementations.
#[derive(Parser, Debug)]
#[command(name = "distributor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, text, pretty)
    #[arg(long = "format", global = true, default_value = "pretty")]
    format: String,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate queue workers from declarations and sources.
    ///
    /// Every function declaration found in the sources is looked up in the
    /// declaration file; the first queue function of each server produces
    /// that server's worker.
    ///
    /// # Examples
    ///
    /// ```bash
    /// distributor generate -d declarations.json src/
    /// distributor generate -d declarations.json --output-dir build/workers src/api.js
    /// DISTRIBUTOR_CONNECTION_URL=amqp://rabbit distributor generate -d decl.toml src/
    /// ```
    Generate(GenerateArgs),

    /// Show the workers a generation run would produce.
    ///
    /// Lists each queue server with its queue, broker URL, worker path, and
    /// dispatched functions, plus functions that cannot be placed.
    Plan(PlanArgs),

    /// Generate shell completions.
    ///
    /// Generates completion scripts for various shells that can be
    /// sourced or saved to enable tab completion for this CLI.
    Completions {
        /// Target shell for completion generation
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let exit_code = match cli.format.parse::<OutputFormat>() {
        Ok(output_format) => match execute_command(cli.command, output_format).await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!("{e:#}");
                eprintln!("Error: {e:#}");
                exit_code_for(&e)
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::INVALID_INPUT
        }
    };

    std::process::exit(exit_code.as_i32());
}

/// Maps a failed command onto an exit code.
///
/// Declarations or settings that fail validation are invalid input;
/// anything else (I/O, rendering) is a general error.
fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    let invalid_input = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<distributor_core::Error>())
        .any(|e| {
            e.is_validation_error()
                || e.is_config_error()
                || matches!(e, distributor_core::Error::InvalidArgument(_))
        });

    if invalid_input {
        ExitCode::INVALID_INPUT
    } else {
        ExitCode::ERROR
    }
}

/// Initializes logging infrastructure.
///
/// `--verbose` forces debug level; otherwise `RUST_LOG` applies, defaulting
/// to `info`. Logs go to stderr so stdout carries only command output.
///
/// # Errors
///
/// Returns an error if logging initialization fails.
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

/// Executes the specified CLI command.
///
/// # Errors
///
/// Returns an error if command execution fails.
async fn execute_command(command: Commands, output_format: OutputFormat) -> Result<ExitCode> {
    match command {
        Commands::Generate(args) => commands::generate::run(args, output_format).await,
        Commands::Plan(args) => commands::plan::run(args, output_format).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            commands::completions::run(shell, &mut cmd).await
        }
    }
}
