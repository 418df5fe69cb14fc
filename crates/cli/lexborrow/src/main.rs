//! lexborrow CLI
//!
//! Main entry point for the lexical borrow checker

use anyhow::Result;
use clap::{Parser, Subcommand};
use lb_borrow_check::BorrowMode;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod check;
mod config;
mod explain;
mod run;

use config::OutputFormat;

#[derive(Parser)]
#[command(name = "lexborrow")]
#[command(about = "Lexical borrow checker for toy imperative programs", long_about = None)]
#[command(version)]
struct Cli {
    /// Log checker and driver activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check programs for borrow violations
    Check {
        /// Program file, or directory searched for .json and .toml programs
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (text or json)
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Borrow mode (lexical or non-lexical)
        #[arg(long)]
        mode: Option<BorrowMode>,

        /// Configuration file (defaults to ./lexborrow.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Evaluate programs that pass and print what their reads observe
        #[arg(long)]
        eval: bool,
    },

    /// Check a program, then evaluate it
    Run {
        /// Program file
        path: PathBuf,
    },

    /// Explain a violation kind
    Explain {
        /// Kind name or code, e.g. `ExclusivityViolation` or `borrowck::exclusivity`
        kind: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check {
            path,
            format,
            mode,
            config,
            eval,
        } => {
            check::check(&check::CheckOptions {
                path,
                format,
                mode,
                config,
                eval,
            })?;
        }
        Commands::Run { path } => {
            run::run(&path)?;
        }
        Commands::Explain { kind } => {
            explain::explain(&kind)?;
        }
    }

    Ok(())
}
