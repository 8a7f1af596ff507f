//! # vcl CLI entry point
//!
//! Parses arguments, loads configuration, initialises tracing and dispatches
//! to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vcl_cli::config::{DemoConfig, LogFormat};
use vcl_cli::demo::{run_demo, DemoArgs};
use vcl_cli::encode::{run_encode, EncodeArgs};
use vcl_cli::id::{run_id, IdArgs};

/// Credential ledger toolchain.
///
/// Identifier codec, attribute encoding, and an in-memory walk through
/// issuance, proof and revocation.
#[derive(Parser, Debug)]
#[command(name = "vcl", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse or format ledger identifiers.
    Id(IdArgs),

    /// Encode raw attribute values.
    Encode(EncodeArgs),

    /// Publish, issue, prove, verify and revoke against an in-memory ledger.
    Demo(DemoArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match DemoConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };
    init_tracing(cli.verbose, config.log_format);

    let result = match &cli.command {
        Commands::Id(args) => run_id(args),
        Commands::Encode(args) => run_encode(args),
        Commands::Demo(args) => run_demo(args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
