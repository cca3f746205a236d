//! CLI frontend for the Somatic body simulation.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "somatic",
    about = "Somatic: a tick-based simulation of a living body",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log event delivery and state transitions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply scripted commands, advance the clock and print the body's state
    Run {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "1")]
        ticks: u64,

        /// JSON file with configuration overrides
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Command to apply before ticking, e.g. `damage:chest:80` (repeatable)
        #[arg(long = "cmd", value_name = "SCRIPT")]
        scripts: Vec<String>,

        /// Print the JSON snapshot instead of tables
        #[arg(long)]
        json: bool,

        /// Also print the occurrence log
        #[arg(short, long)]
        log: bool,
    },

    /// Write the JSON snapshot of a body after a scripted run
    Export {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "0")]
        ticks: u64,

        /// JSON file with configuration overrides
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Command to apply before ticking (repeatable)
        #[arg(long = "cmd", value_name = "SCRIPT")]
        scripts: Vec<String>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List body parts with their parents and traits
    Anatomy,

    /// Print the default configuration as JSON
    Config,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            ticks,
            config,
            scripts,
            json,
            log,
        } => commands::run::run(config.as_deref(), &scripts, ticks, json, log),
        Commands::Export {
            ticks,
            config,
            scripts,
            output,
        } => commands::export::run(config.as_deref(), &scripts, ticks, output.as_deref()),
        Commands::Anatomy => commands::anatomy::run(),
        Commands::Config => commands::config::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
