mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use cmd::run::RunArgs;
use std::path::PathBuf;
use uavsim_core::SimError;

/// Exit status after an interrupted run, matching a shell's SIGINT status.
const EXIT_ABORTED: i32 = 130;

#[derive(Parser)]
#[command(
    name = "uavsim",
    about = "Multi-UAV scenario harness: replay flights against an xApp and compare resource contention",
    version,
    propagate_version = true
)]
struct Cli {
    /// Harness config file (default: ./uavsim.yaml when present)
    #[arg(long, global = true, env = "UAVSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios and print the comparison
    Run(RunArgs),

    /// List the built-in scenarios
    Scenarios,

    /// Check the xApp's health endpoint
    Health {
        /// xApp base URL (overrides the config)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Compare previously saved results
    Compare {
        /// Results directory (overrides the config)
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Show or validate the effective configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run(args) => cmd::run::run(config, args, cli.json),
        Commands::Scenarios => cmd::scenarios::run(cli.json),
        Commands::Health { endpoint } => cmd::health::run(config, endpoint, cli.json),
        Commands::Compare { output } => cmd::compare::run(config, output, cli.json),
        Commands::Config { subcommand } => cmd::config::run(config, subcommand, cli.json),
    };

    if let Err(e) = result {
        if let Some(SimError::ScenarioAborted { .. }) = e.downcast_ref::<SimError>() {
            eprintln!("{e}");
            std::process::exit(EXIT_ABORTED);
        }
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
