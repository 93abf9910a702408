//! gridfill CLI - Incremental BMRS settlement-period acquisition.

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod setup;

#[derive(Parser)]
#[command(name = "gridfill")]
#[command(about = "Incremental BMRS settlement-period data acquisition", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (JSON)
    #[arg(short, long, global = true, env = "GRIDFILL_CONFIG")]
    config: Option<PathBuf>,

    /// Store directory. Defaults to the platform data directory.
    #[arg(long, global = true, env = "GRIDFILL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Reporting API key
    #[arg(long, global = true, env = "GRIDFILL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Settings shared by the commands that plan windows.
#[derive(Args, Clone, Default)]
struct PlanArgs {
    /// Days per fetch window
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Earliest settlement date to acquire (YYYY-MM-DD)
    #[arg(long)]
    floor_date: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a cycle now and then on every interval until Ctrl-C
    Run {
        #[command(flatten)]
        plan: PlanArgs,

        /// Seconds between cycles
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Maximum windows per cycle
        #[arg(long)]
        max_windows: Option<u32>,
    },

    /// Run a single cycle and print its report
    Once {
        #[command(flatten)]
        plan: PlanArgs,

        /// Maximum windows per cycle
        #[arg(long)]
        max_windows: Option<u32>,
    },

    /// Show the next window without fetching
    Plan {
        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Show store contents and backfill progress
    Status {
        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Print a stored record as JSON
    Get {
        /// Record id (e.g., B1620.FOSSIL-GAS_20240303T0100Z)
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    setup::init_tracing(cli.verbose, cli.quiet);

    let overrides = setup::Overrides {
        config: cli.config,
        data_dir: cli.data_dir,
        api_key: cli.api_key,
        ..setup::Overrides::default()
    };

    match command {
        Commands::Run {
            plan,
            interval_secs,
            max_windows,
        } => {
            let config = overrides.with_plan(plan).with_cycle(interval_secs, max_windows).load()?;
            commands::run::run(&config).await
        }
        Commands::Once { plan, max_windows } => {
            let config = overrides.with_plan(plan).with_cycle(None, max_windows).load()?;
            commands::once::once(&config).await
        }
        Commands::Plan { plan } => {
            let config = overrides.with_plan(plan).load()?;
            commands::plan::plan(&config).await
        }
        Commands::Status { plan } => {
            let config = overrides.with_plan(plan).load()?;
            commands::status::status(&config).await
        }
        Commands::Get { id } => {
            let config = overrides.load()?;
            commands::get::get(&config, &id).await
        }
    }
}
