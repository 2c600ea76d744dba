mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "settle")]
#[command(
    about = "Declare SQL virtual machines in KDL and wait until they settle",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a resource file
    Validate {
        /// Resource file (discovered when omitted)
        file: Option<PathBuf>,
    },
    /// Show what apply would change
    Plan {
        /// Resource file (discovered when omitted)
        file: Option<PathBuf>,
    },
    /// Create or update every declared SQL virtual machine
    Apply {
        /// Resource file (discovered when omitted)
        file: Option<PathBuf>,
        /// Seconds between settle checks
        #[arg(long, env = "SETTLE_POLL_INTERVAL")]
        interval: Option<u64>,
        /// Consecutive matching reads required
        #[arg(long)]
        debounce: Option<u32>,
    },
    /// Print the current state of a SQL virtual machine as JSON
    Show {
        /// Resource id (/subscriptions/.../sqlVirtualMachines/NAME)
        id: String,
    },
    /// Delete a declared SQL virtual machine
    Destroy {
        /// Declared name
        name: String,
        /// Resource file (discovered when omitted)
        file: Option<PathBuf>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so that `show` output stays valid JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match cli.command {
        Commands::Version => {
            println!("settleflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Validate { file } => {
            commands::validate::handle(file).await?;
        }
        Commands::Plan { file } => {
            commands::plan::handle(file).await?;
        }
        Commands::Apply {
            file,
            interval,
            debounce,
        } => {
            commands::apply::handle(file, interval, debounce).await?;
        }
        Commands::Show { id } => {
            commands::show::handle(&id).await?;
        }
        Commands::Destroy { name, file, yes } => {
            commands::destroy::handle(&name, file, yes).await?;
        }
    }

    Ok(())
}
