//! charttiles CLI - operator interface to the chart tile cache.
//!
//! Wraps the charttiles library for offline use: seed a region into a
//! provider's cache, delete a region, or inspect the cache contents.
//! The host navigation server drives the same library through its HTTP
//! routes; this binary exists for maintenance and scripting.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::{delete, seed, stats};
use error::CliError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "charttiles")]
#[command(version = charttiles::VERSION)]
#[command(about = "Chart tile cache maintenance", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "charttiles.json", global = true)]
    config: PathBuf,

    /// Skip logging setup (quieter output for scripting)
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pre-populate a provider's cache for a region
    Seed(seed::SeedArgs),

    /// Delete cached tiles within a region
    Delete(delete::DeleteArgs),

    /// Show cache statistics per provider
    Stats,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _guard = if cli.quiet {
        None
    } else {
        match charttiles::logging::init_logging(
            charttiles::logging::LOG_DIR,
            charttiles::logging::LOG_FILE,
        ) {
            Ok(guard) => Some(guard),
            Err(e) => CliError::LoggingInit(e.to_string()).exit(),
        }
    };

    let result = match cli.command {
        Commands::Seed(args) => seed::run(cli.config, args).await,
        Commands::Delete(args) => delete::run(cli.config, args).await,
        Commands::Stats => stats::run(cli.config),
    };

    if let Err(e) = result {
        e.exit();
    }
}
