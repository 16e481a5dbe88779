use std::path::PathBuf;

use anyhow::{Context, Result};
use autoprint_core::ServiceConfig;
use autoprint_core::config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;

/// Prints PDF documents dropped into watched directories.
#[derive(Debug, Parser)]
#[command(name = "autoprint", version)]
struct Cli {
    /// Service configuration file; defaults apply when it does not exist.
    #[arg(long = "config", value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory holding directories.json and excluded_files.json.
    #[arg(long = "state-dir", value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Directory files are copied into before printing.
    #[arg(long = "work-dir", value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long = "log-level", value_name = "FILTER", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a directory to watch.
    Add(AddArgs),
    /// List registered directories.
    List,
    /// List file names that will not be printed again.
    Excluded,
    /// Mark a directory active so `run` schedules it.
    Start { id: Uuid },
    /// Mark a directory inactive.
    Stop { id: Uuid },
    /// Run a single pass over a directory now.
    Scan { id: Uuid },
    /// Schedule every active directory until interrupted.
    Run,
}

#[derive(Debug, Parser)]
struct AddArgs {
    /// Printer name passed to the print utility.
    #[arg(long = "printer", value_name = "NAME")]
    printer: String,

    /// Directory to watch.
    #[arg(long = "dir", value_name = "DIR")]
    dir: PathBuf,

    /// Comma-separated words; a file is printed if its name contains one.
    #[arg(long = "words", value_name = "A,B")]
    words: String,
}

impl Cli {
    fn service_config(&self) -> Result<ServiceConfig> {
        let mut config = ServiceConfig::load(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;

        if let Some(dir) = &self.state_dir {
            config = config.with_state_dir(dir);
        }
        if let Some(dir) = &self.work_dir {
            config = config.with_work_dir(dir);
        }
        Ok(config)
    }
}

fn setup_tracing(default_filter: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli.log_level);
    let config = cli.service_config()?;

    match cli.command {
        Command::Add(args) => commands::add(&config, args.printer, args.dir, &args.words).await,
        Command::List => commands::list(&config).await,
        Command::Excluded => commands::excluded(&config).await,
        Command::Start { id } => commands::set_active(&config, id, true).await,
        Command::Stop { id } => commands::set_active(&config, id, false).await,
        Command::Scan { id } => commands::scan(&config, id).await,
        Command::Run => commands::run(&config).await,
    }
}
