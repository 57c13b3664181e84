use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use arbiter::commands;
use arbiter::commands::run::RunArgs;
use arbiter::config::BenchConfig;

#[derive(Parser)]
#[command(name = "arbiter", version, about = "Coding-agent benchmark harness")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Distribute a prompt, watch the agents, score the results
    Run {
        /// Prompt text delivered to every target workspace
        prompt: String,
        /// Session timeout in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,
        /// Keep stale source files and signal artifacts
        #[arg(long)]
        no_clean: bool,
        /// Plain console output instead of the live dashboard
        #[arg(long)]
        no_dashboard: bool,
        /// Benchmark a single ad-hoc workspace instead of configured targets
        #[arg(long)]
        workspace: Option<PathBuf>,
        /// Expected source file for an ad-hoc workspace
        #[arg(long, default_value = "main.py")]
        source_file: String,
        /// Config file path (default: arbiter.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show per-workspace status from the last run
    Status {
        /// Config file path (default: arbiter.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = dispatch(cli) {
        eprintln!("{} {err:#}", "error:".bright_red().bold());
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            prompt,
            timeout,
            no_clean,
            no_dashboard,
            workspace,
            source_file,
            config,
        } => {
            init_tracing(config.as_deref())?;
            commands::run::execute(RunArgs {
                prompt,
                timeout,
                no_clean,
                no_dashboard,
                workspace,
                source_file,
                config,
            })
        }
        Commands::Status { config } => commands::status::execute(config),
    }
}

/// Log to a timestamped file under the configured logs directory. The
/// terminal stays clean for the dashboard; `RUST_LOG` controls verbosity.
fn init_tracing(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = BenchConfig::load(config_path)?;
    std::fs::create_dir_all(&config.logs_dir)
        .with_context(|| format!("Failed to create {}", config.logs_dir.display()))?;

    let log_path = config.logs_dir.join(format!(
        "arbiter_{}.log",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    ));
    let log_file = File::create(&log_path)
        .with_context(|| format!("Failed to create {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}
