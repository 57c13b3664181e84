//! Status command: read back each workspace's `status.json` and point at
//! the latest run report.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::BenchConfig;
use crate::report;
use crate::report::status;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = BenchConfig::load(config_path.as_deref())?;

    println!();
    println!("{}", "Status".bold());
    println!("{}", "─".repeat(60).dimmed());

    if config.targets.is_empty() {
        println!("  {}", "No targets configured.".dimmed());
    }

    for target in &config.targets {
        match status::read(&target.dir) {
            Ok(Some(s)) => {
                let time = s
                    .total_millis
                    .map(|ms| format!("{:.1}s", ms as f64 / 1000.0))
                    .unwrap_or_else(|| "—".to_string());
                let score = s
                    .total_score
                    .map(|score| format!("{score:.1}"))
                    .unwrap_or_else(|| "—".to_string());
                let state = if s.status == "completed" {
                    s.status.bright_green()
                } else if s.status == "pending" {
                    s.status.yellow()
                } else {
                    s.status.red()
                };
                println!(
                    "  {:<14} {state:<12} total {time:>7}   score {score:>5}   saves {} retries {} errors {}",
                    target.name.bold(),
                    s.saves,
                    s.retries,
                    s.errors,
                );
            }
            Ok(None) => {
                println!("  {:<14} {}", target.name.bold(), "no data yet".dimmed());
            }
            Err(err) => {
                println!("  {:<14} {}", target.name.bold(), format!("unreadable: {err}").red());
            }
        }
    }

    if let Some(path) = report::latest(&config.logs_dir) {
        println!();
        println!("  {} {}", "latest report:".dimmed(), path.display());
    }
    println!();

    Ok(())
}
