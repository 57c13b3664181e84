//! Run command: prepare workspaces, watch the agents, score, report.

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::commands::dashboard::Dashboard;
use crate::config::{BenchConfig, TargetConfig, SIGNAL_FILE, TASK_INPUT_FILE};
use crate::models::report::SessionReport;
use crate::orchestrator;
use crate::report;

pub struct RunArgs {
    pub prompt: String,
    pub timeout: Option<u64>,
    pub no_clean: bool,
    pub no_dashboard: bool,
    pub workspace: Option<PathBuf>,
    pub source_file: String,
    pub config: Option<PathBuf>,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let mut config = BenchConfig::load(args.config.as_deref())?;

    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if args.no_clean {
        config.clean_before_start = false;
    }
    if let Some(dir) = args.workspace {
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("agent")
            .to_string();
        config.targets = vec![TargetConfig {
            name,
            dir,
            source_file: args.source_file.clone(),
        }];
    }

    print_header(&config);

    let config = Arc::new(config);
    let run = orchestrator::start(Arc::clone(&config), &args.prompt)?;

    let use_dashboard = !args.no_dashboard && std::io::stdout().is_terminal();
    if use_dashboard {
        let mut dashboard = Dashboard::new(config.timeout())?;
        let result = dashboard.run(&run);
        dashboard.restore();
        result?;
    } else {
        plain_wait(&run)?;
    }

    let mut reports = run.join();
    report::rank(&mut reports);

    let report_path = report::save(&reports, &args.prompt, &config.scoring, &config.logs_dir)?;

    print_results(&reports);
    println!("  {} {}", "report:".dimmed(), report_path.display());
    println!();

    Ok(())
}

fn print_header(config: &BenchConfig) {
    println!();
    println!("{}", "arbiter".bold());
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  protocol: create {} → write code → delete {}",
        SIGNAL_FILE.bold(),
        SIGNAL_FILE.bold()
    );
    println!(
        "  prompt file: {}   timeout: {}s   poll: {}ms",
        TASK_INPUT_FILE,
        config.timeout_secs,
        config.poll_interval_ms
    );
    println!();
}

/// Headless wait: Ctrl+C requests a stop, sessions wind down on their own.
fn plain_wait(run: &orchestrator::BenchmarkRun) -> Result<()> {
    let stop = Arc::clone(&run.stop);
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .context("Failed to install interrupt handler")?;

    while !run.finished() {
        thread::sleep(Duration::from_millis(200));
    }
    Ok(())
}

fn print_results(reports: &[SessionReport]) {
    println!();
    println!("{}", "Results".bold());
    println!("{}", "─".repeat(60).dimmed());

    for report in reports {
        let line = format!(
            "{:>2}. {:<14} {:>6.1}   speed {:>5.1} │ arch {:>5.1} │ errors {:>5.1} │ libs {:>5.1}   {:>7} {}",
            report.rank,
            report.agent,
            report.score.total,
            report.score.speed,
            report.score.architecture,
            report.score.error,
            report.score.library,
            format!("{:.1}s", report.timing.total_seconds()),
            report.reason,
        );
        if report.rank == 1 && !report.reason.is_failure() {
            println!("  {}", line.bright_green());
        } else if report.reason.is_failure() {
            println!("  {}", line.red());
        } else {
            println!("  {line}");
        }
    }

    if let Some(winner) = report::winner(reports) {
        println!();
        println!(
            "  {} {} ({:.1})",
            "winner:".bold(),
            winner.agent.bright_green().bold(),
            winner.score.total
        );
    }
}
