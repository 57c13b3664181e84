//! Workspace contract.
//!
//! One directory per session is the wire format between the benchmarked
//! agent and the core: the prompt goes in as `task_input.txt`, the agent
//! creates and deletes `start_signal.json` around its writing phase, and
//! the orchestrator maintains `status.json`. Everything here runs before
//! the watcher starts; after that the workspace is read-only to us.

use anyhow::{Context, Result};
use glob::glob;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::config::{BenchConfig, TargetConfig, SIGNAL_FILE, TASK_INPUT_FILE};
use crate::report::status::{self, WorkspaceStatus};

/// Verify the workspace is writable by round-tripping a probe file.
pub fn check_write_permission(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create workspace {}", dir.display()))?;

    let probe = dir.join(".arbiter_write_test");
    fs::write(&probe, "write_permission_test")
        .with_context(|| format!("No write permission in {}", dir.display()))?;
    fs::remove_file(&probe)
        .with_context(|| format!("Failed to remove probe file {}", probe.display()))?;

    Ok(())
}

/// Remove stale source files and any leftover signal artifact from a
/// previous run. Must complete before the watcher starts, otherwise a
/// slow-starting agent races against the cleanup.
pub fn clean_stale_files(dir: &Path, extensions: &[String]) -> Result<usize> {
    let mut removed = 0;

    for ext in extensions {
        let pattern = dir.join(format!("*.{ext}"));
        let Some(pattern) = pattern.to_str().map(String::from) else {
            continue;
        };
        for entry in glob(&pattern).context("Invalid cleanup pattern")?.flatten() {
            match fs::remove_file(&entry) {
                Ok(()) => removed += 1,
                Err(err) => warn!(path = %entry.display(), %err, "failed to remove stale file"),
            }
        }
    }

    let signal = dir.join(SIGNAL_FILE);
    if signal.exists() {
        fs::remove_file(&signal)
            .with_context(|| format!("Failed to remove stale signal artifact {}", signal.display()))?;
        removed += 1;
    }

    Ok(removed)
}

/// Deliver the prompt and seed the status file.
pub fn distribute_prompt(target: &TargetConfig, prompt: &str) -> Result<()> {
    fs::write(target.dir.join(TASK_INPUT_FILE), prompt)
        .with_context(|| format!("Failed to write prompt to {}", target.dir.display()))?;

    status::write(&target.dir, &WorkspaceStatus::pending(&target.name))?;
    Ok(())
}

/// Full pre-flight for one target: permission check, optional cleanup,
/// prompt distribution.
pub fn prepare(target: &TargetConfig, prompt: &str, config: &BenchConfig) -> Result<()> {
    check_write_permission(&target.dir)?;

    if config.clean_before_start {
        let removed = clean_stale_files(&target.dir, &config.watched_extensions)?;
        if removed > 0 {
            info!(agent = %target.name, removed, "cleaned stale files");
        }
    }

    distribute_prompt(target, prompt)?;
    info!(agent = %target.name, dir = %target.dir.display(), "workspace prepared");
    Ok(())
}
