//! Full benchmark run: several targets racing, ranking, and the JSON
//! run report.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use arbiter::config::{BenchConfig, TargetConfig, ANALYSIS_FILE, SIGNAL_FILE, TASK_INPUT_FILE};
use arbiter::models::session::TerminalReason;
use arbiter::orchestrator;
use arbiter::report;
use std::sync::Arc;

fn scripted_agent(workspace: PathBuf, think_ms: u64, write_ms: u64) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(think_ms));
        fs::write(workspace.join(SIGNAL_FILE), "{}").unwrap();

        thread::sleep(Duration::from_millis(write_ms));
        fs::write(workspace.join("main.py"), "class App: pass").unwrap();
        fs::write(
            workspace.join(ANALYSIS_FILE),
            r#"{"architecture": "oop", "complexity_score": 20.0}"#,
        )
        .unwrap();
        fs::remove_file(workspace.join(SIGNAL_FILE)).unwrap();
    })
}

#[test]
fn test_two_agent_run_ranks_the_faster_one_first() {
    let temp_dir = TempDir::new().unwrap();
    let fast_dir = temp_dir.path().join("fast");
    let slow_dir = temp_dir.path().join("slow");
    let logs_dir = temp_dir.path().join("logs");

    let config = Arc::new(BenchConfig {
        poll_interval_ms: 20,
        sample_interval_secs: 0.05,
        timeout_secs: 30,
        logs_dir: logs_dir.clone(),
        targets: vec![
            TargetConfig {
                name: "fast".to_string(),
                dir: fast_dir.clone(),
                source_file: "main.py".to_string(),
            },
            TargetConfig {
                name: "slow".to_string(),
                dir: slow_dir.clone(),
                source_file: "main.py".to_string(),
            },
        ],
        ..Default::default()
    });

    let run = orchestrator::start(Arc::clone(&config), "Write an app").unwrap();

    // Workspaces were prepared before any watcher started.
    assert_eq!(
        fs::read_to_string(fast_dir.join(TASK_INPUT_FILE)).unwrap(),
        "Write an app"
    );

    let fast_agent = scripted_agent(fast_dir, 250, 250);
    let slow_agent = scripted_agent(slow_dir, 700, 900);

    let mut reports = run.join();
    fast_agent.join().unwrap();
    slow_agent.join().unwrap();

    assert_eq!(reports.len(), 2);
    for r in &reports {
        assert_eq!(r.reason, TerminalReason::Completed, "agent {}", r.agent);
    }

    report::rank(&mut reports);
    assert_eq!(reports[0].agent, "fast");
    assert_eq!(reports[0].rank, 1);
    assert_eq!(reports[1].agent, "slow");
    assert_eq!(reports[1].rank, 2);
    assert!(reports[0].score.total > reports[1].score.total);

    let path = report::save(&reports, "Write an app", &config.scoring, &logs_dir).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"winner\": \"fast\""));
    assert_eq!(report::latest(&logs_dir).unwrap(), path);
}

#[test]
fn test_prepare_cleans_stale_workspace_state() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("agent-a");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("leftover.py"), "x = 1").unwrap();
    fs::write(dir.join(SIGNAL_FILE), "{}").unwrap();

    let config = Arc::new(BenchConfig {
        poll_interval_ms: 20,
        timeout_secs: 1,
        targets: vec![TargetConfig {
            name: "agent-a".to_string(),
            dir: dir.clone(),
            source_file: "main.py".to_string(),
        }],
        ..Default::default()
    });

    let run = orchestrator::start(Arc::clone(&config), "prompt").unwrap();

    // The stale artifact was removed before the watcher's baseline, so the
    // session does not mistake it for agent activity.
    assert!(!dir.join("leftover.py").exists());

    let reports = run.join();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].reason, TerminalReason::TimedOut);
}
