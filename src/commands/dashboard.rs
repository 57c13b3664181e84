//! Live run dashboard.
//!
//! A small ratatui table refreshed while sessions run: one row per agent
//! with its phase, timing so far, and telemetry counters. `q` (or Ctrl+C)
//! asks the run to stop; the dashboard exits on its own once every session
//! reaches a terminal state.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table},
    Terminal,
};

use crate::models::session::TerminalReason;
use crate::orchestrator::{AgentProgress, BenchmarkRun};
use crate::tracker::TrackerState;

/// Poll timeout for the event loop.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct Dashboard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    spinner_frame: usize,
    started: Instant,
    timeout: Duration,
}

impl Dashboard {
    pub fn new(timeout: Duration) -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend).context("Failed to create terminal")?;

        Ok(Self {
            terminal,
            spinner_frame: 0,
            started: Instant::now(),
            timeout,
        })
    }

    /// Drive the dashboard until the run finishes or the user aborts.
    pub fn run(&mut self, run: &BenchmarkRun) -> Result<()> {
        loop {
            self.render(run)?;

            if event::poll(POLL_TIMEOUT)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        let ctrl_c = key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL);
                        if key.code == KeyCode::Char('q') || ctrl_c {
                            run.request_stop();
                        }
                    }
                }
            }

            if run.finished() {
                self.render(run)?;
                break;
            }

            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
        Ok(())
    }

    fn render(&mut self, run: &BenchmarkRun) -> Result<()> {
        let rows: Vec<AgentProgress> = run
            .board
            .lock()
            .map(|board| board.values().cloned().collect())
            .unwrap_or_default();

        let spinner = SPINNER_FRAMES[self.spinner_frame];
        let elapsed = self.started.elapsed().as_secs();
        let timeout = self.timeout.as_secs();

        self.terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Min(4),
                    Constraint::Length(1),
                ])
                .split(frame.area());

            let header = Line::from(vec![
                Span::styled(
                    format!("{spinner} arbiter"),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("  {elapsed}s / {timeout}s")),
            ]);
            frame.render_widget(Paragraph::new(header), chunks[0]);

            let table_rows: Vec<Row> = rows.iter().map(progress_row).collect();
            let table = Table::new(
                table_rows,
                [
                    Constraint::Length(16),
                    Constraint::Length(16),
                    Constraint::Length(10),
                    Constraint::Length(10),
                    Constraint::Length(10),
                    Constraint::Length(7),
                    Constraint::Length(9),
                    Constraint::Length(8),
                ],
            )
            .header(
                Row::new(vec![
                    "Agent", "Phase", "Thinking", "Writing", "Total", "Saves", "Retries", "Errors",
                ])
                .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().borders(Borders::ALL).title(" sessions "));
            frame.render_widget(table, chunks[1]);

            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    " q: abort run",
                    Style::default().fg(Color::DarkGray),
                ))),
                chunks[2],
            );
        })?;

        Ok(())
    }

    /// Restore the terminal. Called on drop as well, so an early error
    /// still leaves the shell usable.
    pub fn restore(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.restore();
    }
}

fn progress_row(progress: &AgentProgress) -> Row<'static> {
    let (phase, color) = phase_cell(progress);
    Row::new(vec![
        progress.agent.clone(),
        phase,
        format_millis(progress.timing.thinking_millis),
        format_millis(progress.timing.writing_millis),
        format_millis(progress.timing.total_millis),
        progress.telemetry.saves.to_string(),
        progress.telemetry.retries.to_string(),
        progress.telemetry.errors.to_string(),
    ])
    .style(Style::default().fg(color))
}

fn phase_cell(progress: &AgentProgress) -> (String, Color) {
    match progress.reason {
        Some(TerminalReason::Completed) => ("completed".to_string(), Color::Green),
        Some(reason) => (reason.to_string(), Color::Red),
        None => match progress.state {
            TrackerState::AwaitingSignal => ("thinking".to_string(), Color::Yellow),
            TrackerState::Writing => ("writing".to_string(), Color::Cyan),
            TrackerState::Completed => ("completed".to_string(), Color::Green),
            TrackerState::TimedOut => ("timed out".to_string(), Color::Red),
        },
    }
}

fn format_millis(millis: u64) -> String {
    format!("{:.1}s", millis as f64 / 1000.0)
}
