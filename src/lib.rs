//! arbiter: coding-agent benchmark harness.
//!
//! Measures and scores autonomous coding agents working against local
//! workspaces. Agents signal their phases through the filesystem: creating
//! `start_signal.json` ends the thinking phase, deleting it ends the
//! writing phase. A polling watcher turns that activity into events, a
//! timing state machine turns events into durations, and a pure scoring
//! engine combines timing with external static-analysis results into a
//! weighted composite score.

pub mod analysis;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod sampler;
pub mod scoring;
pub mod telemetry;
pub mod tracker;
pub mod watcher;
pub mod workspace;
