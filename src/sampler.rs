//! Best-effort CPU/memory sampling for diagnostic reporting.
//!
//! Runs on its own schedule, independent of the timing tracker's state:
//! started with the session, stopped when the session reaches any terminal
//! state. Samples never affect the score or the session outcome; failures
//! are recorded as a gap count, not escalated.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use sysinfo::System;
use tracing::debug;

/// One utilization observation, offset from session start.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResourceSample {
    pub offset_millis: u64,
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

struct Shared {
    samples: Mutex<Vec<ResourceSample>>,
    gaps: AtomicU32,
    stop: AtomicBool,
}

/// Producer task appending to an append-only buffer; readers get a
/// snapshot, never a live view, so there is no ordering question between
/// sampling writes and report reads.
pub struct ResourceSampler {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl ResourceSampler {
    /// Start sampling every `interval` until [`stop`](Self::stop).
    pub fn start(interval: Duration, session_start: Instant) -> Self {
        let shared = Arc::new(Shared {
            samples: Mutex::new(Vec::new()),
            gaps: AtomicU32::new(0),
            stop: AtomicBool::new(false),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            let mut system = System::new_all();

            while !worker.stop.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if worker.stop.load(Ordering::SeqCst) {
                    break;
                }

                system.refresh_cpu_usage();
                system.refresh_memory();

                match sample_from(&system, session_start) {
                    Some(sample) => {
                        if let Ok(mut samples) = worker.samples.lock() {
                            samples.push(sample);
                        } else {
                            worker.gaps.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    None => {
                        worker.gaps.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        });

        debug!(interval_ms = interval.as_millis() as u64, "resource sampler started");
        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Stop the background thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Snapshot of all samples collected so far.
    pub fn samples(&self) -> Vec<ResourceSample> {
        self.shared
            .samples
            .lock()
            .map(|samples| samples.clone())
            .unwrap_or_default()
    }

    /// Intervals where sampling failed.
    pub fn gap_count(&self) -> u32 {
        self.shared.gaps.load(Ordering::SeqCst)
    }
}

impl Drop for ResourceSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sample_from(system: &System, session_start: Instant) -> Option<ResourceSample> {
    let cpus = system.cpus();
    if cpus.is_empty() {
        return None;
    }
    let cpu_percent = cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / cpus.len() as f32;
    let used_bytes = system.total_memory().saturating_sub(system.available_memory());
    let memory_mb = used_bytes as f64 / (1024.0 * 1024.0);

    Some(ResourceSample {
        offset_millis: Instant::now()
            .saturating_duration_since(session_start)
            .as_millis() as u64,
        cpu_percent,
        memory_mb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_samples_until_stopped() {
        let mut sampler = ResourceSampler::start(Duration::from_millis(30), Instant::now());
        thread::sleep(Duration::from_millis(200));
        sampler.stop();

        let samples = sampler.samples();
        assert!(!samples.is_empty());

        // Append-only: offsets are non-decreasing.
        for pair in samples.windows(2) {
            assert!(pair[0].offset_millis <= pair[1].offset_millis);
        }
    }

    #[test]
    fn test_no_samples_appended_after_stop() {
        let mut sampler = ResourceSampler::start(Duration::from_millis(20), Instant::now());
        thread::sleep(Duration::from_millis(100));
        sampler.stop();

        let before = sampler.samples().len();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(sampler.samples().len(), before);
    }

    #[test]
    fn test_snapshot_is_detached_from_buffer() {
        let mut sampler = ResourceSampler::start(Duration::from_millis(20), Instant::now());
        let snapshot = sampler.samples();
        thread::sleep(Duration::from_millis(100));
        // The earlier snapshot does not grow behind the reader's back.
        assert!(snapshot.len() <= sampler.samples().len());
        sampler.stop();
    }
}
