// SPDX-License-Identifier: Apache-2.0

//! CPU load sampling around a measured operation.
//!
//! [`CpuSampler::measure`] runs a closure on the calling thread while a
//! background thread periodically samples aggregate CPU tick counters.
//! Each sample after the first yields `1 - idleDelta / totalDelta`. The
//! stop signal is the sampler channel itself: dropping the sender wakes the
//! worker out of its `recv_timeout` sleep, and the worker hands its sample
//! vector back through the join handle, so there is no shared mutable flag.
//!
//! A summary is only produced when at least one load sample was collected.
//! Work that finishes inside the first sampling interval reports `None`
//! rather than a misleading zero load.

use std::fs;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Sampling interval between tick reads.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
/// A sample above this load counts towards the full-load fraction.
const FULL_LOAD_THRESHOLD: f64 = 0.9;

/// One reading of the aggregate CPU tick counters.
///
/// `idle` includes I/O-wait ticks; `total` is the sum of all tick kinds
/// across all cores. Both are monotonically increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTicks {
    pub idle: u64,
    pub total: u64,
}

/// Source of CPU tick readings. Implemented by `/proc/stat` in production
/// and by scripted sequences in tests.
pub trait TickSource: Send {
    /// Read the current counters. `None` means the source is unavailable
    /// and sampling should stop.
    fn ticks(&mut self) -> Option<CpuTicks>;
}

/// Tick source reading the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Default)]
pub struct ProcStatTicks;

impl TickSource for ProcStatTicks {
    fn ticks(&mut self) -> Option<CpuTicks> {
        let stat = fs::read_to_string("/proc/stat").ok()?;
        parse_proc_stat(&stat)
    }
}

fn parse_proc_stat(stat: &str) -> Option<CpuTicks> {
    let line = stat.lines().find(|line| line.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map_while(|field| field.parse().ok())
        .collect();
    // user nice system idle iowait irq softirq steal [guest guest_nice]
    if fields.len() < 5 {
        return None;
    }
    Some(CpuTicks {
        idle: fields[3] + fields[4],
        total: fields.iter().sum(),
    })
}

/// Load between two consecutive tick readings, or `None` when the counters
/// did not advance.
pub fn load_between(prev: CpuTicks, cur: CpuTicks) -> Option<f64> {
    let total_delta = cur.total.checked_sub(prev.total)?;
    if total_delta == 0 {
        return None;
    }
    let idle_delta = cur.idle.saturating_sub(prev.idle);
    Some(1.0 - idle_delta as f64 / total_delta as f64)
}

/// Summary of the load samples collected over one measured window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSummary {
    /// Arithmetic mean of all load samples, in `[0, 1]`.
    pub average_load: f64,
    /// Fraction of samples above the full-load threshold, in `[0, 1]`.
    pub full_load_fraction: f64,
}

/// Periodic background CPU sampler.
pub struct CpuSampler {
    interval: Duration,
    full_load_threshold: f64,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self {
            interval: SAMPLE_INTERVAL,
            full_load_threshold: FULL_LOAD_THRESHOLD,
        }
    }

    /// Sampler with a custom interval. Tests use a short interval so
    /// measured closures do not need to sleep for whole seconds.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            full_load_threshold: FULL_LOAD_THRESHOLD,
        }
    }

    /// Run `work` on the calling thread while sampling `source` in the
    /// background, then stop and join the sampler.
    ///
    /// Sampling never aborts `work`; a panicking or unavailable source
    /// simply yields no summary.
    pub fn measure<T, S, F>(&self, mut source: S, work: F) -> (T, Option<CpuSummary>)
    where
        S: TickSource + 'static,
        F: FnOnce() -> T,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let interval = self.interval;

        let worker = thread::spawn(move || {
            let mut loads = Vec::new();
            let mut prev: Option<CpuTicks> = None;
            loop {
                let Some(cur) = source.ticks() else {
                    break;
                };
                if let Some(prev) = prev {
                    if let Some(load) = load_between(prev, cur) {
                        loads.push(load);
                    }
                }
                prev = Some(cur);

                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            }
            loads
        });

        let result = work();

        // Dropping the sender wakes the worker immediately, so the join is
        // bounded by one tick read.
        drop(stop_tx);
        let loads = worker.join().unwrap_or_default();

        (result, self.summarize(&loads))
    }

    fn summarize(&self, loads: &[f64]) -> Option<CpuSummary> {
        if loads.is_empty() {
            return None;
        }
        let average_load = loads.iter().sum::<f64>() / loads.len() as f64;
        let full = loads
            .iter()
            .filter(|&&load| load > self.full_load_threshold)
            .count();
        Some(CpuSummary {
            average_load,
            full_load_fraction: full as f64 / loads.len() as f64,
        })
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}
