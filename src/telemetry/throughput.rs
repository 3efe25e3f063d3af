//! Throughput Tracking
//!
//! Turns the producer's per-worker task-done counters into tasks per
//! second by diffing each cycle against a running baseline.
//!
//! Known limitation: deltas use plain wrapping `u64` arithmetic. If the
//! producer resets a counter below our baseline, or a counter wraps, the
//! next cycle reports an enormous rate for that worker. Nothing detects or
//! corrects this.

use super::layout::{read_u64, RegionLayout};
use crate::config::RefreshDelay;

/// Rate for one non-idle worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerRate {
    pub worker_id: u64,
    pub tasks_per_sec: u64,
}

/// Result of one sampling cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThroughputReport {
    /// Non-idle workers in producer slot order
    pub workers: Vec<WorkerRate>,
    pub total_per_sec: u64,
}

/// Per-slot baseline of the task-done counter.
///
/// Keyed by slot rather than by the worker id stored in the record, since
/// unused slots typically all carry id 0.
#[derive(Debug, Clone)]
pub struct ThroughputAggregator {
    layout: RegionLayout,
    baseline: Vec<u64>,
}

impl ThroughputAggregator {
    /// Seed the baseline from the live counters so the first cycle shows
    /// every worker idle, however long the producer has been running.
    pub fn seed(layout: RegionLayout, histories: &[u8]) -> Self {
        let baseline = counters(&layout, histories)
            .map(|(_, count)| count)
            .collect();
        Self { layout, baseline }
    }

    /// Diff the live counters against the baseline and advance it.
    pub fn sample(&mut self, histories: &[u8], interval: RefreshDelay) -> ThroughputReport {
        let secs = interval.as_secs();
        let mut report = ThroughputReport::default();

        for (slot, (worker_id, count)) in counters(&self.layout, histories).enumerate() {
            let Some(last) = self.baseline.get_mut(slot) else {
                break;
            };
            let delta = count.wrapping_sub(*last);
            *last = count;

            if delta == 0 {
                continue;
            }

            let tasks_per_sec = delta / secs;
            report.workers.push(WorkerRate {
                worker_id,
                tasks_per_sec,
            });
            report.total_per_sec = report.total_per_sec.wrapping_add(tasks_per_sec);
        }

        report
    }
}

/// (worker id, task-done count) for every worker record in the table.
fn counters<'a>(
    layout: &'a RegionLayout,
    histories: &'a [u8],
) -> impl Iterator<Item = (u64, u64)> + 'a {
    histories
        .chunks_exact(layout.history_record_size())
        .take(layout.max_workers)
        .map(move |record| {
            (
                read_u64(record, 0),
                read_u64(record, layout.task_done_offset()),
            )
        })
}
