//! Throughput and ETA estimation
//!
//! Completion events feed a sliding-window rate counter; each repaint derives
//! jobs/sec, an estimated total job count, and an ETA from the counter, the
//! completion counters, and the busy slots' visible progress. Everything here
//! is a pure function of its inputs so renderers can be tested without a
//! running pool.

use std::time::Duration;

use crate::rate::RateCounter;
use crate::slot::WorkerSlot;

const WINDOW_10S: Duration = Duration::from_secs(10);
const WINDOW_60S: Duration = Duration::from_secs(60);

/// Rolling completion throughput, one instance per pool run.
#[derive(Debug, Default)]
pub struct Throughput {
    counter: RateCounter,
    successes: u64,
}

impl Throughput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished assignment. Failures count toward drain speed,
    /// only successes toward `success_so_far`.
    pub fn record_completion(&mut self, success: bool) {
        self.counter.add(1);
        if success {
            self.successes += 1;
        }
    }

    pub fn stats(&self) -> ThroughputStats {
        ThroughputStats {
            success_so_far: self.successes,
            r10s: self.counter.rate(WINDOW_10S),
            r60s: self.counter.rate(WINDOW_60S),
        }
    }
}

/// Snapshot of completion rates, taken once per repaint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThroughputStats {
    pub success_so_far: u64,
    /// Completions per second over the trailing 10 s.
    pub r10s: f64,
    /// Completions per second over the trailing 60 s.
    pub r60s: f64,
}

/// Derived job estimates. Fields are `None` whenever the inputs cannot
/// support them: a command without numeric-summable totals, no completed
/// files yet, or a dead 60 s window all leave the estimate undefined rather
/// than misleading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Estimate {
    pub avg_jobs_per_file: Option<f64>,
    pub estimated_total_jobs: Option<f64>,
    pub jobs_per_hour: Option<f64>,
    pub eta_seconds: Option<f64>,
}

impl Estimate {
    /// Compute estimates for one repaint.
    ///
    /// * `processed_jobs`: the command's completed-job sum (`None` when its
    ///   totals are not numeric-summable).
    /// * `slots`: the live slot snapshot; busy slots with known progress
    ///   totals contribute their full totals, since an in-flight file will
    ///   eventually deliver all of its jobs.
    pub fn compute(
        processed_jobs: Option<u64>,
        files_total: usize,
        files_completed: usize,
        slots: &[WorkerSlot],
        r60s: f64,
    ) -> Self {
        let avg_jobs_per_file = match processed_jobs {
            Some(sum) if files_completed > 0 => Some(sum as f64 / files_completed as f64),
            _ => None,
        };

        let (Some(avg), Some(processed)) = (avg_jobs_per_file, processed_jobs) else {
            return Self {
                avg_jobs_per_file,
                ..Self::default()
            };
        };

        if r60s <= 0.0 {
            return Self {
                avg_jobs_per_file,
                ..Self::default()
            };
        }

        let busy_workers = slots.iter().filter(|s| s.busy).count();
        let inflight_known_jobs: u64 = slots
            .iter()
            .filter(|s| s.busy)
            .filter_map(|s| s.progress.as_ref().and_then(|p| p.total))
            .sum();
        let remaining_files = files_total.saturating_sub(files_completed + busy_workers);

        let estimated_total_jobs =
            processed as f64 + inflight_known_jobs as f64 + remaining_files as f64 * avg;
        let jobs_per_hour = r60s * 3600.0 * avg;
        let remaining_jobs = estimated_total_jobs - processed as f64;
        let eta_seconds = remaining_jobs * 3600.0 / jobs_per_hour;

        Self {
            avg_jobs_per_file,
            estimated_total_jobs: Some(estimated_total_jobs),
            jobs_per_hour: Some(jobs_per_hour),
            eta_seconds: Some(eta_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::JobProgress;
    use std::path::PathBuf;

    fn busy_slot(processed: u64, total: Option<u64>) -> WorkerSlot {
        let mut slot = WorkerSlot::default();
        slot.assign(PathBuf::from("unit.csv"));
        slot.progress = Some(JobProgress::new(processed, total));
        slot
    }

    #[test]
    fn upload_style_estimate() {
        // 5 of 10 files done with success=10, error=3, skipped=2; two busy
        // workers whose known totals sum to 6; 60s rate of 0.5 files/sec.
        let slots = vec![
            busy_slot(1, Some(2)),
            busy_slot(2, Some(4)),
            WorkerSlot::default(),
        ];

        let est = Estimate::compute(Some(15), 10, 5, &slots, 0.5);

        assert_eq!(est.avg_jobs_per_file, Some(3.0));
        assert_eq!(est.estimated_total_jobs, Some(30.0));
        assert_eq!(est.jobs_per_hour, Some(5400.0));
        assert_eq!(est.eta_seconds, Some(10.0));
    }

    #[test]
    fn check_mode_totals_leave_estimate_undefined() {
        let slots = vec![busy_slot(3, Some(6))];
        let est = Estimate::compute(None, 10, 5, &slots, 0.5);

        assert_eq!(est.avg_jobs_per_file, None);
        assert_eq!(est.estimated_total_jobs, None);
        assert_eq!(est.eta_seconds, None);
    }

    #[test]
    fn zero_rate_never_divides() {
        let slots = vec![busy_slot(3, Some(6))];
        let est = Estimate::compute(Some(15), 10, 5, &slots, 0.0);

        assert_eq!(est.avg_jobs_per_file, Some(3.0));
        assert_eq!(est.estimated_total_jobs, None);
        assert_eq!(est.eta_seconds, None);
    }

    #[test]
    fn no_completed_files_leaves_average_undefined() {
        let est = Estimate::compute(Some(0), 10, 0, &[], 1.0);
        assert_eq!(est.avg_jobs_per_file, None);
        assert_eq!(est.eta_seconds, None);
    }

    #[test]
    fn unknown_inflight_totals_contribute_nothing() {
        let slots = vec![busy_slot(5, None), busy_slot(1, Some(4))];
        // remaining = 10 - 5 - 2 busy = 3; est = 15 + 4 + 3*3 = 28
        let est = Estimate::compute(Some(15), 10, 5, &slots, 0.5);
        assert_eq!(est.estimated_total_jobs, Some(28.0));
    }

    #[test]
    fn remaining_files_clamps_at_zero() {
        // More busy workers than arithmetic would allow must not underflow.
        let slots = vec![busy_slot(1, Some(2)), busy_slot(1, Some(2))];
        let est = Estimate::compute(Some(10), 2, 1, &slots, 1.0);
        assert_eq!(est.estimated_total_jobs, Some(14.0));
    }

    #[test]
    fn throughput_counts_failures_in_rate_only() {
        let mut tp = Throughput::new();
        tp.record_completion(true);
        tp.record_completion(false);
        tp.record_completion(true);

        let stats = tp.stats();
        assert_eq!(stats.success_so_far, 2);
        assert!(stats.r10s > 0.0);
        assert!(stats.r60s > 0.0);
    }
}
