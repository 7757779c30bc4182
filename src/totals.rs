//! Command-specific aggregates
//!
//! The framework treats a command's running totals as opaque: it merges them
//! per completed unit and hands them back in the context snapshot and the
//! final summary. The one thing the estimator needs to know is whether the
//! totals sum to a job count: check-style commands that only tally pending
//! or conflicting records return `None` and get no ETA.

/// Per-command aggregate merged across completed units.
pub trait Totals: Default + Clone + Send + Sync + 'static {
    /// Fold another unit's totals into this aggregate.
    fn merge(&mut self, other: &Self);

    /// Sum of the numeric job counters, when the totals are numeric-summable.
    fn job_sum(&self) -> Option<u64>;

    /// Command-specific lines rendered under the shared header.
    fn summary_lines(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Stock aggregate for upload-style commands: per-record success, error, and
/// skipped counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordTotals {
    pub success: u64,
    pub error: u64,
    pub skipped: u64,
}

impl Totals for RecordTotals {
    fn merge(&mut self, other: &Self) {
        self.success += other.success;
        self.error += other.error;
        self.skipped += other.skipped;
    }

    fn job_sum(&self) -> Option<u64> {
        Some(self.success + self.error + self.skipped)
    }

    fn summary_lines(&self) -> Vec<String> {
        vec![format!(
            "Records: {} ok · {} failed · {} skipped",
            self.success, self.error, self.skipped
        )]
    }
}
