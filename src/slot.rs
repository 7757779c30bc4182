//! Worker slot records
//!
//! One `WorkerSlot` per pool worker, owned and mutated exclusively by the
//! supervisor. Renderers and the estimator see cloned snapshots only.

use std::path::PathBuf;
use std::time::Instant;

/// Outcome class of a worker's most recent message or completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Ok,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Single-character marker for worker rows and log lines.
    pub fn marker(&self) -> &'static str {
        match self {
            Severity::Ok => "·",
            Severity::Info => "i",
            Severity::Warn => "!",
            Severity::Error => "✗",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Ok => "ok",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

/// Job-specific progress reported by a work function.
///
/// `processed` is monotonically non-decreasing per unit; `total`, when known,
/// is an upper bound on `processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    pub processed: u64,
    pub total: Option<u64>,
}

impl JobProgress {
    pub fn new(processed: u64, total: Option<u64>) -> Self {
        Self { processed, total }
    }
}

/// Live state of one pool worker.
///
/// Created idle at pool start, mutated on assignment, progress messages, and
/// completion, and never destroyed until the pool exits.
#[derive(Debug, Clone, Default)]
pub struct WorkerSlot {
    pub busy: bool,
    pub file: Option<PathBuf>,
    pub started_at: Option<Instant>,
    pub last_severity: Severity,
    pub progress: Option<JobProgress>,
}

impl WorkerSlot {
    /// Assignment: the worker begins a unit.
    pub fn assign(&mut self, file: PathBuf) {
        self.busy = true;
        self.file = Some(file);
        self.started_at = Some(Instant::now());
        self.last_severity = Severity::Ok;
        self.progress = None;
    }

    /// Completion: the slot returns to idle, keeping the outcome severity.
    pub fn clear(&mut self, outcome: Severity) {
        self.busy = false;
        self.file = None;
        self.started_at = None;
        self.last_severity = outcome;
        self.progress = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_then_clear_round_trip() {
        let mut slot = WorkerSlot::default();
        assert!(!slot.busy);

        slot.assign(PathBuf::from("chunk-0007.csv"));
        assert!(slot.busy);
        assert!(slot.started_at.is_some());
        assert_eq!(slot.last_severity, Severity::Ok);

        slot.progress = Some(JobProgress::new(10, Some(40)));
        slot.clear(Severity::Error);
        assert!(!slot.busy);
        assert!(slot.file.is_none());
        assert!(slot.progress.is_none());
        assert_eq!(slot.last_severity, Severity::Error);
    }

    #[test]
    fn assignment_resets_previous_severity() {
        let mut slot = WorkerSlot::default();
        slot.last_severity = Severity::Warn;
        slot.assign(PathBuf::from("next.csv"));
        assert_eq!(slot.last_severity, Severity::Ok);
    }
}
