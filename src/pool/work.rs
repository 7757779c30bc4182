//! Work units and the work-function seam
//!
//! A unit is one file (or chunk file) assigned to exactly one worker. The
//! calling command supplies the processing logic as a [`UnitWork`]
//! implementation; the framework never looks inside it. Workers talk back to
//! the supervisor through a [`WorkerHandle`]: progress updates and log lines
//! flow out-of-band and never block the worker on the UI.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::export::FailingRecord;
use crate::logs::LogChannel;
use crate::slot::{JobProgress, Severity};
use crate::totals::Totals;

/// One file or record batch, assigned to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub path: PathBuf,
}

impl WorkUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Result of one successfully processed unit.
#[derive(Debug, Clone)]
pub struct UnitReport<T> {
    pub totals: T,
    pub failing: Vec<FailingRecord>,
}

impl<T> UnitReport<T> {
    pub fn new(totals: T) -> Self {
        Self {
            totals,
            failing: Vec::new(),
        }
    }

    pub fn with_failing(mut self, failing: Vec<FailingRecord>) -> Self {
        self.failing = failing;
        self
    }
}

/// A unit that could not be processed. Recorded and counted; never aborts
/// the pool.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct UnitError {
    pub message: String,
    pub failing: Vec<FailingRecord>,
}

impl UnitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            failing: Vec::new(),
        }
    }

    pub fn with_failing(mut self, failing: Vec<FailingRecord>) -> Self {
        self.failing = failing;
        self
    }
}

/// Collaborator-supplied processing logic, invoked once per unit inside a
/// worker.
#[async_trait]
pub trait UnitWork: Send + Sync + 'static {
    type Totals: Totals;

    async fn run(
        &self,
        unit: WorkUnit,
        handle: WorkerHandle<Self::Totals>,
    ) -> Result<UnitReport<Self::Totals>, UnitError>;
}

/// Messages a worker sends to the supervisor.
#[derive(Debug)]
pub(crate) enum PoolEvent<T> {
    Progress {
        worker: usize,
        progress: JobProgress,
    },
    Log {
        worker: usize,
        channel: LogChannel,
        severity: Severity,
        line: String,
    },
    Done {
        worker: usize,
        result: Result<UnitReport<T>, UnitError>,
    },
}

/// A worker's out-of-band channel back to the supervisor.
///
/// Cheap to clone; sends never block (the supervisor drains its event queue
/// even while the dashboard is paused). Sends after pool shutdown are
/// silently dropped.
#[derive(Debug)]
pub struct WorkerHandle<T> {
    worker: usize,
    events: UnboundedSender<PoolEvent<T>>,
}

impl<T> Clone for WorkerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            worker: self.worker,
            events: self.events.clone(),
        }
    }
}

impl<T> WorkerHandle<T> {
    pub(crate) fn new(worker: usize, events: UnboundedSender<PoolEvent<T>>) -> Self {
        Self { worker, events }
    }

    pub fn worker_id(&self) -> usize {
        self.worker
    }

    /// Report unit progress: `processed` so far out of `total` when known.
    pub fn progress(&self, processed: u64, total: Option<u64>) {
        let _ = self.events.send(PoolEvent::Progress {
            worker: self.worker,
            progress: JobProgress::new(processed, total),
        });
    }

    pub fn info(&self, line: impl Into<String>) {
        self.log(Severity::Info, line);
    }

    pub fn warn(&self, line: impl Into<String>) {
        self.log(Severity::Warn, line);
    }

    pub fn error(&self, line: impl Into<String>) {
        self.log(Severity::Error, line);
    }

    /// A line captured from a subprocess's stdout.
    pub fn stdout_line(&self, line: impl Into<String>) {
        let _ = self.events.send(PoolEvent::Log {
            worker: self.worker,
            channel: LogChannel::Stdout,
            severity: Severity::Info,
            line: line.into(),
        });
    }

    /// A line captured from a subprocess's stderr.
    pub fn stderr_line(&self, line: impl Into<String>) {
        let _ = self.events.send(PoolEvent::Log {
            worker: self.worker,
            channel: LogChannel::Stderr,
            severity: Severity::Error,
            line: line.into(),
        });
    }

    fn log(&self, severity: Severity, line: impl Into<String>) {
        let _ = self.events.send(PoolEvent::Log {
            worker: self.worker,
            channel: LogChannel::Structured,
            severity,
            line: line.into(),
        });
    }
}
