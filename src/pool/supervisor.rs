//! Pool supervisor
//!
//! One supervising task coordinates N worker tasks. The supervisor owns the
//! work queue and the slot registry: it assigns the next queued unit to each
//! idle worker over that worker's private channel, folds completion and
//! failure events back into the counters and totals, and repaints the
//! dashboard on a timer. Keypresses arrive on a third channel and are
//! handled between events; pausing the dashboard never pauses the workers.
//!
//! Per-worker messages are processed in the order that worker sent them.
//! Nothing is guaranteed about ordering across workers.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use crossterm::event::KeyEvent;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::tty::IsTty;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dashboard::{compose_frame, DashboardContext, DashboardPlugin, Painter};
use crate::error::MillError;
use crate::estimate::Throughput;
use crate::export::{ExportManager, ExportTarget, FailingRecord};
use crate::gate::Gate;
use crate::input::{action_for_key, spawn_key_reader, Action};
use crate::logs::{LogChannel, LogEntry, LogLevel, LogStore};
use crate::pool::work::{PoolEvent, UnitError, UnitWork, WorkUnit, WorkerHandle};
use crate::recency::RecencySet;
use crate::sizing::compute_pool_size;
use crate::slot::{Severity, WorkerSlot};
use crate::totals::Totals;

/// Failing-record identifiers remembered for cross-chunk deduplication.
const FAILING_DEDUP_CAPACITY: usize = 8_192;

/// Pool configuration. Validated before any worker spawns.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub title: String,
    /// Explicit worker count; `None` auto-sizes from the core count.
    pub concurrency: Option<usize>,
    pub export_dir: PathBuf,
    pub repaint_interval: Duration,
    /// Paint frames to stdout (further gated on stdout being a tty).
    pub dashboard: bool,
    /// Handle keypresses (further gated on stdin being a tty).
    pub interactive: bool,
}

impl PoolConfig {
    pub fn new(title: impl Into<String>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            concurrency: None,
            export_dir: export_dir.into(),
            repaint_interval: Duration::from_millis(250),
            dashboard: true,
            interactive: true,
        }
    }

    pub fn with_concurrency(mut self, concurrency: Option<usize>) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_repaint_interval(mut self, interval: Duration) -> Self {
        self.repaint_interval = interval;
        self
    }

    /// No dashboard, no key handling. For tests and non-terminal runs.
    pub fn headless(mut self) -> Self {
        self.dashboard = false;
        self.interactive = false;
        self
    }

    fn validate(&self) -> Result<(), MillError> {
        if self.title.trim().is_empty() {
            return Err(MillError::invalid_config("title must not be empty"));
        }
        if self.concurrency == Some(0) {
            return Err(MillError::invalid_config(
                "concurrency must be positive when given",
            ));
        }
        Ok(())
    }
}

/// Final numeric summary, returned to the caller for exit-code decisions.
#[derive(Debug, Clone)]
pub struct PoolSummary<T> {
    pub files_total: usize,
    pub files_completed: usize,
    pub files_failed: usize,
    /// Distinct failing records collected across all units.
    pub failing_records: usize,
    pub totals: T,
    pub export_dir: PathBuf,
}

/// Run `units` through a pool of workers executing `work`, rendering the
/// dashboard through `plugin`.
///
/// Unit failures (including panicking work functions) are counted and the
/// pool keeps draining; the only error this function returns is an invalid
/// configuration.
pub async fn run_pool<W: UnitWork>(
    units: Vec<WorkUnit>,
    work: Arc<W>,
    plugin: Arc<dyn DashboardPlugin<W::Totals>>,
    config: PoolConfig,
) -> Result<PoolSummary<W::Totals>, MillError> {
    config.validate()?;

    let files_total = units.len();
    let (pool_size, cpu_count) = compute_pool_size(config.concurrency, files_total);
    if pool_size == 0 {
        debug!("no units queued, skipping pool start");
        return Ok(PoolSummary {
            files_total,
            files_completed: 0,
            files_failed: 0,
            failing_records: 0,
            totals: W::Totals::default(),
            export_dir: config.export_dir,
        });
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<PoolEvent<W::Totals>>();
    let mut unit_senders: Vec<Option<mpsc::Sender<WorkUnit>>> = Vec::with_capacity(pool_size);
    for worker in 0..pool_size {
        let (tx, rx) = mpsc::channel::<WorkUnit>(1);
        tokio::spawn(worker_loop(worker, rx, Arc::clone(&work), event_tx.clone()));
        unit_senders.push(Some(tx));
    }
    // Workers hold the only remaining event senders; recv() returns None
    // once every worker loop has exited.
    drop(event_tx);

    let paint_enabled = config.dashboard && std::io::stdout().is_tty();
    let interactive = config.interactive && std::io::stdin().is_tty();

    let (key_tx, mut key_rx) = mpsc::unbounded_channel::<KeyEvent>();
    let _raw_guard = if interactive {
        enable_raw_mode().map_err(MillError::Io)?;
        spawn_key_reader(key_tx);
        Some(RawModeGuard)
    } else {
        None
    };

    let mut sup = Supervisor {
        title: config.title,
        pool_size,
        cpu_count,
        files_total,
        files_completed: 0,
        files_failed: 0,
        totals: W::Totals::default(),
        slots: vec![WorkerSlot::default(); pool_size],
        queue: units.into_iter().collect(),
        unit_senders,
        log_store: LogStore::new(pool_size),
        export: ExportManager::new(config.export_dir),
        throughput: Throughput::new(),
        failing: Vec::new(),
        seen_failing: RecencySet::new(FAILING_DEDUP_CAPACITY),
        plugin,
        painter: Painter::new(paint_enabled, Gate::new()),
        paused: false,
        finished: false,
    };

    sup.assign_initial().await;
    sup.repaint(false);

    let mut tick = tokio::time::interval(config.repaint_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut keys_open = interactive;

    loop {
        tokio::select! {
            maybe = event_rx.recv() => match maybe {
                Some(event) => {
                    sup.on_event(event).await;
                    if sup.finished {
                        break;
                    }
                }
                None => break,
            },
            _ = tick.tick() => {
                if !sup.paused {
                    sup.repaint(false);
                }
            }
            key = key_rx.recv(), if keys_open => match key {
                Some(key) => sup.on_key(&key),
                None => keys_open = false,
            },
        }
    }

    Ok(sup.into_summary())
}

/// Restores the terminal even on early exit.
struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

async fn worker_loop<W: UnitWork>(
    worker: usize,
    mut units: mpsc::Receiver<WorkUnit>,
    work: Arc<W>,
    events: mpsc::UnboundedSender<PoolEvent<W::Totals>>,
) {
    while let Some(unit) = units.recv().await {
        let handle = WorkerHandle::new(worker, events.clone());
        let task = {
            let work = Arc::clone(&work);
            tokio::spawn(async move { work.run(unit, handle).await })
        };
        // A panicking work function fails its unit, not the pool.
        let result = match task.await {
            Ok(result) => result,
            Err(join_err) => Err(UnitError::new(format!("worker panicked: {join_err}"))),
        };
        if events.send(PoolEvent::Done { worker, result }).is_err() {
            return;
        }
    }
}

struct Supervisor<T: Totals> {
    title: String,
    pool_size: usize,
    cpu_count: usize,
    files_total: usize,
    files_completed: usize,
    files_failed: usize,
    totals: T,
    slots: Vec<WorkerSlot>,
    queue: VecDeque<WorkUnit>,
    unit_senders: Vec<Option<mpsc::Sender<WorkUnit>>>,
    log_store: LogStore,
    export: ExportManager,
    throughput: Throughput,
    failing: Vec<FailingRecord>,
    seen_failing: RecencySet<String>,
    plugin: Arc<dyn DashboardPlugin<T>>,
    painter: Painter,
    paused: bool,
    finished: bool,
}

impl<T: Totals> Supervisor<T> {
    async fn assign_initial(&mut self) {
        // Pool sizing guarantees a unit for every worker at start.
        for worker in 0..self.pool_size {
            if let Some(unit) = self.queue.pop_front() {
                self.assign(worker, unit).await;
            }
        }
    }

    async fn assign(&mut self, worker: usize, unit: WorkUnit) {
        self.slots[worker].assign(unit.path.clone());
        let sender = self.unit_senders[worker].clone();
        match sender {
            Some(sender) => {
                if sender.send(unit).await.is_err() {
                    // Worker task is gone; count its unit as failed.
                    warn!(worker, "worker channel closed, failing its unit");
                    self.files_failed += 1;
                    self.throughput.record_completion(false);
                    self.slots[worker].clear(Severity::Error);
                    self.unit_senders[worker] = None;
                }
            }
            None => {
                self.files_failed += 1;
                self.slots[worker].clear(Severity::Error);
            }
        }
    }

    async fn on_event(&mut self, event: PoolEvent<T>) {
        match event {
            PoolEvent::Progress { worker, progress } => {
                if let Some(slot) = self.slots.get_mut(worker) {
                    slot.progress = Some(progress);
                }
            }
            PoolEvent::Log {
                worker,
                channel,
                severity,
                line,
            } => {
                if let Some(slot) = self.slots.get_mut(worker) {
                    slot.last_severity = severity;
                }
                self.log_store.push(
                    worker,
                    LogEntry {
                        channel,
                        severity,
                        line,
                    },
                );
            }
            PoolEvent::Done { worker, result } => self.on_done(worker, result).await,
        }
    }

    async fn on_done(&mut self, worker: usize, result: Result<crate::pool::UnitReport<T>, UnitError>) {
        match result {
            Ok(report) => {
                self.files_completed += 1;
                self.totals.merge(&report.totals);
                self.throughput.record_completion(true);
                self.collect_failing(report.failing);
                self.slots[worker].clear(Severity::Ok);
            }
            Err(err) => {
                self.files_failed += 1;
                self.throughput.record_completion(false);
                let file = self.slots[worker]
                    .file
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "?".to_string());
                self.log_store.push(
                    worker,
                    LogEntry {
                        channel: LogChannel::Structured,
                        severity: Severity::Error,
                        line: format!("{file}: {}", err.message),
                    },
                );
                self.collect_failing(err.failing);
                self.slots[worker].clear(Severity::Error);
            }
        }

        if let Some(unit) = self.queue.pop_front() {
            self.assign(worker, unit).await;
        } else {
            // Nothing left for this worker; closing its channel ends it.
            self.unit_senders[worker] = None;
        }

        if self.queue.is_empty() && self.slots.iter().all(|s| !s.busy) {
            self.repaint(true);
            self.finished = true;
        }
    }

    /// Failing records are deduplicated by serialized identity so a chunk
    /// resubmitted after a partial failure cannot double-report.
    fn collect_failing(&mut self, records: Vec<FailingRecord>) {
        for record in records {
            let key = serde_json::to_string(&record).unwrap_or_default();
            if self.seen_failing.add(key) {
                self.failing.push(record);
            }
        }
    }

    fn on_key(&mut self, key: &KeyEvent) {
        match action_for_key(key) {
            Action::ViewLogs(level) => {
                self.paused = true;
                let view = self.render_log_view(level);
                let _ = self.painter.print_block(&view);
            }
            Action::Export(target) => {
                let result = match target {
                    ExportTarget::Logs(level) => {
                        self.export.export_combined_logs(&self.log_store, level)
                    }
                    ExportTarget::FailingRecords => {
                        self.export.export_failing_records(&self.failing)
                    }
                };
                match result {
                    Ok(path) => {
                        debug!(path = %path.display(), "export written");
                        self.repaint(false);
                    }
                    Err(err) => {
                        // Status stays unset; the run continues.
                        let _ = self
                            .painter
                            .print_block(&[format!("Export failed: {err}").red().to_string()]);
                    }
                }
            }
            Action::Resume => {
                self.paused = false;
                self.repaint(false);
            }
            Action::Noop => {}
        }
    }

    fn render_log_view(&self, level: LogLevel) -> Vec<String> {
        let mut lines = vec![format!("── {} logs ──", level.label())];
        let mut any = false;
        for worker in 0..self.log_store.worker_count() {
            let segment = self.log_store.segment(worker, level);
            if segment.is_empty() {
                continue;
            }
            any = true;
            lines.push(format!("worker {worker}:"));
            for entry in segment {
                let tag = match entry.channel {
                    LogChannel::Stdout => "stdout",
                    LogChannel::Stderr => "stderr",
                    LogChannel::Structured => entry.severity.label(),
                };
                lines.push(format!("  [{tag}] {}", entry.line));
            }
        }
        if !any {
            lines.push("(no matching lines captured yet)".to_string());
        }
        lines.push("(ESC or Ctrl+] resumes · workers keep running)".to_string());
        lines
    }

    fn repaint(&mut self, is_final: bool) {
        let ctx = self.snapshot(is_final);
        let frame = compose_frame(self.plugin.as_ref(), &ctx);
        if let Err(err) = self.painter.repaint(&frame) {
            warn!(%err, "dashboard repaint failed");
        }
    }

    fn snapshot(&self, is_final: bool) -> DashboardContext<T> {
        DashboardContext {
            title: self.title.clone(),
            pool_size: self.pool_size,
            cpu_count: self.cpu_count,
            files_total: self.files_total,
            files_completed: self.files_completed,
            files_failed: self.files_failed,
            workers: self.slots.clone(),
            totals: self.totals.clone(),
            throughput: self.throughput.stats(),
            exports: self.export.board(),
            is_final,
        }
    }

    fn into_summary(self) -> PoolSummary<T> {
        PoolSummary {
            files_total: self.files_total,
            files_completed: self.files_completed,
            files_failed: self.files_failed,
            failing_records: self.failing.len(),
            totals: self.totals,
            export_dir: self.export.dir().to_path_buf(),
        }
    }
}
