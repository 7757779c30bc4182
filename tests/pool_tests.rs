//! Integration tests for the worker pool
//!
//! These drive real pools (headless) end to end and verify counting,
//! partial-failure tolerance, and the concurrency bound.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use taskmill::{
    run_pool, DashboardContext, DashboardPlugin, MillError, PoolConfig, RecordTotals, Totals,
    UnitError, UnitReport, UnitWork, WorkUnit, WorkerHandle,
};

fn units(n: usize) -> Vec<WorkUnit> {
    (0..n)
        .map(|i| WorkUnit::new(format!("/virtual/chunk-{i:04}.csv")))
        .collect()
}

fn headless_config(export: &TempDir) -> PoolConfig {
    PoolConfig::new("Test pool", export.path().join("exports")).headless()
}

/// Renders nothing; pool tests only care about the counters.
struct SilentPlugin;

impl DashboardPlugin<RecordTotals> for SilentPlugin {
    fn render_header(&self, _ctx: &DashboardContext<RecordTotals>) -> Vec<String> {
        Vec::new()
    }
}

/// Succeeds with three records per unit, except unit 0003 which fails.
struct FlakyWork;

#[async_trait]
impl UnitWork for FlakyWork {
    type Totals = RecordTotals;

    async fn run(
        &self,
        unit: WorkUnit,
        handle: WorkerHandle<RecordTotals>,
    ) -> Result<UnitReport<RecordTotals>, UnitError> {
        handle.progress(0, Some(3));
        if unit.path.to_string_lossy().contains("0003") {
            handle.error("chunk rejected upstream");
            let mut record = taskmill::FailingRecord::new();
            record.insert("file".into(), serde_json::json!("chunk-0003.csv"));
            record.insert("reason".into(), serde_json::json!("rejected"));
            return Err(UnitError::new("chunk rejected upstream").with_failing(vec![record]));
        }
        handle.progress(3, Some(3));
        Ok(UnitReport::new(RecordTotals {
            success: 3,
            error: 0,
            skipped: 0,
        }))
    }
}

#[tokio::test]
async fn partial_failure_never_aborts_the_pool() {
    let export = TempDir::new().unwrap();
    let summary = run_pool(
        units(10),
        Arc::new(FlakyWork),
        Arc::new(SilentPlugin),
        headless_config(&export).with_concurrency(Some(3)),
    )
    .await
    .unwrap();

    assert_eq!(summary.files_total, 10);
    assert_eq!(summary.files_completed, 9);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.failing_records, 1);
    assert_eq!(summary.totals.success, 27);
}

/// Panics on one unit; the pool must survive and count it as failed.
struct PanickyWork;

#[async_trait]
impl UnitWork for PanickyWork {
    type Totals = RecordTotals;

    async fn run(
        &self,
        unit: WorkUnit,
        _handle: WorkerHandle<RecordTotals>,
    ) -> Result<UnitReport<RecordTotals>, UnitError> {
        if unit.path.to_string_lossy().contains("0001") {
            panic!("work function exploded");
        }
        Ok(UnitReport::new(RecordTotals {
            success: 1,
            error: 0,
            skipped: 0,
        }))
    }
}

#[tokio::test]
async fn panicking_unit_is_a_unit_failure() {
    let export = TempDir::new().unwrap();
    let summary = run_pool(
        units(4),
        Arc::new(PanickyWork),
        Arc::new(SilentPlugin),
        headless_config(&export).with_concurrency(Some(2)),
    )
    .await
    .unwrap();

    assert_eq!(summary.files_completed, 3);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.totals.success, 3);
}

/// Tracks the peak number of concurrently running work functions.
struct CountingWork {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl UnitWork for CountingWork {
    type Totals = RecordTotals;

    async fn run(
        &self,
        _unit: WorkUnit,
        _handle: WorkerHandle<RecordTotals>,
    ) -> Result<UnitReport<RecordTotals>, UnitError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(UnitReport::new(RecordTotals {
            success: 1,
            error: 0,
            skipped: 0,
        }))
    }
}

#[tokio::test]
async fn concurrency_override_bounds_parallelism() {
    let export = TempDir::new().unwrap();
    let work = Arc::new(CountingWork {
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let summary = run_pool(
        units(12),
        Arc::clone(&work),
        Arc::new(SilentPlugin),
        headless_config(&export).with_concurrency(Some(2)),
    )
    .await
    .unwrap();

    assert_eq!(summary.files_completed, 12);
    assert!(work.peak.load(Ordering::SeqCst) <= 2);
    assert!(work.peak.load(Ordering::SeqCst) >= 1);
}

/// Every unit reports the same failing record.
struct DuplicatedFailureWork;

#[async_trait]
impl UnitWork for DuplicatedFailureWork {
    type Totals = RecordTotals;

    async fn run(
        &self,
        _unit: WorkUnit,
        _handle: WorkerHandle<RecordTotals>,
    ) -> Result<UnitReport<RecordTotals>, UnitError> {
        let mut record = taskmill::FailingRecord::new();
        record.insert("id".into(), serde_json::json!("pref-42"));
        record.insert("reason".into(), serde_json::json!("conflict"));
        Ok(UnitReport::new(RecordTotals {
            success: 0,
            error: 1,
            skipped: 0,
        })
        .with_failing(vec![record]))
    }
}

#[tokio::test]
async fn failing_records_are_deduplicated_across_units() {
    let export = TempDir::new().unwrap();
    let summary = run_pool(
        units(5),
        Arc::new(DuplicatedFailureWork),
        Arc::new(SilentPlugin),
        headless_config(&export).with_concurrency(Some(2)),
    )
    .await
    .unwrap();

    assert_eq!(summary.files_completed, 5);
    assert_eq!(summary.failing_records, 1);
}

#[tokio::test]
async fn zero_units_complete_immediately() {
    let export = TempDir::new().unwrap();
    let summary = run_pool(
        Vec::new(),
        Arc::new(FlakyWork),
        Arc::new(SilentPlugin),
        headless_config(&export),
    )
    .await
    .unwrap();

    assert_eq!(summary.files_total, 0);
    assert_eq!(summary.files_completed, 0);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(summary.totals, RecordTotals::default());
}

#[tokio::test]
async fn zero_concurrency_is_a_startup_error() {
    let export = TempDir::new().unwrap();
    let err = run_pool(
        units(3),
        Arc::new(FlakyWork),
        Arc::new(SilentPlugin),
        headless_config(&export).with_concurrency(Some(0)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, MillError::InvalidConfig { .. }));
}

/// Check-style totals: merged, but never numeric-summable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CheckTotals {
    pending: u64,
    conflict: u64,
}

impl Totals for CheckTotals {
    fn merge(&mut self, other: &Self) {
        self.pending += other.pending;
        self.conflict += other.conflict;
    }

    fn job_sum(&self) -> Option<u64> {
        None
    }
}

struct CheckWork;

#[async_trait]
impl UnitWork for CheckWork {
    type Totals = CheckTotals;

    async fn run(
        &self,
        _unit: WorkUnit,
        _handle: WorkerHandle<CheckTotals>,
    ) -> Result<UnitReport<CheckTotals>, UnitError> {
        Ok(UnitReport::new(CheckTotals {
            pending: 2,
            conflict: 1,
        }))
    }
}

struct CheckPlugin;

impl DashboardPlugin<CheckTotals> for CheckPlugin {
    fn render_header(&self, ctx: &DashboardContext<CheckTotals>) -> Vec<String> {
        taskmill::dashboard::render::make_header(ctx)
    }
}

#[tokio::test]
async fn check_mode_totals_merge_without_job_sum() {
    let export = TempDir::new().unwrap();
    let summary = run_pool(
        units(4),
        Arc::new(CheckWork),
        Arc::new(CheckPlugin),
        headless_config(&export).with_concurrency(Some(2)),
    )
    .await
    .unwrap();

    assert_eq!(summary.files_completed, 4);
    assert_eq!(
        summary.totals,
        CheckTotals {
            pending: 8,
            conflict: 4,
        }
    );
    assert_eq!(summary.totals.job_sum(), None);
}
