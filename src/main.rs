//! Taskmill CLI - worker-pool batch processing

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use colored::Colorize;
use walkdir::WalkDir;

use taskmill::dashboard::render::{make_export_lines, make_header};
use taskmill::{
    run_pool, DashboardContext, DashboardPlugin, FixSuggestion, MillError, PoolConfig,
    RecordTotals, Totals, UnitError, UnitReport, UnitWork, WorkUnit, WorkerHandle,
};

/// Records longer than this are reported as failing rather than counted.
const MAX_RECORD_CHARS: usize = 10_000;

#[derive(Parser)]
#[command(name = "taskmill")]
#[command(about = "Worker-pool execution and monitoring for long-running batch jobs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every file under a directory through the worker pool
    Scan {
        /// Directory to scan
        dir: PathBuf,

        /// Worker count (defaults to the core count, capped by file count)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Export directory for combined logs and the failing-records CSV
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Only process files with this extension (e.g. csv)
        #[arg(long)]
        ext: Option<String>,

        /// Per-record sleep in milliseconds, to simulate per-record latency
        #[arg(long)]
        throttle: Option<u64>,

        /// Disable the live dashboard and key handling
        #[arg(long)]
        no_dashboard: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan {
            dir,
            concurrency,
            export_dir,
            ext,
            throttle,
            no_dashboard,
        } => scan(dir, concurrency, export_dir, ext, throttle, no_dashboard).await,
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.fix_suggestion() {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

async fn scan(
    dir: PathBuf,
    concurrency: Option<usize>,
    export_dir: Option<PathBuf>,
    ext: Option<String>,
    throttle: Option<u64>,
    no_dashboard: bool,
) -> Result<i32, MillError> {
    let units = collect_units(&dir, ext.as_deref())?;
    if units.is_empty() {
        println!("{} No files to process under {}", "→".cyan(), dir.display());
        return Ok(0);
    }

    let export_dir = match export_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?.join("taskmill-exports"),
    };

    let mut config = PoolConfig::new("Taskmill scan", export_dir).with_concurrency(concurrency);
    if no_dashboard {
        config = config.headless();
    }

    let work = Arc::new(ScanWork { throttle });
    let summary = run_pool(units, work, Arc::new(ScanPlugin), config).await?;

    println!(
        "{} {} files processed, {} failed",
        "✓".green(),
        summary.files_completed,
        summary.files_failed
    );
    for line in summary.totals.summary_lines() {
        println!("  {line}");
    }
    println!("  Exports: {}", summary.export_dir.display());

    // Exit-code decision stays with the command, not the pool.
    Ok(if summary.files_failed > 0 { 1 } else { 0 })
}

fn collect_units(dir: &PathBuf, ext: Option<&str>) -> Result<Vec<WorkUnit>, MillError> {
    if !dir.is_dir() {
        return Err(MillError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("'{}' is not a directory", dir.display()),
        )));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| match ext {
            Some(ext) => path
                .extension()
                .map(|e| e.eq_ignore_ascii_case(ext))
                .unwrap_or(false),
            None => true,
        })
        .collect();
    paths.sort();

    Ok(paths.into_iter().map(WorkUnit::new).collect())
}

/// Demonstration work function: counts each file's records, flagging
/// oversized ones as failing.
struct ScanWork {
    throttle: Option<u64>,
}

#[async_trait]
impl UnitWork for ScanWork {
    type Totals = RecordTotals;

    async fn run(
        &self,
        unit: WorkUnit,
        handle: WorkerHandle<RecordTotals>,
    ) -> Result<UnitReport<RecordTotals>, UnitError> {
        let name = unit.path.display().to_string();
        let bytes = tokio::fs::read(&unit.path).await.map_err(|e| {
            UnitError::new(format!("read failed: {e}")).with_failing(vec![failing_record(
                &name,
                None,
                &e.to_string(),
            )])
        })?;

        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.lines().collect();
        let total = lines.len() as u64;
        handle.progress(0, Some(total));

        let mut totals = RecordTotals::default();
        let mut failing = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                totals.skipped += 1;
            } else if line.len() > MAX_RECORD_CHARS {
                totals.error += 1;
                handle.warn(format!("{name}: record {} oversized", idx + 1));
                failing.push(failing_record(&name, Some(idx + 1), "record oversized"));
            } else {
                totals.success += 1;
            }

            if let Some(ms) = self.throttle {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            if (idx + 1) % 200 == 0 {
                handle.progress((idx + 1) as u64, Some(total));
            }
        }

        handle.progress(total, Some(total));
        handle.info(format!("{name}: {} records", totals.success));
        Ok(UnitReport::new(totals).with_failing(failing))
    }
}

fn failing_record(file: &str, row: Option<usize>, reason: &str) -> taskmill::FailingRecord {
    let mut record = taskmill::FailingRecord::new();
    record.insert("file".into(), serde_json::json!(file));
    if let Some(row) = row {
        record.insert("row".into(), serde_json::json!(row));
    }
    record.insert("reason".into(), serde_json::json!(reason));
    record
}

/// Dashboard plugin for the scan command: shared header plus record totals,
/// shared worker rows, export status as extras.
struct ScanPlugin;

impl DashboardPlugin<RecordTotals> for ScanPlugin {
    fn render_header(&self, ctx: &DashboardContext<RecordTotals>) -> Vec<String> {
        let mut lines = make_header(ctx);
        lines.extend(ctx.totals.summary_lines());
        lines
    }

    fn render_extras(&self, ctx: &DashboardContext<RecordTotals>) -> Option<Vec<String>> {
        Some(make_export_lines(ctx))
    }
}
