//! Export manager
//!
//! Persists combined per-severity logs and the failing-records CSV under one
//! run-scoped export directory, and tracks which exports have happened so the
//! dashboard can render status lines. Export paths are fixed at pool start;
//! entries are created empty and only ever flip to exported on a successful
//! write.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::Value;
use url::Url;

use crate::error::MillError;
use crate::logs::{LogChannel, LogLevel, LogStore};

/// One failing record, keyed in first-seen order (`serde_json` is built with
/// `preserve_order`).
pub type FailingRecord = serde_json::Map<String, Value>;

/// What a single export produces on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportTarget {
    Logs(LogLevel),
    FailingRecords,
}

impl ExportTarget {
    pub fn file_name(&self) -> String {
        match self {
            ExportTarget::Logs(level) => format!("combined-{}.log", level.label()),
            ExportTarget::FailingRecords => "failing-updates.csv".to_string(),
        }
    }

    /// Human label for dashboard status lines.
    pub fn label(&self) -> &'static str {
        match self {
            ExportTarget::Logs(LogLevel::Error) => "error logs",
            ExportTarget::Logs(LogLevel::Warn) => "warn logs",
            ExportTarget::Logs(LogLevel::Info) => "info logs",
            ExportTarget::Logs(LogLevel::All) => "all logs",
            ExportTarget::FailingRecords => "failing records",
        }
    }

    /// The key that triggers this export.
    pub fn key_hint(&self) -> char {
        match self {
            ExportTarget::Logs(LogLevel::Error) => 'E',
            ExportTarget::Logs(LogLevel::Warn) => 'W',
            ExportTarget::Logs(LogLevel::Info) => 'I',
            ExportTarget::Logs(LogLevel::All) => 'A',
            ExportTarget::FailingRecords => 'F',
        }
    }
}

/// Status of one export target. Never removed during a run.
#[derive(Debug, Clone)]
pub struct ExportStatusEntry {
    pub path: PathBuf,
    pub exported: bool,
    pub saved_at: Option<Instant>,
}

/// Ordered, cloneable view of all export statuses for context snapshots.
#[derive(Debug, Clone, Default)]
pub struct ExportBoard {
    pub entries: Vec<(ExportTarget, ExportStatusEntry)>,
}

impl ExportBoard {
    pub fn get(&self, target: ExportTarget) -> Option<&ExportStatusEntry> {
        self.entries
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, e)| e)
    }
}

const ALL_TARGETS: [ExportTarget; 5] = [
    ExportTarget::Logs(LogLevel::Error),
    ExportTarget::Logs(LogLevel::Warn),
    ExportTarget::Logs(LogLevel::Info),
    ExportTarget::Logs(LogLevel::All),
    ExportTarget::FailingRecords,
];

/// Owns export-directory file creation and the status map.
#[derive(Debug)]
pub struct ExportManager {
    dir: PathBuf,
    entries: Vec<(ExportTarget, ExportStatusEntry)>,
}

impl ExportManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let entries = ALL_TARGETS
            .iter()
            .map(|&target| {
                (
                    target,
                    ExportStatusEntry {
                        path: dir.join(target.file_name()),
                        exported: false,
                        saved_at: None,
                    },
                )
            })
            .collect();
        Self { dir, entries }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn board(&self) -> ExportBoard {
        ExportBoard {
            entries: self.entries.clone(),
        }
    }

    /// Concatenate every worker's captured segments at `level` into one file.
    pub fn export_combined_logs(
        &mut self,
        store: &LogStore,
        level: LogLevel,
    ) -> Result<PathBuf, MillError> {
        let target = ExportTarget::Logs(level);
        let path = self.path_for(target);

        let mut out = String::new();
        for worker in 0..store.worker_count() {
            let segment = store.segment(worker, level);
            let dropped = store.dropped(worker);
            if segment.is_empty() && dropped == 0 {
                continue;
            }
            out.push_str(&format!("==== worker {worker} ====\n"));
            if dropped > 0 {
                out.push_str(&format!("({dropped} earlier lines dropped)\n"));
            }
            for entry in segment {
                let tag = match entry.channel {
                    LogChannel::Stdout => "stdout",
                    LogChannel::Stderr => "stderr",
                    LogChannel::Structured => entry.severity.label(),
                };
                out.push_str(&format!("[{tag}] {}\n", entry.line));
            }
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| MillError::ExportFailed {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, out).map_err(|source| MillError::ExportFailed {
            path: path.clone(),
            source,
        })?;

        self.mark(target);
        Ok(path)
    }

    /// Write the failing-records report.
    pub fn export_failing_records(
        &mut self,
        records: &[FailingRecord],
    ) -> Result<PathBuf, MillError> {
        let target = ExportTarget::FailingRecords;
        let path = self.path_for(target);
        write_failing_records_csv(records, &path)?;
        self.mark(target);
        Ok(path)
    }

    fn path_for(&self, target: ExportTarget) -> PathBuf {
        self.entries
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, e)| e.path.clone())
            .unwrap_or_else(|| self.dir.join(target.file_name()))
    }

    fn mark(&mut self, target: ExportTarget) {
        if let Some((_, entry)) = self.entries.iter_mut().find(|(t, _)| *t == target) {
            entry.exported = true;
            entry.saved_at = Some(Instant::now());
        }
    }
}

/// Write `records` as CSV at `path`, creating parent directories as needed.
///
/// The header is the union of keys across all records in first-seen order.
/// Values needing quoting (embedded quote, comma, or newline) are wrapped in
/// quotes with inner quotes doubled; non-string, non-null values are JSON
/// encoded before escaping. The file always ends with a newline, and an empty
/// record list produces a single empty header line (`"\n"`), not a zero-byte
/// file.
pub fn write_failing_records_csv(
    records: &[FailingRecord],
    path: &Path,
) -> Result<PathBuf, MillError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| MillError::ExportFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let mut headers: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key.as_str());
            }
        }
    }

    let mut out = String::new();
    out.push_str(
        &headers
            .iter()
            .map(|h| csv_escape(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');

    for record in records {
        let row = headers
            .iter()
            .map(|h| {
                record
                    .get(*h)
                    .map(|v| csv_escape(&csv_value(v)))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }

    std::fs::write(path, out).map_err(|source| MillError::ExportFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}

/// Render `label` as a clickable `file://` hyperlink (OSC 8).
///
/// Placeholder labels beginning with `(` pass through unchanged. If the path
/// cannot become a URL (relative paths, non-UTF-8 segments), the label (or
/// the raw path when no label is given) is returned as plain text.
pub fn osc8_link(path: &Path, label: &str) -> String {
    let label = if label.is_empty() {
        path.display().to_string()
    } else {
        label.to_string()
    };

    if label.starts_with('(') {
        return label;
    }

    match Url::from_file_path(path) {
        Ok(url) => format!("\u{1b}]8;;{url}\u{1b}\\{label}\u{1b}]8;;\u{1b}\\"),
        Err(()) => label,
    }
}

fn csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains('"') || field.contains(',') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
