//! Shared renderers
//!
//! Line builders used by every command's dashboard plugin. All functions are
//! pure: they read the context snapshot and return strings.

use std::time::{Duration, Instant};

use colored::Colorize;

use crate::dashboard::DashboardContext;
use crate::estimate::Estimate;
use crate::export::osc8_link;
use crate::slot::Severity;
use crate::totals::Totals;

const BAR_WIDTH: usize = 12;
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Title line plus metrics line.
///
/// The title line always reads `"<title> — <N> workers …"`; the metrics line
/// carries the throughput rates and, when they are defined, the estimated
/// total job count and the ETA. An undefined estimate renders as
/// `Est. total jobs: —` with no ETA at all.
pub fn make_header<T: Totals>(ctx: &DashboardContext<T>) -> Vec<String> {
    let failed = if ctx.files_failed > 0 {
        format!("{} failed", ctx.files_failed).red().to_string()
    } else {
        format!("{} failed", ctx.files_failed)
    };
    let title_line = format!(
        "{} — {} workers ({} cores) · files {}/{} · {}",
        ctx.title,
        ctx.pool_size,
        ctx.cpu_count,
        ctx.files_completed,
        ctx.files_total,
        failed,
    );

    let est = Estimate::compute(
        ctx.totals.job_sum(),
        ctx.files_total,
        ctx.files_completed,
        &ctx.workers,
        ctx.throughput.r60s,
    );

    let mut metrics = format!(
        "{:.1}/s (10s) · {:.1}/s (60s) · {} done · Est. total jobs: {}",
        ctx.throughput.r10s,
        ctx.throughput.r60s,
        ctx.throughput.success_so_far,
        est.estimated_total_jobs
            .map(|n| format!("{}", n.round() as u64))
            .unwrap_or_else(|| "—".to_string()),
    );
    if let Some(eta) = est.eta_seconds {
        metrics.push_str(&format!(" · ETA {}", fmt_secs(eta)));
    }

    vec![title_line, metrics]
}

/// One line per worker slot.
pub fn make_worker_rows<T>(ctx: &DashboardContext<T>) -> Vec<String> {
    ctx.workers
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            if !slot.busy {
                return format!("[{i:>2}] {}", "IDLE".dimmed());
            }

            let name = slot
                .file
                .as_deref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "?".to_string());
            let elapsed = slot
                .started_at
                .map(|t| fmt_duration(t.elapsed()))
                .unwrap_or_default();

            let mut row = format!(
                "[{i:>2}] {} {name}  {elapsed}",
                colored_marker(slot.last_severity)
            );
            if let Some(progress) = &slot.progress {
                if let Some(total) = progress.total {
                    row.push_str(&format!(
                        "  {} {}/{}",
                        mini_bar(progress.processed, total),
                        progress.processed,
                        total
                    ));
                } else {
                    row.push_str(&format!("  {} done", progress.processed));
                }
            }
            row
        })
        .collect()
}

/// Export status block: one hyperlink (or placeholder) per target.
pub fn make_export_lines<T>(ctx: &DashboardContext<T>) -> Vec<String> {
    ctx.exports
        .entries
        .iter()
        .map(|(target, entry)| {
            let text = if entry.exported {
                let link = osc8_link(&entry.path, &entry.path.display().to_string());
                let saved = entry
                    .saved_at
                    .map(fmt_relative)
                    .unwrap_or_else(|| "just now".to_string());
                format!("{link} · saved {saved}")
            } else {
                osc8_link(
                    &entry.path,
                    &format!("(press {} to export)", target.key_hint()),
                )
            };
            format!("{:>15}: {text}", target.label())
        })
        .collect()
}

fn colored_marker(severity: Severity) -> String {
    let marker = severity.marker();
    match severity {
        Severity::Ok => marker.dimmed().to_string(),
        Severity::Info => marker.cyan().to_string(),
        Severity::Warn => marker.yellow().to_string(),
        Severity::Error => marker.red().to_string(),
    }
}

fn mini_bar(processed: u64, total: u64) -> String {
    let ratio = if total == 0 {
        1.0
    } else {
        (processed as f64 / total as f64).clamp(0.0, 1.0)
    };
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}]",
        BAR_FULL.to_string().repeat(filled),
        BAR_EMPTY.to_string().repeat(BAR_WIDTH - filled)
    )
}

fn fmt_secs(secs: f64) -> String {
    fmt_duration(Duration::from_secs_f64(secs.max(0.0)))
}

fn fmt_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

fn fmt_relative(at: Instant) -> String {
    let elapsed = at.elapsed();
    if elapsed.as_secs() < 2 {
        "just now".to_string()
    } else {
        format!("{} ago", fmt_duration(elapsed))
    }
}
