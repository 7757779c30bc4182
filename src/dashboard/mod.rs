//! Dashboard
//!
//! Architecture:
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                  PLUGIN LAYER (per command)                   │
//! │  DashboardPlugin<T>: header / workers / extras as line lists  │
//! └───────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ DashboardContext<T> (immutable snapshot)
//! ┌───────────────────────────────────────────────────────────────┐
//! │                SHARED RENDERERS (render.rs)                   │
//! │  make_header / make_worker_rows / make_export_lines           │
//! └───────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ Vec<String> frame
//! ┌───────────────────────────────────────────────────────────────┐
//! │                    PAINTER (paint.rs)                         │
//! │  In-place repaint, serialized through the gate                │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Plugins are stateless functions of the context snapshot: the supervisor
//! assembles a fresh `DashboardContext` per repaint and nothing downstream
//! ever mutates live pool state.

mod paint;
pub mod render;

pub use paint::Painter;

use crate::estimate::ThroughputStats;
use crate::export::ExportBoard;
use crate::slot::WorkerSlot;

/// Immutable snapshot assembled once per repaint.
#[derive(Debug, Clone)]
pub struct DashboardContext<T> {
    pub title: String,
    pub pool_size: usize,
    pub cpu_count: usize,

    pub files_total: usize,
    pub files_completed: usize,
    pub files_failed: usize,

    pub workers: Vec<WorkerSlot>,

    /// Command-specific aggregate, merged across completed units.
    pub totals: T,

    pub throughput: ThroughputStats,
    pub exports: ExportBoard,

    /// True on the terminal repaint.
    pub is_final: bool,
}

/// Per-command rendering callbacks.
///
/// `render_header` is the one method every command must supply (typically
/// delegating to [`render::make_header`] and appending its totals lines).
/// `render_workers` defaults to the shared row renderer; `render_extras` is
/// optional and defaults to nothing.
pub trait DashboardPlugin<T>: Send + Sync {
    fn render_header(&self, ctx: &DashboardContext<T>) -> Vec<String>;

    fn render_workers(&self, ctx: &DashboardContext<T>) -> Vec<String> {
        render::make_worker_rows(ctx)
    }

    fn render_extras(&self, _ctx: &DashboardContext<T>) -> Option<Vec<String>> {
        None
    }
}

/// Assemble the full frame: header, worker rows, optional extras.
pub fn compose_frame<T>(plugin: &dyn DashboardPlugin<T>, ctx: &DashboardContext<T>) -> Vec<String> {
    let mut frame = plugin.render_header(ctx);
    frame.push(String::new());
    frame.extend(plugin.render_workers(ctx));
    if let Some(extras) = plugin.render_extras(ctx) {
        frame.push(String::new());
        frame.extend(extras);
    }
    frame
}
