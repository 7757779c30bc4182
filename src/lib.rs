//! Taskmill - worker-pool execution and monitoring for CLI batch jobs
//!
//! Commands hand the pool a list of work units, a work function, and a
//! dashboard plugin; the pool partitions the units across workers, tracks
//! live progress and throughput, repaints a terminal dashboard, and answers
//! keypresses for log viewing and exporting without stopping the run.

pub mod dashboard;
pub mod error;
pub mod estimate;
pub mod export;
pub mod gate;
pub mod input;
pub mod logs;
pub mod pool;
pub mod rate;
pub mod recency;
pub mod sizing;
pub mod slot;
pub mod totals;

pub use dashboard::{compose_frame, DashboardContext, DashboardPlugin, Painter};
pub use error::{FixSuggestion, MillError};
pub use estimate::{Estimate, Throughput, ThroughputStats};
pub use export::{osc8_link, ExportBoard, ExportManager, ExportTarget, FailingRecord};
pub use gate::Gate;
pub use input::Action;
pub use logs::{LogLevel, LogStore};
pub use pool::{run_pool, PoolConfig, PoolSummary, UnitError, UnitReport, UnitWork, WorkUnit, WorkerHandle};
pub use rate::RateCounter;
pub use recency::RecencySet;
pub use sizing::compute_pool_size;
pub use slot::{JobProgress, Severity, WorkerSlot};
pub use totals::{RecordTotals, Totals};
