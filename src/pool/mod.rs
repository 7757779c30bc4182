//! Worker pool
//!
//! The pool runtime behind every long-running, many-file command:
//!
//! - [`work`] - the work-function seam ([`UnitWork`], [`WorkerHandle`])
//! - [`supervisor`] - assignment, counters, repaint, input ([`run_pool`])
//!
//! The supervisor is the sole mutator of the slot registry; every other
//! component sees immutable snapshots. Failure of one unit never aborts the
//! pool; the queue keeps draining and the failure lands in the counters.

mod supervisor;
mod work;

pub use supervisor::{run_pool, PoolConfig, PoolSummary};
pub use work::{UnitError, UnitReport, UnitWork, WorkUnit, WorkerHandle};

pub(crate) use work::PoolEvent;
