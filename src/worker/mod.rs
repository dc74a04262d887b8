//! The two-level concurrency harness: a bounded pool of worker processes,
//! each running a bounded pool of threads against one job file.

mod context;
mod process_pool;
mod thread_body;
mod thread_pool;

use std::path::Path;
use std::time::Duration;

use log::error;

pub use process_pool::WORKER_FLAG;

use crate::config::Config;
use context::JobContext;

/// Parent-side entry point: runs every job file under `config.dir_path`
/// through the process pool (spec §4.5).
pub fn run_process_pool(config: &Config) -> anyhow::Result<()> {
    process_pool::run(config)
}

/// Child-side entry point, invoked via the hidden `--worker` re-exec flag.
/// Opens `jobs_path`'s sibling `.out` file, builds a fresh `EventStore`,
/// and drives the thread pool to completion. Returns the process exit code
/// (0 on success, non-zero on an I/O fault per spec §7).
pub fn run_worker(jobs_path: &Path, max_threads: usize, access_delay: Duration) -> i32 {
    let out_path = jobs_path.with_extension("out");
    let ctx = match JobContext::open(jobs_path, &out_path, max_threads, access_delay) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("failed to open job context for {}: {e}", jobs_path.display());
            return 1;
        }
    };

    match thread_pool::run(&ctx, max_threads) {
        Ok(()) => 0,
        Err(e) => {
            error!("worker for {} failed: {e}", jobs_path.display());
            1
        }
    }
}
