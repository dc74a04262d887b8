//! Runs one worker process's full thread batch, re-spawning it across
//! `BARRIER` commands (spec §4.4).

use std::thread;

use log::trace;

use crate::error::WorkerError;
use crate::parser;
use crate::worker::context::JobContext;
use crate::worker::thread_body::{self, ThreadExit};

/// Drives `ctx`'s jobs file to completion: spawns `max_threads` threads,
/// waits for all of them, and if any hit `BARRIER`, consumes the barrier's
/// trailing cleanup line and spawns the whole batch again. Returns once a
/// batch ends with every thread reporting end-of-commands.
pub fn run(ctx: &JobContext, max_threads: usize) -> Result<(), WorkerError> {
    loop {
        let mut saw_barrier = false;
        let mut first_err = None;

        thread::scope(|scope| {
            let handles: Vec<_> = (0..max_threads)
                .map(|id| {
                    thread::Builder::new()
                        .name(format!("ems-worker-{id}"))
                        .spawn_scoped(scope, move || thread_body::run(ctx, id, max_threads))
                        .expect("failed to spawn worker thread")
                })
                .collect();

            for handle in handles {
                match handle.join().expect("worker thread panicked") {
                    Ok(ThreadExit::Barrier) => saw_barrier = true,
                    Ok(ThreadExit::Eoc) => {}
                    Err(e) if first_err.is_none() => first_err = Some(e),
                    Err(_) => {}
                }
            }
        });

        if let Some(e) = first_err {
            return Err(e);
        }

        if !saw_barrier {
            return Ok(());
        }

        trace!("barrier reached, re-spawning thread batch");
        let mut jobs = ctx.jobs.lock().unwrap();
        parser::cleanup_line(&mut *jobs);
    }
}
