//! The loop run by every thread in a worker's thread batch (spec §4.3).

use std::sync::atomic::Ordering;

use log::{debug, trace};

use crate::error::WorkerError;
use crate::parser::{self, Command};
use crate::store::{self, ShowError};
use crate::worker::context::JobContext;

/// Why a thread stopped running commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadExit {
    /// Hit a `BARRIER`: the pool should re-spawn the whole batch.
    Barrier,
    /// Hit end-of-commands: nothing left for this file.
    Eoc,
}

const HELP_TEXT: &str = "\
Available commands:
  CREATE <event_id> <num_rows> <num_columns>
  RESERVE <event_id> [(<x1>,<y1>) (<x2>,<y2>) ...]
  SHOW <event_id>
  LIST
  WAIT <delay_ms> [thread_id]
  BARRIER
  HELP
";

/// Runs one thread's command loop against `ctx` until it hits a barrier or
/// runs out of commands, or an I/O fault on `out_fd` forces the worker
/// process to give up (spec §7).
pub fn run(ctx: &JobContext, id: usize, max_threads: usize) -> Result<ThreadExit, WorkerError> {
    loop {
        let pending = ctx.delays[id].swap(0, Ordering::AcqRel);
        if pending > 0 {
            store::wait(pending);
        }

        let command = {
            let mut jobs = ctx.jobs.lock().unwrap();
            parser::next_command(&mut *jobs)
        };

        match command {
            Command::Create { event_id, rows, cols } => {
                debug!("thread {id}: CREATE {event_id}");
                if let Err(e) = ctx.store.create(event_id, rows, cols) {
                    eprintln!("Failed to create event: {e}");
                }
            }
            Command::Reserve { event_id, seats } => {
                debug!("thread {id}: RESERVE {event_id}");
                if let Err(e) = ctx.store.reserve(event_id, &seats) {
                    eprintln!("Failed to reserve seats: {e}");
                }
            }
            Command::Show { event_id } => {
                debug!("thread {id}: SHOW {event_id}");
                if let Err(e) = ctx.store.show(event_id, &ctx.out) {
                    match e {
                        ShowError::Store(store_err) => eprintln!("Failed to show event: {store_err}"),
                        ShowError::Io(io_err) => return Err(WorkerError::Io(io_err)),
                    }
                }
            }
            Command::List => {
                debug!("thread {id}: LIST");
                if let Err(io_err) = ctx.store.list_events(&ctx.out) {
                    return Err(WorkerError::Io(io_err));
                }
            }
            Command::Wait { delay_ms, thread_id } => apply_wait(ctx, id, max_threads, delay_ms, thread_id),
            Command::Help => print!("{HELP_TEXT}"),
            Command::Invalid => eprintln!("Invalid command. See HELP for usage"),
            Command::Empty => {}
            Command::Barrier => {
                trace!("thread {id}: BARRIER");
                return Ok(ThreadExit::Barrier);
            }
            Command::Eoc => {
                trace!("thread {id}: EOC");
                return Ok(ThreadExit::Eoc);
            }
        }
    }
}

/// `WAIT <delay_ms> [thread_id]`: with no target, every *other* thread's
/// next iteration is delayed and the caller also sleeps now; with a
/// target, only that thread's next iteration is delayed (spec §4.3).
fn apply_wait(ctx: &JobContext, id: usize, max_threads: usize, delay_ms: u64, thread_id: Option<u32>) {
    match thread_id {
        None | Some(0) => {
            for (other, slot) in ctx.delays.iter().enumerate() {
                if other != id {
                    slot.fetch_add(delay_ms, Ordering::AcqRel);
                }
            }
            store::wait(delay_ms);
        }
        Some(target) if target >= 1 && target as usize <= max_threads => {
            ctx.delays[target as usize - 1].fetch_add(delay_ms, Ordering::AcqRel);
        }
        Some(_) => eprintln!("Invalid command. See HELP for usage"),
    }
}
