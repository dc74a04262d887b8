//! Error types for the event store and the worker loop that drives it.

use std::io;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Domain errors raised by [`crate::store::EventStore`] operations.
///
/// These are the "first five" kinds from the error design: reported to
/// stderr by the caller and skipped, never fatal to the worker.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("EMS state must be initialized")]
    NotInitialised,
    #[error("event {id} already exists")]
    Duplicate { id: u32 },
    #[error("event {id} not found")]
    NotFound { id: u32 },
    #[error("invalid seat ({row}, {col})")]
    InvalidSeat { row: u32, col: u32 },
    #[error("seat ({row}, {col}) already reserved")]
    SeatTaken { row: u32, col: u32 },
}

/// Errors that can terminate a worker process.
///
/// Distinct from [`StoreError`]: these always propagate up to the worker's
/// main loop and cause a non-zero process exit (I/O on `jobs_fd`/`out_fd`),
/// or cause a single command to be skipped (a malformed line).
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("I/O failure on job or output file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed command: {0}")]
    ParseFailed(String),
}
