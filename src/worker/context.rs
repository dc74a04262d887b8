//! Per-process shared state: the event store plus the job/out file handles
//! and the `delays` vector every thread in the process can see.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::Mutex;
use std::time::Duration;

use crate::store::EventStore;

/// Everything one worker process's threads share: the store, the shared
/// reader/writer handles (spec's `jobs_fd`/`out_fd`), and the per-thread
/// `delays` slots (spec §4.3 WAIT semantics), each an atomic rather than a
/// plain integer so a thread can target another thread's slot without a
/// dedicated lock (spec §9 "WAIT targeting another thread").
pub struct JobContext {
    pub store: EventStore,
    pub jobs: Mutex<BufReader<File>>,
    pub out: Mutex<File>,
    pub delays: Vec<AtomicU64>,
}

impl JobContext {
    pub fn open(jobs_path: &Path, out_path: &Path, max_threads: usize, access_delay: Duration) -> std::io::Result<Self> {
        let jobs_file = File::open(jobs_path)?;
        let out_file = File::create(out_path)?;

        Ok(JobContext {
            store: EventStore::new(access_delay),
            jobs: Mutex::new(BufReader::new(jobs_file)),
            out: Mutex::new(out_file),
            delays: (0..max_threads).map(|_| AtomicU64::new(0)).collect(),
        })
    }
}
