//! The parent-side bounded process pool: one OS process per `.jobs` file,
//! each process built by re-executing this same binary (spec §4.5).

use std::collections::VecDeque;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use log::{info, warn};

use crate::config::Config;

/// Hidden CLI flag used for the self re-exec (spec's REDESIGN note):
/// children are invoked as `<exe> --worker <jobs_path>`, never documented
/// in `--help`.
pub const WORKER_FLAG: &str = "--worker";

/// Runs every `*.jobs` file under `config.dir_path` to completion, bounding
/// the number of concurrently running child processes to `config.max_proc`.
/// Each child's exit status is reported to stdout as it is reaped, matching
/// `main.c`'s `WIFEXITED`/`WIFSIGNALED` reporting.
pub fn run(config: &Config) -> anyhow::Result<()> {
    let jobs_files = find_jobs_files(&config.dir_path)?;
    let mut pending: VecDeque<PathBuf> = jobs_files.into_iter().collect();
    let mut running: Vec<(PathBuf, Child)> = Vec::with_capacity(config.max_proc);

    while !pending.is_empty() || !running.is_empty() {
        while running.len() < config.max_proc {
            let Some(path) = pending.pop_front() else { break };
            let child = spawn_worker(&path, config)?;
            info!("spawned worker pid {} for {}", child.id(), path.display());
            running.push((path, child));
        }

        if running.is_empty() {
            break;
        }

        let (path, mut child) = running.remove(0);
        let status = child.wait()?;
        report_exit(&path, &status);
    }

    Ok(())
}

/// Lists every `*.jobs` file directly inside `dir`, sorted for determinism.
fn find_jobs_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension() == Some(OsStr::new("jobs")))
        .collect();
    found.sort();
    Ok(found)
}

fn spawn_worker(jobs_path: &Path, config: &Config) -> io::Result<Child> {
    let exe = env::current_exe()?;
    Command::new(exe)
        .arg(WORKER_FLAG)
        .arg(jobs_path)
        .arg(config.max_threads.to_string())
        .arg(config.access_delay.as_millis().to_string())
        .spawn()
}

fn out_path_for(jobs_path: &Path) -> PathBuf {
    jobs_path.with_extension("out")
}

/// Reports one child's termination to stdout (spec §4.5: the parent is the
/// destination for this, not stderr -- see `Open Questions` in the
/// expanded spec).
fn report_exit(jobs_path: &Path, status: &std::process::ExitStatus) {
    let out_path = out_path_for(jobs_path);
    match status.code() {
        Some(code) => println!("{}: exited with status {code}", out_path.display()),
        None => match status.signal() {
            Some(signal) => println!("{}: terminated by signal {signal}", out_path.display()),
            None => warn!("{}: terminated with no code or signal", out_path.display()),
        },
    }
}
