//! Binary entry point: the public CLI plus the hidden worker re-exec mode.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::error;

use ems::config::{Config, DEFAULT_ACCESS_DELAY_MS};
use ems::worker::{self, WORKER_FLAG};

/// Concurrent batch processor for seating-grid event job files.
#[derive(Parser, Debug)]
#[command(name = "ems", version, about)]
struct Cli {
    /// Directory to scan for `*.jobs` files.
    dir_path: PathBuf,

    /// Maximum number of worker processes running at once.
    max_proc: usize,

    /// Maximum number of threads per worker process.
    max_threads: usize,

    /// Artificial per-access delay in milliseconds (testing aid).
    state_access_delay_ms: Option<u64>,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all but error-level logging.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let mut raw_args = std::env::args();
    let program = raw_args.next().unwrap_or_default();

    // The re-exec worker mode is an implementation detail of the process
    // pool (spec's REDESIGN note), not a documented subcommand: it is
    // parsed by hand, ahead of `Cli::parse`, so it never shows up in
    // `--help` or clap's usage string.
    let rest: Vec<String> = raw_args.collect();
    if rest.first().map(String::as_str) == Some(WORKER_FLAG) {
        return run_as_worker(&rest[1..]);
    }

    let cli = match Cli::try_parse_from(std::iter::once(program).chain(rest)) {
        Ok(cli) => cli,
        Err(e) => {
            e.print().ok();
            return ExitCode::from(1);
        }
    };
    init_logging(cli.verbose, cli.quiet);

    let config = Config::new(cli.dir_path, cli.max_proc, cli.max_threads, cli.state_access_delay_ms);
    match worker::run_process_pool(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(1)
        }
    }
}

/// Handles `--worker <jobs_path> <max_threads> <delay_ms>`, the hidden
/// child invocation spawned by the process pool.
fn run_as_worker(args: &[String]) -> ExitCode {
    init_logging(0, false);

    let jobs_path = match args.first() {
        Some(path) => PathBuf::from(path),
        None => {
            error!("--worker requires a jobs file path");
            return ExitCode::from(1);
        }
    };
    let max_threads: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
    let delay_ms: u64 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_ACCESS_DELAY_MS);

    let code = worker::run_worker(&jobs_path, max_threads, Duration::from_millis(delay_ms));
    ExitCode::from(code as u8)
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}
