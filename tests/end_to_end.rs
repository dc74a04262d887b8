//! Drives the in-process worker loop (bypassing the process-pool/re-exec
//! layer, which isn't meaningfully unit-testable) against the end-to-end
//! scenarios.

use std::time::{Duration, Instant};

use ems::worker::run_worker;
use ems_testutils::JobDir;

fn run(dir: &JobDir, name: &str, contents: &str) -> String {
    let path = dir.write_jobs(name, contents);
    let code = run_worker(&path, 1, Duration::ZERO);
    assert_eq!(code, 0);
    dir.read_out(name)
}

#[test]
fn single_create_and_show() {
    let dir = JobDir::new();
    let out = run(&dir, "a", "CREATE 1 2 3\nSHOW 1\n");
    assert_eq!(out, "0 0 0\n0 0 0\n");
}

#[test]
fn reserve_success() {
    let dir = JobDir::new();
    let out = run(&dir, "b", "CREATE 1 2 2\nRESERVE 1 [(1,1) (2,2)]\nSHOW 1\n");
    assert_eq!(out, "1 0\n0 1\n");
}

#[test]
fn reserve_partial_conflict_rolls_back() {
    let dir = JobDir::new();
    let out = run(
        &dir,
        "c",
        "CREATE 1 2 2\nRESERVE 1 [(1,1)]\nRESERVE 1 [(2,2) (1,1)]\nSHOW 1\n",
    );
    assert_eq!(out, "1 0\n0 0\n");
}

#[test]
fn reserve_conflict_on_a_later_seat_rolls_back_the_earlier_one() {
    let dir = JobDir::new();
    let out = run(
        &dir,
        "c2",
        "CREATE 1 2 2\nRESERVE 1 [(2,2)]\nRESERVE 1 [(1,1) (2,2)]\nSHOW 1\n",
    );
    assert_eq!(out, "0 0\n0 1\n");
}

#[test]
fn reserve_with_duplicate_seat_in_one_batch_fails_cleanly() {
    let dir = JobDir::new();
    let out = run(&dir, "c3", "CREATE 1 2 2\nRESERVE 1 [(1,1) (1,1)]\nSHOW 1\n");
    assert_eq!(out, "0 0\n0 0\n");
}

#[test]
fn empty_list() {
    let dir = JobDir::new();
    let out = run(&dir, "d", "LIST\n");
    assert_eq!(out, "No events\n");
}

#[test]
fn list_with_two_events() {
    let dir = JobDir::new();
    let out = run(&dir, "e", "CREATE 7 1 1\nCREATE 3 1 1\nLIST\n");
    assert_eq!(out, "Event: 7\nEvent: 3\n");
}

#[test]
fn running_the_same_job_file_twice_is_idempotent() {
    let dir = JobDir::new();
    let contents = "CREATE 1 2 2\nRESERVE 1 [(1,1) (2,2)]\nSHOW 1\n";
    let first = run(&dir, "f", contents);
    let second = run(&dir, "f", contents);
    assert_eq!(first, second);
}

#[test]
fn barrier_resynchronises_the_thread_batch() {
    let dir = JobDir::new();
    let out = run(
        &dir,
        "g",
        "CREATE 1 1 1\nBARRIER\n\nRESERVE 1 [(1,1)]\nSHOW 1\n",
    );
    assert_eq!(out, "1\n");
}

#[test]
fn wait_targeting_another_thread_delays_its_next_command() {
    let dir = JobDir::new();
    let path = dir.write_jobs(
        "h",
        "CREATE 1 1 1\nWAIT 300 2\nSHOW 1\nRESERVE 1 [(1,1)]\nSHOW 1\n",
    );

    let start = Instant::now();
    let code = run_worker(&path, 2, Duration::ZERO);
    assert_eq!(code, 0);
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_millis(250),
        "expected the targeted thread's next command to be delayed, took {elapsed:?}"
    );
}
