//! The job-file grammar's pull API.
//!
//! Out of scope for the concurrency core's *design* (see spec §1): the core
//! only relies on the contract that [`next_command`] reads exactly one
//! command, including its arguments, from the shared reader before
//! returning, and performs no read-ahead past the command it reports. This
//! keeps it safe to call under a lock shared with other threads (the lock
//! only needs to be held for the duration of one call).

use std::io::BufRead;

/// Upper bound on seats accepted by a single `RESERVE`. Arbitrary but
/// generous: the original leaves this to a `constants.h` this pack's
/// retrieval did not keep.
pub const MAX_RESERVATION_SIZE: usize = 256;

/// One parsed command, together with whatever arguments its tag carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { event_id: u32, rows: u32, cols: u32 },
    Reserve { event_id: u32, seats: Vec<(u32, u32)> },
    Show { event_id: u32 },
    List,
    Wait { delay_ms: u64, thread_id: Option<u32> },
    Barrier,
    Help,
    /// A blank line: not an error, just nothing to do.
    Empty,
    /// A line that doesn't parse as any known command.
    Invalid,
    /// End of commands: the reader is exhausted.
    Eoc,
}

/// Reads and parses exactly one command from `reader`.
///
/// One line is one command (or `Empty`/`Eoc`). Call this with the reader
/// locked; nothing past the returned command's own line is consumed.
pub fn next_command(reader: &mut impl BufRead) -> Command {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => return Command::Eoc,
        Ok(_) => {}
        Err(_) => return Command::Invalid,
    }

    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let mut tokens = line.split_whitespace();
    let tag = match tokens.next() {
        Some(t) => t,
        None => return Command::Empty,
    };

    match tag.to_ascii_uppercase().as_str() {
        "CREATE" => parse_create(tokens),
        "RESERVE" => parse_reserve(tokens),
        "SHOW" => parse_show(tokens),
        "LIST" => Command::List,
        "WAIT" => parse_wait(tokens),
        "BARRIER" => Command::Barrier,
        "HELP" => Command::Help,
        _ => Command::Invalid,
    }
}

fn parse_create<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Command {
    let event_id = tokens.next().and_then(|t| t.parse().ok());
    let rows = tokens.next().and_then(|t| t.parse().ok());
    let cols = tokens.next().and_then(|t| t.parse().ok());

    match (event_id, rows, cols) {
        (Some(event_id), Some(rows), Some(cols)) => Command::Create { event_id, rows, cols },
        _ => Command::Invalid,
    }
}

fn parse_reserve<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Command {
    let event_id = match tokens.next().and_then(|t| t.parse().ok()) {
        Some(id) => id,
        None => return Command::Invalid,
    };

    // The seat list may be wrapped in a literal `[...]`, matching spec.md
    // §8's scenario examples (`RESERVE 1 [(1,1) (2,2)]`); the brackets, if
    // present, belong to the outermost and innermost token only.
    let mut coord_tokens: Vec<&str> = tokens.collect();
    if let Some(first) = coord_tokens.first_mut() {
        *first = first.strip_prefix('[').unwrap_or(first);
    }
    if let Some(last) = coord_tokens.last_mut() {
        *last = last.strip_suffix(']').unwrap_or(last);
    }
    coord_tokens.retain(|t| !t.is_empty());

    let mut seats = Vec::new();
    for tok in coord_tokens {
        match parse_coord(tok) {
            Some(coord) => seats.push(coord),
            None => return Command::Invalid,
        }
        if seats.len() > MAX_RESERVATION_SIZE {
            return Command::Invalid;
        }
    }

    if seats.is_empty() {
        return Command::Invalid;
    }

    Command::Reserve { event_id, seats }
}

fn parse_coord(tok: &str) -> Option<(u32, u32)> {
    let inner = tok.strip_prefix('(')?.strip_suffix(')')?;
    let (row, col) = inner.split_once(',')?;
    Some((row.trim().parse().ok()?, col.trim().parse().ok()?))
}

fn parse_show<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Command {
    match tokens.next().and_then(|t| t.parse().ok()) {
        Some(event_id) => Command::Show { event_id },
        None => Command::Invalid,
    }
}

fn parse_wait<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Command {
    let delay_ms = match tokens.next().and_then(|t| t.parse().ok()) {
        Some(d) => d,
        None => return Command::Invalid,
    };
    let thread_id = match tokens.next() {
        Some(t) => match t.parse().ok() {
            Some(id) => Some(id),
            None => return Command::Invalid,
        },
        None => None,
    };
    Command::Wait { delay_ms, thread_id }
}

/// Consumes bytes from `reader` up to and including the next `\n`, or EOF.
///
/// Used by the worker pool between barrier cycles to land back on a command
/// boundary (see spec §4.4). Preserved verbatim from the original's
/// behaviour: if the consumed line was the very last line in the file, or
/// if a blank line immediately follows a `BARRIER`, that blank line is
/// silently eaten too. This is a known quirk, not a bug to fix.
pub fn cleanup_line(reader: &mut impl BufRead) {
    let mut discard = String::new();
    let _ = reader.read_line(&mut discard);
}
