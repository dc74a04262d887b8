//! The in-memory registry of events shared by every thread in one worker
//! process.

use std::collections::HashSet;
use std::io::Write;
use std::sync::{Arc, Mutex, RwLock, RwLockWriteGuard};
use std::thread;
use std::time::Duration;

use log::{debug, trace};

use crate::error::StoreError;
use crate::store::event::Event;

/// Owns every [`Event`] created in one worker process.
///
/// Built fresh in each worker process after it starts (never a global
/// singleton, see spec §9): the parent process never holds one of its own.
pub struct EventStore {
    events: RwLock<Vec<Arc<Event>>>,
    access_delay: Duration,
}

impl EventStore {
    pub fn new(access_delay: Duration) -> Self {
        EventStore {
            events: RwLock::new(Vec::new()),
            access_delay,
        }
    }

    fn delay(&self) {
        if !self.access_delay.is_zero() {
            thread::sleep(self.access_delay);
        }
    }

    /// Creates a new event. Fails if `id` is already taken.
    ///
    /// The duplicate check happens twice: once before taking the delay (to
    /// match the "pre-lookup uses the access delay" wording) and once more
    /// under the write lock immediately before appending, so that two
    /// concurrent `create`s for the same id can never both succeed (I1).
    /// The original C source only checks once, without the write-lock
    /// re-check, which leaves that race open; this closes it without
    /// changing any externally observable single-threaded behaviour.
    pub fn create(&self, id: u32, rows: u32, cols: u32) -> Result<(), StoreError> {
        self.delay();
        if self.events.read().unwrap().iter().any(|e| e.id == id) {
            return Err(StoreError::Duplicate { id });
        }

        let event = Arc::new(Event::new(id, rows, cols));
        let mut events = self.events.write().unwrap();
        if events.iter().any(|e| e.id == id) {
            return Err(StoreError::Duplicate { id });
        }
        debug!("created event {id} ({rows}x{cols})");
        events.push(event);
        Ok(())
    }

    /// Looks up an event by id, applying the access delay before the
    /// traversal (spec §4.1 "get").
    pub fn get(&self, id: u32) -> Option<Arc<Event>> {
        self.delay();
        self.events.read().unwrap().iter().find(|e| e.id == id).cloned()
    }

    /// Reserves `seats` on event `id`, all-or-nothing (I3).
    ///
    /// Seats are sorted by `(row, col)` before locking — mandatory for
    /// deadlock avoidance when a batch touches more than one seat (spec
    /// §4.1 step 3). Each seat's write lock, once acquired, is held until
    /// the whole batch either succeeds or is rolled back, exactly as in
    /// `operations.c::ems_reserve`: this is what keeps a concurrent `SHOW`
    /// from ever observing a partially-applied batch (P6). On failure,
    /// every seat already assigned earlier in this batch is reset to `0`
    /// before its lock is released (`ems_reserve`'s rollback loop), so a
    /// failed batch never leaves `seats` changed (P2). A seat repeated
    /// within one batch is treated as already reserved after its first
    /// assignment, since taking its write lock twice on this thread would
    /// deadlock.
    pub fn reserve(&self, id: u32, seats: &[(u32, u32)]) -> Result<(), StoreError> {
        let event = self.get(id).ok_or(StoreError::NotFound { id })?;

        let mut sorted = seats.to_vec();
        sorted.sort_unstable();

        let reservation_id = event.next_reservation_id();
        let mut held: Vec<RwLockWriteGuard<'_, u32>> = Vec::with_capacity(sorted.len());
        let mut seen: HashSet<usize> = HashSet::with_capacity(sorted.len());

        for &(row, col) in &sorted {
            let index = match event.seat_index(row, col) {
                Some(index) => index,
                None => {
                    rollback(held, &event);
                    return Err(StoreError::InvalidSeat { row, col });
                }
            };

            if !seen.insert(index) {
                rollback(held, &event);
                return Err(StoreError::SeatTaken { row, col });
            }

            let mut guard = event.seat(index).write().unwrap();
            self.delay();
            if *guard != 0 {
                drop(guard);
                rollback(held, &event);
                return Err(StoreError::SeatTaken { row, col });
            }
            *guard = reservation_id;
            held.push(guard);
        }

        trace!("event {id}: reservation {reservation_id} committed over {} seats", held.len());
        Ok(())
    }

    /// Renders the full grid to `out` in one locked write (spec §4.1
    /// "show"). The grid is built in a single buffer first so the output
    /// mutex is held only for the write itself.
    pub fn show(&self, id: u32, out: &Mutex<impl Write>) -> Result<(), ShowError> {
        let event = self.get(id).ok_or(ShowError::Store(StoreError::NotFound { id }))?;

        let mut buffer = String::with_capacity((event.rows * event.cols * 4) as usize);
        for row in 1..=event.rows {
            for col in 1..=event.cols {
                let index = event.seat_index(row, col).expect("row/col within bounds");
                let value = {
                    let guard = event.seat(index).read().unwrap();
                    self.delay();
                    *guard
                };
                buffer.push_str(&value.to_string());
                if col < event.cols {
                    buffer.push(' ');
                }
            }
            buffer.push('\n');
        }

        let mut out = out.lock().unwrap();
        out.write_all(buffer.as_bytes()).map_err(ShowError::Io)
    }

    /// Writes the full event listing as one critical section (spec §4.1
    /// "list_events").
    pub fn list_events(&self, out: &Mutex<impl Write>) -> std::io::Result<()> {
        let events = self.events.read().unwrap();
        let mut out = out.lock().unwrap();
        if events.is_empty() {
            return out.write_all(b"No events\n");
        }
        for event in events.iter() {
            writeln!(out, "Event: {}", event.id)?;
        }
        Ok(())
    }
}

/// Writes `0` back through every guard already assigned in a failed batch,
/// then decrements the reservation counter, mirroring `ems_reserve`'s
/// rollback loop (`operations.c:480-483`). Guards are dropped, releasing
/// their locks, as this returns.
fn rollback(held: Vec<RwLockWriteGuard<'_, u32>>, event: &Event) {
    for mut guard in held {
        *guard = 0;
    }
    event.abort_reservation();
}

/// Failure modes for [`EventStore::show`]: either the event doesn't exist,
/// or the write to `out_fd` itself failed.
#[derive(Debug, thiserror::Error)]
pub enum ShowError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to write SHOW output: {0}")]
    Io(#[source] std::io::Error),
}

/// Sleeps the calling thread for `ms` milliseconds (spec §4.1 "wait").
pub fn wait(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex as StdMutex;

    fn store() -> EventStore {
        EventStore::new(Duration::ZERO)
    }

    #[test]
    fn create_then_duplicate_fails() {
        let s = store();
        s.create(1, 2, 3).unwrap();
        assert!(matches!(s.create(1, 1, 1), Err(StoreError::Duplicate { id: 1 })));
    }

    #[test]
    fn show_renders_empty_grid() {
        let s = store();
        s.create(1, 2, 3).unwrap();
        let out = StdMutex::new(Cursor::new(Vec::new()));
        s.show(1, &out).unwrap();
        let written = out.into_inner().unwrap().into_inner();
        assert_eq!(String::from_utf8(written).unwrap(), "0 0 0\n0 0 0\n");
    }

    #[test]
    fn reserve_marks_seats_with_shared_identifier() {
        let s = store();
        s.create(1, 2, 2).unwrap();
        s.reserve(1, &[(1, 1), (2, 2)]).unwrap();
        let out = StdMutex::new(Cursor::new(Vec::new()));
        s.show(1, &out).unwrap();
        let written = out.into_inner().unwrap().into_inner();
        assert_eq!(String::from_utf8(written).unwrap(), "1 0\n0 1\n");
    }

    #[test]
    fn reserve_partial_conflict_rolls_back_and_preserves_prior_state() {
        let s = store();
        s.create(1, 2, 2).unwrap();
        s.reserve(1, &[(1, 1)]).unwrap();
        let result = s.reserve(1, &[(2, 2), (1, 1)]);
        assert!(matches!(result, Err(StoreError::SeatTaken { row: 1, col: 1 })));

        let out = StdMutex::new(Cursor::new(Vec::new()));
        s.show(1, &out).unwrap();
        let written = out.into_inner().unwrap().into_inner();
        assert_eq!(String::from_utf8(written).unwrap(), "1 0\n0 0\n");
        assert_eq!(s.get(1).unwrap().reservation_count(), 1);
    }

    #[test]
    fn reserve_conflict_on_later_seat_rolls_back_earlier_assignment() {
        let s = store();
        s.create(1, 2, 2).unwrap();
        s.reserve(1, &[(2, 2)]).unwrap();
        let result = s.reserve(1, &[(1, 1), (2, 2)]);
        assert!(matches!(result, Err(StoreError::SeatTaken { row: 2, col: 2 })));

        let out = StdMutex::new(Cursor::new(Vec::new()));
        s.show(1, &out).unwrap();
        let written = out.into_inner().unwrap().into_inner();
        assert_eq!(String::from_utf8(written).unwrap(), "0 0\n0 1\n");
        assert_eq!(s.get(1).unwrap().reservation_count(), 1);
    }

    #[test]
    fn reserve_with_duplicate_seat_in_one_batch_fails_without_panicking() {
        let s = store();
        s.create(1, 2, 2).unwrap();
        let result = s.reserve(1, &[(1, 1), (1, 1)]);
        assert!(matches!(result, Err(StoreError::SeatTaken { row: 1, col: 1 })));

        let out = StdMutex::new(Cursor::new(Vec::new()));
        s.show(1, &out).unwrap();
        let written = out.into_inner().unwrap().into_inner();
        assert_eq!(String::from_utf8(written).unwrap(), "0 0\n0 0\n");
        assert_eq!(s.get(1).unwrap().reservation_count(), 0);
    }

    #[test]
    fn reserve_rejects_out_of_bounds_seat() {
        let s = store();
        s.create(1, 2, 2).unwrap();
        assert!(matches!(
            s.reserve(1, &[(3, 1)]),
            Err(StoreError::InvalidSeat { row: 3, col: 1 })
        ));
        assert_eq!(s.get(1).unwrap().reservation_count(), 0);
    }

    #[test]
    fn reserve_on_missing_event_fails() {
        let s = store();
        assert!(matches!(s.reserve(1, &[(1, 1)]), Err(StoreError::NotFound { id: 1 })));
    }

    #[test]
    fn list_events_empty_then_populated() {
        let s = store();
        let out = StdMutex::new(Cursor::new(Vec::new()));
        s.list_events(&out).unwrap();
        assert_eq!(
            String::from_utf8(out.into_inner().unwrap().into_inner()).unwrap(),
            "No events\n"
        );

        let s = store();
        s.create(7, 1, 1).unwrap();
        s.create(3, 1, 1).unwrap();
        let out = StdMutex::new(Cursor::new(Vec::new()));
        s.list_events(&out).unwrap();
        assert_eq!(
            String::from_utf8(out.into_inner().unwrap().into_inner()).unwrap(),
            "Event: 7\nEvent: 3\n"
        );
    }

    #[test]
    fn row_equals_rows_and_col_equals_cols_are_accepted() {
        let s = store();
        s.create(1, 2, 3).unwrap();
        assert!(s.reserve(1, &[(2, 3)]).is_ok());
    }
}
