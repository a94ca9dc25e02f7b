//! The seat store: inventory and ledger behind one transaction boundary
//!
//! Both tables live behind a single `parking_lot::Mutex`; the scope of the
//! lock guard is the transaction. [`SeatStore::commit_allocation`] is the
//! one place where the two records of an allocation are written: the
//! conditional inventory decrement and the unique-constrained ledger
//! append happen all-or-nothing, and a refused append rolls the decrement
//! back before the lock is released, so a half-applied allocation is
//! never observable.

use chrono::Utc;
use parking_lot::Mutex;
use railbook_core::{Booking, BookingId, TrainId, TrainSnapshot, UserId};
use thiserror::Error;

use crate::inventory::{Decremented, DecrementError, InventoryTable};
use crate::ledger::{AppendError, LedgerTable};

/// Why an allocation transaction did not commit
#[derive(Clone, Copy, PartialEq, Eq, Error, Debug)]
pub enum CommitError {
    /// The conditional decrement failed; nothing was written
    #[error(transparent)]
    Decrement(#[from] DecrementError),
    /// The ledger refused the append; the decrement was rolled back
    #[error(transparent)]
    Append(AppendError),
}

#[derive(Default)]
struct Tables {
    inventory: InventoryTable,
    ledger: LedgerTable,
}

/// Persistent state of the allocation system
#[derive(Default)]
pub struct SeatStore {
    tables: Mutex<Tables>,
    /// Makes the next ledger append fail after its paired decrement has
    /// been applied, to exercise the rollback path.
    #[cfg(test)]
    fail_next_append: std::sync::atomic::AtomicBool,
}

impl SeatStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a train with all `total_seats` seats available
    pub fn create_train(&self, total_seats: u32) -> TrainId {
        let train = TrainId::new();
        self.tables.lock().inventory.insert(train, total_seats);
        train
    }

    /// Read the current inventory row of a train
    pub fn snapshot(&self, train: TrainId) -> Option<TrainSnapshot> {
        self.tables.lock().inventory.snapshot(train)
    }

    /// Compare-and-swap decrement of a train's availability, on its own
    ///
    /// The allocation path goes through [`Self::commit_allocation`]
    /// instead, which pairs this write with the ledger append.
    pub fn conditional_decrement(
        &self,
        train: TrainId,
        expected_version: u64,
    ) -> Result<Decremented, DecrementError> {
        self.tables
            .lock()
            .inventory
            .conditional_decrement(train, expected_version)
    }

    /// Commit one allocation: conditional decrement plus ledger append
    ///
    /// `expected` is the snapshot the caller based its decision on; the
    /// decrement is keyed by its version. On success the granted seat
    /// number is `total_seats − new_available`; the decrement already
    /// serialized this caller's claim on that seat, so numbering off the
    /// post-decrement count is race-free. If the ledger refuses the
    /// append, the decrement is undone under the same lock and the whole
    /// transaction reports failure.
    pub fn commit_allocation(
        &self,
        expected: TrainSnapshot,
        user: UserId,
    ) -> Result<Booking, CommitError> {
        let mut tables = self.tables.lock();
        let done = tables
            .inventory
            .conditional_decrement(expected.train, expected.version)?;

        let booking = Booking {
            id: BookingId::new(),
            user,
            train: expected.train,
            seat_number: expected.total_seats - done.new_available,
            created_at: Utc::now(),
        };

        let appended = if self.take_append_fault() {
            Err(AppendError::DuplicateSeat {
                seat_number: booking.seat_number,
            })
        } else {
            tables.ledger.append(booking)
        };
        if let Err(err) = appended {
            tables.inventory.restore(expected.train);
            return Err(CommitError::Append(err));
        }
        Ok(booking)
    }

    /// Look up a booking by id, visible only to its owner
    pub fn booking(&self, booking: BookingId, user: UserId) -> Option<Booking> {
        self.tables.lock().ledger.lookup(booking, user)
    }

    /// Whether a booking with this id exists, regardless of owner
    pub fn booking_exists(&self, booking: BookingId) -> bool {
        self.tables.lock().ledger.exists(booking)
    }

    /// Number of allocations recorded for a train
    pub fn allocation_count(&self, train: TrainId) -> usize {
        self.tables.lock().ledger.count_for(train)
    }

    /// Arm the append fault: the next `commit_allocation` will have its
    /// ledger write refused after the decrement, forcing the rollback.
    #[cfg(test)]
    pub(crate) fn inject_append_fault(&self) {
        self.fail_next_append
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn take_append_fault(&self) -> bool {
        self.fail_next_append
            .swap(false, std::sync::atomic::Ordering::SeqCst)
    }

    #[cfg(not(test))]
    fn take_append_fault(&self) -> bool {
        false
    }
}
