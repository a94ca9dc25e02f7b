//! Booking ledger: append-only allocation records
//!
//! Appends happen only inside the store's allocation transaction. The
//! per-train seat-number index doubles as a uniqueness constraint: the
//! final backstop against double allocation, independent of the
//! inventory's version checking.

use std::collections::{HashMap, HashSet};

use railbook_core::{Booking, BookingId, TrainId, UserId};
use thiserror::Error;

/// Why an append was refused
#[derive(Clone, Copy, PartialEq, Eq, Error, Debug)]
pub enum AppendError {
    /// The seat number is already taken on this train
    #[error("seat {seat_number} already allocated on this train")]
    DuplicateSeat {
        /// The contested seat number
        seat_number: u32,
    },
}

/// The allocation records of all trains
#[derive(Default)]
pub struct LedgerTable {
    bookings: HashMap<BookingId, Booking>,
    seats_taken: HashMap<TrainId, HashSet<u32>>,
}

impl LedgerTable {
    /// Append an allocation record
    ///
    /// Refuses the write if the seat number is already recorded for the
    /// train; the caller rolls the paired decrement back in that case.
    pub fn append(&mut self, booking: Booking) -> Result<(), AppendError> {
        let taken = self.seats_taken.entry(booking.train).or_default();
        if !taken.insert(booking.seat_number) {
            return Err(AppendError::DuplicateSeat {
                seat_number: booking.seat_number,
            });
        }
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    /// Look a booking up by id, scoped to its owner
    ///
    /// A booking owned by someone else is invisible to the caller.
    pub fn lookup(&self, booking: BookingId, user: UserId) -> Option<Booking> {
        self.bookings
            .get(&booking)
            .filter(|b| b.user == user)
            .copied()
    }

    /// Whether a booking with this id exists at all, regardless of owner
    pub fn exists(&self, booking: BookingId) -> bool {
        self.bookings.contains_key(&booking)
    }

    /// Number of allocations recorded for a train
    pub fn count_for(&self, train: TrainId) -> usize {
        self.seats_taken.get(&train).map_or(0, HashSet::len)
    }
}
