//! Seat inventory table: one versioned capacity row per train
//!
//! The table itself is plain data; [`SeatStore`](crate::store::SeatStore)
//! owns it behind the transaction mutex. `available_seats` and `version`
//! are only ever written through [`InventoryTable::conditional_decrement`]
//! (and its exact inverse [`InventoryTable::restore`], used for rollback).

use std::collections::HashMap;

use railbook_core::{TrainId, TrainSnapshot};
use thiserror::Error;

/// Why a conditional decrement did not happen
#[derive(Clone, Copy, PartialEq, Eq, Error, Debug)]
pub enum DecrementError {
    /// The stored version no longer matches the caller's snapshot;
    /// a concurrent allocation won the race. Retryable.
    #[error("version conflict: row moved past expected version {expected}")]
    VersionConflict {
        /// Version the caller read before attempting the write
        expected: u64,
    },
    /// Zero seats available at write time; terminal
    #[error("sold out")]
    SoldOut,
    /// No row for the given train
    #[error("unknown train")]
    UnknownTrain,
}

/// Result of a successful conditional decrement
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Decremented {
    /// Seats left after this decrement
    pub new_available: u32,
    /// Version stamp after this decrement
    pub new_version: u64,
}

struct TrainRow {
    total_seats: u32,
    available_seats: u32,
    version: u64,
}

/// The capacity rows of all trains
#[derive(Default)]
pub struct InventoryTable {
    rows: HashMap<TrainId, TrainRow>,
}

impl InventoryTable {
    /// Insert a new train with all seats available
    pub fn insert(&mut self, train: TrainId, total_seats: u32) {
        self.rows.insert(
            train,
            TrainRow {
                total_seats,
                available_seats: total_seats,
                version: 0,
            },
        );
    }

    /// Read the current state of a train's row
    pub fn snapshot(&self, train: TrainId) -> Option<TrainSnapshot> {
        self.rows.get(&train).map(|row| TrainSnapshot {
            train,
            available_seats: row.available_seats,
            total_seats: row.total_seats,
            version: row.version,
        })
    }

    /// Compare-and-swap decrement of a train's availability
    ///
    /// Succeeds only if the stored version still equals `expected_version`
    /// and at least one seat is available; decrements `available_seats`
    /// and increments `version` in the same step. A genuine zero reports
    /// [`DecrementError::SoldOut`], a lost race reports
    /// [`DecrementError::VersionConflict`].
    pub fn conditional_decrement(
        &mut self,
        train: TrainId,
        expected_version: u64,
    ) -> Result<Decremented, DecrementError> {
        let row = self
            .rows
            .get_mut(&train)
            .ok_or(DecrementError::UnknownTrain)?;
        if row.version != expected_version {
            return Err(DecrementError::VersionConflict {
                expected: expected_version,
            });
        }
        if row.available_seats == 0 {
            return Err(DecrementError::SoldOut);
        }
        row.available_seats -= 1;
        row.version += 1;
        Ok(Decremented {
            new_available: row.available_seats,
            new_version: row.version,
        })
    }

    /// Undo one decrement, restoring availability and version
    ///
    /// Only the store's rollback path calls this, while still holding the
    /// transaction mutex, so the undone state is never observable.
    pub fn restore(&mut self, train: TrainId) {
        if let Some(row) = self.rows.get_mut(&train) {
            debug_assert!(row.available_seats < row.total_seats);
            debug_assert!(row.version > 0);
            row.available_seats += 1;
            row.version -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(train: TrainId, seats: u32) -> InventoryTable {
        let mut table = InventoryTable::default();
        table.insert(train, seats);
        table
    }

    #[test]
    fn decrement_bumps_version_once() {
        let train = TrainId::new();
        let mut table = table_with(train, 3);

        let done = table.conditional_decrement(train, 0).unwrap();
        assert_eq!(done.new_available, 2);
        assert_eq!(done.new_version, 1);

        let snap = table.snapshot(train).unwrap();
        assert_eq!(snap.available_seats, 2);
        assert_eq!(snap.version, 1);
        assert_eq!(snap.total_seats, 3);
    }

    #[test]
    fn stale_version_is_a_conflict_and_leaves_the_row_alone() {
        let train = TrainId::new();
        let mut table = table_with(train, 3);
        table.conditional_decrement(train, 0).unwrap();

        let err = table.conditional_decrement(train, 0).unwrap_err();
        assert_eq!(err, DecrementError::VersionConflict { expected: 0 });

        let snap = table.snapshot(train).unwrap();
        assert_eq!(snap.available_seats, 2);
        assert_eq!(snap.version, 1);
    }

    #[test]
    fn zero_availability_is_sold_out_not_a_conflict() {
        let train = TrainId::new();
        let mut table = table_with(train, 1);
        table.conditional_decrement(train, 0).unwrap();

        let err = table.conditional_decrement(train, 1).unwrap_err();
        assert_eq!(err, DecrementError::SoldOut);
        assert_eq!(table.snapshot(train).unwrap().version, 1);
    }

    #[test]
    fn restore_is_the_exact_inverse() {
        let train = TrainId::new();
        let mut table = table_with(train, 2);
        table.conditional_decrement(train, 0).unwrap();

        table.restore(train);
        let snap = table.snapshot(train).unwrap();
        assert_eq!(snap.available_seats, 2);
        assert_eq!(snap.version, 0);
    }

    #[test]
    fn unknown_train_is_reported() {
        let mut table = InventoryTable::default();
        assert!(table.snapshot(TrainId::new()).is_none());
        assert_eq!(
            table.conditional_decrement(TrainId::new(), 0).unwrap_err(),
            DecrementError::UnknownTrain
        );
    }
}
