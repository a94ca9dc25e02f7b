//! The concurrency controller: optimistic allocation with bounded retries
//!
//! Optimistic (version-stamped) writes are used instead of holding a row
//! lock across the read-decide-write window: on a popular train that
//! would serialize every reader behind the slowest writer, while losing a
//! version race only costs a cheap bounded retry.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;
use railbook_core::{Booking, BookingError, Config, TrainId, UserId};
use tracing::{debug, trace};

use crate::inventory::DecrementError;
use crate::store::{CommitError, SeatStore};

/// Allocates seats against the store, absorbing version conflicts
pub struct SeatAllocator {
    store: Arc<SeatStore>,
    max_retries: u32,
    retry_backoff: Option<Duration>,
}

impl SeatAllocator {
    /// Create an allocator over `store`, configured by `config`
    pub fn new(store: Arc<SeatStore>, config: &Config) -> Self {
        Self {
            store,
            // A zero budget would make every request fail before trying.
            max_retries: config.max_retries.max(1),
            retry_backoff: config.retry_backoff,
        }
    }

    /// Allocate one seat on `train` for `user`
    ///
    /// Loops up to the configured retry bound: read a snapshot, attempt
    /// the versioned decrement-plus-append transaction, and go around
    /// again if a concurrent allocation won the race. A train that is
    /// sold out at read time fails terminally with
    /// [`BookingError::SoldOut`] and is never retried; a spent retry
    /// budget fails with [`BookingError::Contended`], which the caller
    /// may resubmit.
    pub fn allocate(&self, train: TrainId, user: UserId) -> Result<Booking, BookingError> {
        for attempt in 1..=self.max_retries {
            let snapshot = self
                .store
                .snapshot(train)
                .ok_or(BookingError::TrainNotFound)?;
            if snapshot.available_seats == 0 {
                return Err(BookingError::SoldOut);
            }

            match self.store.commit_allocation(snapshot, user) {
                Ok(booking) => {
                    debug!(
                        train = %train,
                        user = %user,
                        seat = booking.seat_number,
                        attempt,
                        "seat allocated"
                    );
                    return Ok(booking);
                }
                Err(CommitError::Decrement(DecrementError::SoldOut)) => {
                    return Err(BookingError::SoldOut);
                }
                Err(CommitError::Decrement(DecrementError::UnknownTrain)) => {
                    return Err(BookingError::TrainNotFound);
                }
                // Lost the race, or the ledger backstop fired and the
                // transaction was rolled back; both are worth a fresh
                // snapshot and another attempt.
                Err(CommitError::Decrement(DecrementError::VersionConflict { .. }))
                | Err(CommitError::Append(_)) => {
                    trace!(train = %train, attempt, "allocation attempt lost its version race");
                    if attempt < self.max_retries {
                        self.backoff();
                    }
                }
            }
        }

        debug!(train = %train, user = %user, attempts = self.max_retries, "allocation contended out");
        Err(BookingError::Contended {
            attempts: self.max_retries,
        })
    }

    /// Sleep a random slice of the configured backoff cap
    ///
    /// Jitter only; correctness never depends on it.
    fn backoff(&self) {
        if let Some(cap) = self.retry_backoff {
            if !cap.is_zero() {
                let nanos = rand::thread_rng().gen_range(0..cap.as_nanos().max(1) as u64);
                thread::sleep(Duration::from_nanos(nanos));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator(store: &Arc<SeatStore>, max_retries: u32) -> SeatAllocator {
        SeatAllocator::new(
            store.clone(),
            &Config {
                max_retries,
                retry_backoff: None,
                ..Config::default()
            },
        )
    }

    #[test]
    fn allocates_while_seats_remain_then_sells_out() {
        let store = Arc::new(SeatStore::new());
        let train = store.create_train(2);
        let allocator = allocator(&store, 5);

        let first = allocator.allocate(train, UserId::new()).unwrap();
        let second = allocator.allocate(train, UserId::new()).unwrap();
        assert_eq!(first.seat_number, 1);
        assert_eq!(second.seat_number, 2);

        let err = allocator.allocate(train, UserId::new()).unwrap_err();
        assert_eq!(err, BookingError::SoldOut);
        // Terminal failures leave the version untouched.
        assert_eq!(store.snapshot(train).unwrap().version, 2);
    }

    #[test]
    fn unknown_train_is_terminal() {
        let store = Arc::new(SeatStore::new());
        let allocator = allocator(&store, 5);
        assert_eq!(
            allocator.allocate(TrainId::new(), UserId::new()).unwrap_err(),
            BookingError::TrainNotFound
        );
    }

    #[test]
    fn absorbs_a_rolled_back_attempt_and_succeeds_on_retry() {
        let store = Arc::new(SeatStore::new());
        let train = store.create_train(3);
        let allocator = allocator(&store, 5);

        // First attempt hits the ledger backstop and is rolled back; the
        // retry must land, and the failed attempt must not burn a seat or
        // a version step.
        store.inject_append_fault();
        let booking = allocator.allocate(train, UserId::new()).unwrap();
        assert_eq!(booking.seat_number, 1);

        let snap = store.snapshot(train).unwrap();
        assert_eq!(snap.available_seats, 2);
        assert_eq!(snap.version, 1);
    }

    #[test]
    fn spent_retry_budget_reports_contended() {
        let store = Arc::new(SeatStore::new());
        let train = store.create_train(3);
        let allocator = allocator(&store, 1);

        store.inject_append_fault();
        let err = allocator.allocate(train, UserId::new()).unwrap_err();
        assert_eq!(err, BookingError::Contended { attempts: 1 });

        // Nothing committed, nothing leaked.
        let snap = store.snapshot(train).unwrap();
        assert_eq!(snap.available_seats, 3);
        assert_eq!(snap.version, 0);
    }

    #[test]
    fn two_racers_one_seat_exactly_one_wins() {
        let store = Arc::new(SeatStore::new());
        let train = store.create_train(1);
        let barrier = Arc::new(std::sync::Barrier::new(2));

        let rival_store = store.clone();
        let rival_barrier = barrier.clone();
        let rival = thread::spawn(move || {
            let allocator = SeatAllocator::new(rival_store, &Config::default());
            rival_barrier.wait();
            allocator.allocate(train, UserId::new())
        });

        let allocator = allocator(&store, 5);
        barrier.wait();
        let mine = allocator.allocate(train, UserId::new());
        let theirs = rival.join().unwrap();

        assert_eq!(
            [&mine, &theirs].iter().filter(|r| r.is_ok()).count(),
            1,
            "exactly one racer wins the only seat"
        );
        for outcome in [mine, theirs] {
            match outcome {
                Ok(booking) => assert_eq!(booking.seat_number, 1),
                Err(err) => assert!(matches!(
                    err,
                    BookingError::SoldOut | BookingError::Contended { .. }
                )),
            }
        }
        let snap = store.snapshot(train).unwrap();
        assert_eq!(snap.available_seats, 0);
        assert_eq!(snap.version, 1);
    }
}
