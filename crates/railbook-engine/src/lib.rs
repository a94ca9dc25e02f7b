//! Implementation of the seat allocation core
//!
//! [`launch`] wires the three pieces together: the [`store`] holding the
//! versioned inventory rows and the booking ledger, the [`allocator`]
//! that owns the optimistic retry loop, and the [`queue`] whose worker
//! pool runs admitted jobs through that same allocator. The returned
//! [`BookingSystem`] implements [`railbook_core::BookingService`] and is
//! what the gateway (or the tests) talk to.

#![warn(missing_docs)]

use std::sync::Arc;

use railbook_core::{
    Booking, BookingError, BookingId, BookingService, Config, JobId, JobStatus, TrainId,
    TrainSnapshot, UserId,
};
use tracing::{info, warn};

mod allocator;
mod inventory;
mod ledger;
mod queue;
mod store;

pub use allocator::SeatAllocator;
pub use inventory::{DecrementError, Decremented};
pub use ledger::AppendError;
pub use store::{CommitError, SeatStore};

use queue::BookingQueue;

/// Entrypoint: construct a running seat allocation system
pub fn launch(config: &Config) -> BookingSystem {
    let store = Arc::new(SeatStore::new());
    let allocator = Arc::new(SeatAllocator::new(store.clone(), config));
    let queue = BookingQueue::start(allocator.clone(), config.workers);
    info!(
        workers = config.workers.max(1),
        max_retries = config.max_retries,
        "seat allocation system started"
    );
    BookingSystem {
        store,
        allocator,
        queue,
    }
}

/// The assembled system: store, allocator, and booking queue
pub struct BookingSystem {
    store: Arc<SeatStore>,
    allocator: Arc<SeatAllocator>,
    queue: BookingQueue,
}

impl BookingSystem {
    /// Allocate a seat synchronously, bypassing the queue
    ///
    /// Same controller the queue workers use, so the same invariants
    /// hold on both paths.
    pub fn allocate(&self, train: TrainId, user: UserId) -> Result<Booking, BookingError> {
        self.allocator.allocate(train, user)
    }
}

impl BookingService for BookingSystem {
    fn submit_booking(&self, train: TrainId, user: UserId) -> Result<JobId, BookingError> {
        if train.is_nil() {
            return Err(BookingError::Validation("train id must be provided".into()));
        }
        if user.is_nil() {
            return Err(BookingError::Validation("user id must be provided".into()));
        }
        // Reject unknown trains at admission instead of queueing a job
        // that can only fail.
        if self.store.snapshot(train).is_none() {
            return Err(BookingError::TrainNotFound);
        }
        self.queue.submit(train, user)
    }

    fn booking_status(&self, job: JobId) -> Result<JobStatus, BookingError> {
        self.queue.status(job).ok_or(BookingError::JobNotFound)
    }

    fn booking(&self, booking: BookingId, user: UserId) -> Result<Booking, BookingError> {
        match self.store.booking(booking, user) {
            Some(found) => Ok(found),
            None => {
                if self.store.booking_exists(booking) {
                    // Ownership violation; masked as not-found so the
                    // response does not disclose foreign bookings.
                    warn!(booking = %booking, user = %user, "booking lookup by non-owner");
                }
                Err(BookingError::BookingNotFound)
            }
        }
    }

    fn seat_availability(&self, train: TrainId) -> Result<TrainSnapshot, BookingError> {
        self.store.snapshot(train).ok_or(BookingError::TrainNotFound)
    }

    fn add_train(&self, total_seats: u32) -> Result<TrainId, BookingError> {
        if total_seats == 0 {
            return Err(BookingError::Validation(
                "a train needs at least one seat".into(),
            ));
        }
        let train = self.store.create_train(total_seats);
        info!(train = %train, total_seats, "train created");
        Ok(train)
    }

    fn shutdown(self) {
        self.queue.shutdown();
    }
}
