//! The booking queue: admission decoupled from allocation
//!
//! `submit` enqueues a job and returns immediately; a bounded pool of
//! worker threads drains the channel and runs each job through the
//! allocator, recording the terminal outcome in the job table. Funneling
//! demand through the pool caps the number of simultaneous contenders on
//! any one train, which keeps retry amplification down.
//!
//! Delivery is at-most-once: each job is consumed by exactly one worker
//! and processed exactly once. Terminal failures are recorded, never
//! redelivered. Jobs carry no idempotency key, so automatic redelivery
//! could allocate twice for one logical request. Resubmission is the
//! caller's explicit choice.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use dashmap::DashMap;
use railbook_core::{BookingError, JobId, JobStatus, TrainId, UserId};
use tracing::{info, warn};

use crate::allocator::SeatAllocator;

struct BookingJob {
    id: JobId,
    train: TrainId,
    user: UserId,
}

/// Admission queue in front of the allocator
pub struct BookingQueue {
    jobs: Arc<DashMap<JobId, JobStatus>>,
    sender: flume::Sender<BookingJob>,
    workers: Vec<JoinHandle<()>>,
}

impl BookingQueue {
    /// Start a queue with `workers` worker threads over `allocator`
    pub fn start(allocator: Arc<SeatAllocator>, workers: u32) -> Self {
        let jobs: Arc<DashMap<JobId, JobStatus>> = Arc::new(DashMap::new());
        let (sender, receiver) = flume::unbounded::<BookingJob>();

        let workers = (0..workers.max(1))
            .map(|i| {
                let allocator = allocator.clone();
                let receiver = receiver.clone();
                let jobs = jobs.clone();
                thread::Builder::new()
                    .name(format!("booking_worker_{i}"))
                    .spawn(move || {
                        // Runs until the queue side drops the sender; every
                        // job received before that reaches a terminal status.
                        for job in receiver.iter() {
                            let status = match allocator.allocate(job.train, job.user) {
                                Ok(booking) => JobStatus::Confirmed(booking.id),
                                Err(err) => JobStatus::Failed(err),
                            };
                            jobs.insert(job.id, status);
                        }
                    })
                    .expect("spawning a booking worker failed")
            })
            .collect();

        Self {
            jobs,
            sender,
            workers,
        }
    }

    /// Admit a booking request; returns once the job is queued
    pub fn submit(&self, train: TrainId, user: UserId) -> Result<JobId, BookingError> {
        let id = JobId::new();
        self.jobs.insert(id, JobStatus::Queued);
        if self
            .sender
            .send(BookingJob { id, train, user })
            .is_err()
        {
            // Channel closed under us: the system is shutting down.
            self.jobs.remove(&id);
            return Err(BookingError::Infrastructure(
                "booking queue is closed".into(),
            ));
        }
        Ok(id)
    }

    /// Current status of an admitted job
    pub fn status(&self, job: JobId) -> Option<JobStatus> {
        self.jobs.get(&job).map(|entry| entry.value().clone())
    }

    /// Close the queue and wait for the workers to drain it
    pub fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            if worker.join().is_err() {
                warn!("a booking worker panicked during shutdown");
            }
        }
        info!("booking queue drained and stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use railbook_core::Config;

    use super::*;
    use crate::store::SeatStore;

    fn wait_terminal(queue: &BookingQueue, job: JobId) -> JobStatus {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match queue.status(job) {
                Some(JobStatus::Queued) | None => {
                    assert!(Instant::now() < deadline, "job never reached a terminal status");
                    thread::sleep(Duration::from_millis(1));
                }
                Some(terminal) => return terminal,
            }
        }
    }

    #[test]
    fn submitted_jobs_reach_terminal_outcomes() {
        let store = Arc::new(SeatStore::new());
        let train = store.create_train(1);
        let allocator = Arc::new(SeatAllocator::new(store.clone(), &Config::default()));
        let queue = BookingQueue::start(allocator, 2);

        let winner = queue.submit(train, UserId::new()).unwrap();
        let loser = queue.submit(train, UserId::new()).unwrap();

        let outcomes = [wait_terminal(&queue, winner), wait_terminal(&queue, loser)];
        let confirmed = outcomes
            .iter()
            .filter(|s| matches!(s, JobStatus::Confirmed(_)))
            .count();
        assert_eq!(confirmed, 1);
        for status in &outcomes {
            if let JobStatus::Failed(err) = status {
                assert!(matches!(
                    err,
                    BookingError::SoldOut | BookingError::Contended { .. }
                ));
            }
        }

        queue.shutdown();
        assert_eq!(store.snapshot(train).unwrap().available_seats, 0);
    }

    #[test]
    fn shutdown_drains_admitted_jobs() {
        let store = Arc::new(SeatStore::new());
        let train = store.create_train(8);
        let allocator = Arc::new(SeatAllocator::new(store.clone(), &Config::default()));
        let queue = BookingQueue::start(allocator, 1);

        let jobs: Vec<_> = (0..8)
            .map(|_| queue.submit(train, UserId::new()).unwrap())
            .collect();
        let jobs_table = queue.jobs.clone();
        queue.shutdown();

        for job in jobs {
            assert!(matches!(
                jobs_table.get(&job).map(|e| e.value().clone()),
                Some(JobStatus::Confirmed(_))
            ));
        }
        assert_eq!(store.allocation_count(train), 8);
    }
}
