//! Test harness for driving the seat allocation system
//!
//! Wraps [`railbook_engine::launch`] in a builder-style context so the
//! scenario tests stay declarative.

use std::time::{Duration, Instant};

use eyre::{eyre, Result};
use railbook_core::{BookingService, Config, JobId, JobStatus, TrainId, UserId};
use railbook_engine::BookingSystem;

/// Builder for a [`TestCtx`]
#[derive(Default)]
pub struct TestCtxBuilder {
    config: Config,
}

impl TestCtxBuilder {
    /// Start from the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the allocator's retry bound
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the number of queue workers
    pub fn with_workers(mut self, workers: u32) -> Self {
        self.config.workers = workers;
        self
    }

    /// Disable the randomized retry backoff
    pub fn without_backoff(mut self) -> Self {
        self.config.retry_backoff = None;
        self
    }

    /// Launch the system
    pub fn build(self) -> TestCtx {
        TestCtx {
            system: railbook_engine::launch(&self.config),
        }
    }
}

/// A running seat allocation system under test
pub struct TestCtx {
    /// The system itself; tests call [`BookingService`] methods on it
    pub system: BookingSystem,
}

impl TestCtx {
    /// Create a train, failing the test on refusal
    pub fn add_train(&self, total_seats: u32) -> Result<TrainId> {
        Ok(self.system.add_train(total_seats)?)
    }

    /// Poll a job until it leaves [`JobStatus::Queued`]
    pub fn wait_terminal(&self, job: JobId) -> Result<JobStatus> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match self.system.booking_status(job)? {
                JobStatus::Queued => {
                    if Instant::now() >= deadline {
                        return Err(eyre!("job {job} never reached a terminal status"));
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
                terminal => return Ok(terminal),
            }
        }
    }

    /// Shut the system down
    pub fn finish(self) {
        self.system.shutdown();
    }
}

/// A fresh requester id
pub fn user() -> UserId {
    UserId::new()
}
