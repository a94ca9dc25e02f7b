//! Shared contract of the seat allocation system: ids, records, errors,
//! configuration, and the [`BookingService`] trait the gateway talks to.
#![warn(missing_docs)]

mod error;
mod service;
mod types;

use std::time::Duration;

pub use error::BookingError;
pub use service::BookingService;
pub use types::{Booking, BookingId, JobId, JobStatus, TrainId, TrainSnapshot, UserId};

/// Configuration of the seat allocation system
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Maximum number of allocation attempts before a request fails with
    /// [`BookingError::Contended`]. A version conflict consumes one attempt.
    pub max_retries: u32,
    /// Number of booking queue worker threads
    pub workers: u32,
    /// Upper bound for the randomized sleep between retry attempts,
    /// or `None` to retry immediately
    pub retry_backoff: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: 5,
            workers: 2,
            retry_backoff: Some(Duration::from_millis(1)),
        }
    }
}
