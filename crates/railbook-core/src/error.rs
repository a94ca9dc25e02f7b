use thiserror::Error;

/// Failure taxonomy of the seat allocation system
///
/// Version conflicts between racing allocators are absorbed inside the
/// engine's retry loop and never appear here; what does appear is either
/// the caller's fault (`Validation`), a terminal fact about the world
/// (`TrainNotFound`, `BookingNotFound`, `SoldOut`), a spent retry budget
/// (`Contended`, retryable by resubmitting), or a broken component
/// (`Infrastructure`).
#[derive(Clone, PartialEq, Eq, Error, Debug)]
pub enum BookingError {
    /// The request was malformed; resubmitting it unchanged cannot succeed
    #[error("invalid request: {0}")]
    Validation(String),

    /// No train with the given id exists
    #[error("train not found")]
    TrainNotFound,

    /// No booking with the given id is visible to the requester
    ///
    /// Also returned when the booking exists but belongs to someone else;
    /// lookups are ownership-scoped and do not disclose foreign bookings.
    #[error("booking not found")]
    BookingNotFound,

    /// No job with the given id was ever admitted
    #[error("job not found")]
    JobNotFound,

    /// The train had zero available seats at read time; terminal
    #[error("no seats available")]
    SoldOut,

    /// Every attempt lost its version race; the caller may resubmit
    #[error("allocation lost {attempts} consecutive version races")]
    Contended {
        /// Number of attempts made before giving up
        attempts: u32,
    },

    /// The store or queue is unavailable
    #[error("booking infrastructure unavailable: {0}")]
    Infrastructure(String),
}
