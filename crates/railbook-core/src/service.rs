use crate::{Booking, BookingError, BookingId, JobId, JobStatus, TrainId, TrainSnapshot, UserId};

/// Interface of the seat allocation core, as seen by the gateway
///
/// The implementor owns the worker threads of the booking queue; all
/// methods may be called concurrently from different gateway threads.
pub trait BookingService {
    /// Admit a booking request for `train` on behalf of `user`
    ///
    /// Returns as soon as the request is queued. The returned job id is a
    /// claim check, not a seat: the actual outcome must be discovered
    /// later via [`Self::booking_status`] or [`Self::booking`].
    fn submit_booking(&self, train: TrainId, user: UserId) -> Result<JobId, BookingError>;

    /// Look up the outcome of a previously admitted job
    fn booking_status(&self, job: JobId) -> Result<JobStatus, BookingError>;

    /// Look up a booking by id, scoped to its owner
    ///
    /// A booking owned by a different user is reported as
    /// [`BookingError::BookingNotFound`].
    fn booking(&self, booking: BookingId, user: UserId) -> Result<Booking, BookingError>;

    /// Read the current seat availability of a train
    fn seat_availability(&self, train: TrainId) -> Result<TrainSnapshot, BookingError>;

    /// Create a train with `total_seats` seats, all initially available
    ///
    /// Admin operation; identity and role checks happen outside the core.
    fn add_train(&self, total_seats: u32) -> Result<TrainId, BookingError>;

    /// Shut the system down
    ///
    /// Jobs admitted before the call still run to a terminal outcome;
    /// this method waits for all queue worker threads to terminate.
    fn shutdown(self);
}
