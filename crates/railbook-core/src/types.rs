use chrono::{DateTime, Utc};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// The underlying UUID
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Whether this is the all-zero UUID
            ///
            /// Gateways tend to send it when the caller left the field empty.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

id_type!(
    /// Identifier of a train (the allocatable resource)
    TrainId
);
id_type!(
    /// Identifier of an authenticated requester
    UserId
);
id_type!(
    /// Identifier of a granted seat allocation
    BookingId
);
id_type!(
    /// Identifier of an admitted booking job
    JobId
);

/// Point-in-time view of a train's seat inventory
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TrainSnapshot {
    /// The train this snapshot describes
    pub train: TrainId,
    /// Seats not yet allocated
    pub available_seats: u32,
    /// Capacity of the train, fixed at creation
    pub total_seats: u32,
    /// Version stamp of the inventory row at read time
    pub version: u64,
}

/// A granted seat, immutable once written to the ledger
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Booking {
    /// Ledger id of the allocation
    pub id: BookingId,
    /// Owner of the seat
    pub user: UserId,
    /// Train the seat belongs to
    pub train: TrainId,
    /// Seat number, in `1..=total_seats`, unique per train
    pub seat_number: u32,
    /// When the allocation was granted
    pub created_at: DateTime<Utc>,
}

/// Outcome record of an admitted booking job
///
/// Acceptance of a submission is not a success guarantee; callers poll
/// this status (or look the booking up directly) to learn the outcome.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum JobStatus {
    /// Admitted, not yet picked up by a worker (or still being processed)
    Queued,
    /// A seat was allocated
    Confirmed(BookingId),
    /// The allocation failed terminally; the queue does not retry
    Failed(crate::BookingError),
}
