use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Every outcome `book_delivery` / `cancel_delivery` can reject with.
///
/// Each class is a distinct variant so the routing layer can map it to a
/// status code without inspecting the message text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookingError {
    #[error("Timeslot {0} not found")]
    TimeslotNotFound(Uuid),

    #[error("Maximum business capacity ({limit}) reached for the requested timeslot {timeslot_id}")]
    TimeslotCapacityExceeded { limit: i64, timeslot_id: Uuid },

    #[error("Maximum business capacity ({limit}) reached for the requested date {date}")]
    DayCapacityExceeded { limit: i64, date: NaiveDate },

    #[error("Delivery {0} not found")]
    DeliveryNotFound(Uuid),

    /// Commit conflict that survived the retry ceiling. The caller may retry
    /// the whole request later.
    #[error("Storage temporarily unavailable, please retry")]
    Transient,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for BookingError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                Self::Transient
            }
            other => Self::Storage(other.to_string()),
        }
    }
}
