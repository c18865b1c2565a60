use crate::counter;
use crate::error::BookingError;
use crate::types::{Delivery, DeliveryStatus, Timeslot};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

/// Durable store of delivery records.
///
/// A single SQLite connection sits behind the mutex, so every write is
/// serialized in-process and the admit path can wrap its capacity checks and
/// insert in one IMMEDIATE transaction. Timestamps are stored as RFC 3339
/// text, uuids as text; `slot_date` carries the UTC day of the timeslot's
/// start so day aggregation is a plain column match.
#[derive(Clone)]
pub struct DeliveryLedger {
    conn: Arc<Mutex<Connection>>,
}

struct RawDelivery {
    id: String,
    user_id: String,
    timeslot_id: String,
    status: String,
    slot_start: String,
    created_at: String,
}

fn read_raw(row: &Row) -> rusqlite::Result<RawDelivery> {
    Ok(RawDelivery {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        timeslot_id: row.get("timeslot_id")?,
        status: row.get("status")?,
        slot_start: row.get("slot_start")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, BookingError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| BookingError::Storage(format!("invalid {column} timestamp {value}: {err}")))
}

fn parse_uuid(value: &str, column: &str) -> Result<Uuid, BookingError> {
    Uuid::parse_str(value)
        .map_err(|err| BookingError::Storage(format!("invalid {column} uuid {value}: {err}")))
}

impl TryFrom<RawDelivery> for Delivery {
    type Error = BookingError;

    fn try_from(raw: RawDelivery) -> Result<Self, BookingError> {
        let status = DeliveryStatus::parse(&raw.status)
            .ok_or_else(|| BookingError::Storage(format!("invalid status {}", raw.status)))?;
        Ok(Self {
            id: parse_uuid(&raw.id, "id")?,
            user_id: raw.user_id,
            timeslot_id: parse_uuid(&raw.timeslot_id, "timeslot_id")?,
            status,
            slot_start: parse_timestamp(&raw.slot_start, "slot_start")?,
            created_at: parse_timestamp(&raw.created_at, "created_at")?,
        })
    }
}

impl DeliveryLedger {
    pub fn open(path: &Path) -> Result<Self, BookingError> {
        let conn = Connection::open(path)?;
        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        ledger.init()?;
        Ok(ledger)
    }

    /// In-memory ledger, gone when the last handle drops. Used by tests and
    /// as the fallback when no database path is configured.
    pub fn open_in_memory() -> Result<Self, BookingError> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        ledger.init()?;
        Ok(ledger)
    }

    // Idempotent, runs on every open.
    fn init(&self) -> Result<(), BookingError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS deliveries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                timeslot_id TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('pending', 'cancelled')),
                slot_start TEXT NOT NULL,
                slot_date TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_deliveries_timeslot
                ON deliveries (status, timeslot_id);
            CREATE INDEX IF NOT EXISTS idx_deliveries_date
                ON deliveries (status, slot_date);
            ",
        )?;
        Ok(())
    }

    /// Check both capacity limits and insert the new pending delivery as one
    /// unit of work.
    ///
    /// The IMMEDIATE transaction takes the write lock before the counts are
    /// read, so two concurrent admissions for the same timeslot or day can
    /// never both observe pre-increment counts. Timeslot capacity is checked
    /// first; when both limits are exhausted the timeslot rejection wins.
    pub fn admit(
        &self,
        user_id: &str,
        timeslot: &Timeslot,
        per_timeslot_limit: i64,
        per_day_limit: i64,
    ) -> Result<Delivery, BookingError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let slot_date = timeslot.start_time.date_naive();
        if counter::pending_per_timeslot(&tx, timeslot.id)? >= per_timeslot_limit {
            return Err(BookingError::TimeslotCapacityExceeded {
                limit: per_timeslot_limit,
                timeslot_id: timeslot.id,
            });
        }
        if counter::pending_per_date(&tx, slot_date)? >= per_day_limit {
            return Err(BookingError::DayCapacityExceeded {
                limit: per_day_limit,
                date: slot_date,
            });
        }

        let delivery = Delivery {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            timeslot_id: timeslot.id,
            status: DeliveryStatus::Pending,
            slot_start: timeslot.start_time,
            created_at: Utc::now(),
        };
        tx.execute(
            "INSERT INTO deliveries (id, user_id, timeslot_id, status, slot_start, slot_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                delivery.id.to_string(),
                delivery.user_id,
                delivery.timeslot_id.to_string(),
                delivery.status.as_str(),
                delivery.slot_start.to_rfc3339(),
                slot_date.to_string(),
                delivery.created_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(delivery)
    }

    pub fn get(&self, id: Uuid) -> Result<Delivery, BookingError> {
        let conn = self.conn.lock().unwrap();
        Self::fetch(&conn, id)
    }

    fn fetch(conn: &Connection, id: Uuid) -> Result<Delivery, BookingError> {
        let raw = conn
            .query_row(
                "SELECT id, user_id, timeslot_id, status, slot_start, created_at
                 FROM deliveries WHERE id = ?1",
                params![id.to_string()],
                read_raw,
            )
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => BookingError::DeliveryNotFound(id),
                other => other.into(),
            })?;
        raw.try_into()
    }

    /// Mark a delivery cancelled. A single UPDATE, no capacity interaction;
    /// the freed unit shows up on the next admission's count. Cancelling an
    /// already-cancelled delivery is a silent success.
    pub fn cancel(&self, id: Uuid) -> Result<Delivery, BookingError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE deliveries SET status = 'cancelled' WHERE id = ?1",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(BookingError::DeliveryNotFound(id));
        }
        Self::fetch(&conn, id)
    }

    /// Deliveries of any status whose timeslot day falls within the inclusive
    /// range, ordered by slot start (id as tiebreak for stable output).
    pub fn query_by_date_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Delivery>, BookingError> {
        let conn = self.conn.lock().unwrap();
        let mut statement = conn.prepare(
            "SELECT id, user_id, timeslot_id, status, slot_start, created_at
             FROM deliveries
             WHERE slot_date BETWEEN ?1 AND ?2
             ORDER BY slot_start ASC, id ASC",
        )?;
        let rows = statement.query_map(
            params![start_date.to_string(), end_date.to_string()],
            read_raw,
        )?;

        let mut deliveries = Vec::new();
        for raw in rows {
            deliveries.push(raw?.try_into()?);
        }
        Ok(deliveries)
    }
}
