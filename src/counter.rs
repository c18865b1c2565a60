//! Capacity counter: current consumption derived from the delivery ledger.
//!
//! Stateless by design. Both counts run on the connection of the admitting
//! transaction, so the admission check and the subsequent insert observe the
//! same snapshot.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Number of pending deliveries booked against one timeslot.
pub fn pending_per_timeslot(conn: &Connection, timeslot_id: Uuid) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM deliveries WHERE status = 'pending' AND timeslot_id = ?1",
        params![timeslot_id.to_string()],
        |row| row.get(0),
    )
}

/// Number of pending deliveries whose timeslot starts on the given day,
/// aggregated across all timeslots on that date.
pub fn pending_per_date(conn: &Connection, date: NaiveDate) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM deliveries WHERE status = 'pending' AND slot_date = ?1",
        params![date.to_string()],
        |row| row.get(0),
    )
}
