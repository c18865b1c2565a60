use crate::error::BookingError;
use crate::ledger::DeliveryLedger;
use crate::types::Delivery;
use chrono::{Datelike, Duration, NaiveDate};
use uuid::Uuid;

/// Read side: daily and weekly delivery listings straight from the ledger.
/// Pure reads, any status, no capacity interaction.
#[derive(Clone)]
pub struct BookingQueryService {
    ledger: DeliveryLedger,
}

impl BookingQueryService {
    pub fn new(ledger: DeliveryLedger) -> Self {
        Self { ledger }
    }

    pub fn delivery(&self, id: Uuid) -> Result<Delivery, BookingError> {
        self.ledger.get(id)
    }

    pub fn daily_deliveries(&self, today: NaiveDate) -> Result<Vec<Delivery>, BookingError> {
        self.ledger.query_by_date_range(today, today)
    }

    /// Deliveries of the week containing `today`: Monday through Sunday,
    /// 7 days inclusive.
    pub fn weekly_deliveries(&self, today: NaiveDate) -> Result<Vec<Delivery>, BookingError> {
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let week_end = week_start + Duration::days(6);
        self.ledger.query_by_date_range(week_start, week_end)
    }
}
