use crate::catalog::TimeslotCatalog;
use crate::error::BookingError;
use crate::ledger::DeliveryLedger;
use crate::types::Delivery;
use tracing::{debug, warn};
use uuid::Uuid;

pub const MAX_DELIVERIES_PER_TIMESLOT: i64 = 2;
pub const MAX_DELIVERIES_PER_DAY: i64 = 10;

/// Attempts per admission before the commit conflict is surfaced as
/// [`BookingError::Transient`].
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Only transient commit conflicts are retried, and only while the attempt
/// ceiling has not been reached; every other rejection surfaces immediately.
fn should_retry(err: &BookingError, attempt: u32) -> bool {
    matches!(err, BookingError::Transient) && attempt < MAX_COMMIT_ATTEMPTS
}

/// Gatekeeper for new bookings. Resolves the timeslot, then delegates the
/// serialized check-and-commit to the ledger, retrying transient commit
/// failures a bounded number of times.
#[derive(Clone)]
pub struct AdmissionController<C: TimeslotCatalog> {
    catalog: C,
    ledger: DeliveryLedger,
}

impl<C: TimeslotCatalog> AdmissionController<C> {
    pub fn new(catalog: C, ledger: DeliveryLedger) -> Self {
        Self { catalog, ledger }
    }

    pub fn book_delivery(&self, user_id: &str, timeslot_id: Uuid) -> Result<Delivery, BookingError> {
        let timeslot = self
            .catalog
            .resolve(timeslot_id)
            .ok_or(BookingError::TimeslotNotFound(timeslot_id))?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.ledger.admit(
                user_id,
                &timeslot,
                MAX_DELIVERIES_PER_TIMESLOT,
                MAX_DELIVERIES_PER_DAY,
            ) {
                Ok(delivery) => {
                    debug!(delivery_id = %delivery.id, timeslot_id = %timeslot_id, "delivery booked");
                    return Ok(delivery);
                }
                Err(err) if should_retry(&err, attempt) => {
                    warn!(%timeslot_id, attempt, "commit conflict, retrying admission");
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn cancel_delivery(&self, delivery_id: Uuid) -> Result<Delivery, BookingError> {
        let delivery = self.ledger.cancel(delivery_id)?;
        debug!(%delivery_id, "delivery cancelled");
        Ok(delivery)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::LocalCatalog;
    use chrono::{Duration, TimeZone, Utc};
    use std::thread;

    fn controller_with_catalog() -> (AdmissionController<LocalCatalog>, LocalCatalog) {
        let catalog = LocalCatalog::default();
        let ledger = DeliveryLedger::open_in_memory().unwrap();
        (AdmissionController::new(catalog.clone(), ledger), catalog)
    }

    #[test]
    fn only_transient_failures_are_retried_up_to_the_ceiling() {
        assert!(should_retry(&BookingError::Transient, 1));
        assert!(should_retry(&BookingError::Transient, MAX_COMMIT_ATTEMPTS - 1));
        assert!(!should_retry(&BookingError::Transient, MAX_COMMIT_ATTEMPTS));

        let timeslot_id = Uuid::new_v4();
        assert!(!should_retry(
            &BookingError::TimeslotCapacityExceeded {
                limit: 2,
                timeslot_id,
            },
            1
        ));
        assert!(!should_retry(&BookingError::TimeslotNotFound(timeslot_id), 1));
        assert!(!should_retry(&BookingError::Storage("disk error".into()), 1));
    }

    #[test]
    fn booking_unknown_timeslot_is_rejected() {
        let (controller, _catalog) = controller_with_catalog();
        let timeslot_id = Uuid::new_v4();
        assert_eq!(
            controller.book_delivery("user-a", timeslot_id),
            Err(BookingError::TimeslotNotFound(timeslot_id))
        );
    }

    #[test]
    fn timeslot_fills_at_two_and_cancellation_frees_a_unit() {
        let (controller, catalog) = controller_with_catalog();
        let timeslot_id = catalog.add_timeslot("10115", Utc::now() + Duration::days(1));

        let delivery_a = controller.book_delivery("user-a", timeslot_id).unwrap();
        controller.book_delivery("user-b", timeslot_id).unwrap();
        assert_eq!(
            controller.book_delivery("user-c", timeslot_id),
            Err(BookingError::TimeslotCapacityExceeded {
                limit: 2,
                timeslot_id,
            })
        );

        controller.cancel_delivery(delivery_a.id).unwrap();
        controller.book_delivery("user-d", timeslot_id).unwrap();
    }

    #[test]
    fn day_fills_at_ten_across_timeslots() {
        let (controller, catalog) = controller_with_catalog();
        let day_start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

        // One booking in each of 10 timeslots; no single timeslot is full.
        let mut timeslot_ids = Vec::new();
        for hour in 0..10 {
            let timeslot_id =
                catalog.add_timeslot("10115", day_start + Duration::hours(hour));
            controller
                .book_delivery(&format!("user-{hour}"), timeslot_id)
                .unwrap();
            timeslot_ids.push(timeslot_id);
        }

        assert_eq!(
            controller.book_delivery("user-x", timeslot_ids[0]),
            Err(BookingError::DayCapacityExceeded {
                limit: 10,
                date: day_start.date_naive(),
            })
        );

        // A timeslot on another day is unaffected.
        let other_day = catalog.add_timeslot("10115", day_start + Duration::days(1));
        controller.book_delivery("user-y", other_day).unwrap();
    }

    #[test]
    fn timeslot_rejection_wins_over_day_rejection() {
        let (controller, catalog) = controller_with_catalog();
        let day_start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

        // Fill the day: 5 timeslots, 2 bookings each.
        let mut timeslot_ids = Vec::new();
        for hour in 0..5 {
            let timeslot_id =
                catalog.add_timeslot("10115", day_start + Duration::hours(hour));
            controller
                .book_delivery(&format!("user-{hour}-a"), timeslot_id)
                .unwrap();
            controller
                .book_delivery(&format!("user-{hour}-b"), timeslot_id)
                .unwrap();
            timeslot_ids.push(timeslot_id);
        }

        // Both limits are exhausted; the timeslot one must be reported.
        assert_eq!(
            controller.book_delivery("user-x", timeslot_ids[0]),
            Err(BookingError::TimeslotCapacityExceeded {
                limit: 2,
                timeslot_id: timeslot_ids[0],
            })
        );
    }

    #[test]
    fn concurrent_bookings_never_exceed_timeslot_capacity() {
        const BOOKERS: usize = 8;

        let (controller, catalog) = controller_with_catalog();
        let timeslot_id = catalog.add_timeslot("10115", Utc::now() + Duration::days(1));

        let handles: Vec<_> = (0..BOOKERS)
            .map(|i| {
                let controller = controller.clone();
                thread::spawn(move || controller.book_delivery(&format!("user-{i}"), timeslot_id))
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let accepted = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(accepted, 2);
        for result in results {
            if let Err(err) = result {
                assert_eq!(
                    err,
                    BookingError::TimeslotCapacityExceeded {
                        limit: 2,
                        timeslot_id,
                    }
                );
            }
        }
    }

    #[test]
    fn concurrent_bookings_never_exceed_day_capacity() {
        const BOOKERS_PER_TIMESLOT: usize = 2;

        let (controller, catalog) = controller_with_catalog();
        let day_start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

        // 7 timeslots x 2 bookers = 14 attempts against a day cap of 10.
        let mut handles = Vec::new();
        for hour in 0..7 {
            let timeslot_id =
                catalog.add_timeslot("10115", day_start + Duration::hours(hour));
            for i in 0..BOOKERS_PER_TIMESLOT {
                let controller = controller.clone();
                handles.push(thread::spawn(move || {
                    controller.book_delivery(&format!("user-{hour}-{i}"), timeslot_id)
                }));
            }
        }
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let accepted = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(accepted, 10);
        for result in results {
            if let Err(err) = result {
                assert_eq!(
                    err,
                    BookingError::DayCapacityExceeded {
                        limit: 10,
                        date: day_start.date_naive(),
                    }
                );
            }
        }
    }
}
