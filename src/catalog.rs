use crate::types::Timeslot;
use chrono::{DateTime, Duration, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

/// Read-only view of the timeslot catalog. Timeslot records are owned
/// externally; the booking core only resolves and lists them.
pub trait TimeslotCatalog: Clone + Send + Sync + 'static {
    fn resolve(&self, id: Uuid) -> Option<Timeslot>;
    fn by_postcode(&self, postcode: &str) -> Vec<Timeslot>;
}

/// In-process catalog used as the stand-in for the external timeslot owner.
#[derive(Debug, Clone, Default)]
pub struct LocalCatalog {
    timeslots: Arc<Mutex<HashMap<Uuid, Timeslot>>>,
}

impl LocalCatalog {
    pub fn add_timeslot(&self, postcode: &str, start_time: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        let mut timeslots = self.timeslots.lock().unwrap();
        timeslots.insert(
            id,
            Timeslot {
                id,
                postcode: postcode.into(),
                start_time,
                end_time: start_time + Duration::hours(2),
            },
        );
        id
    }

    pub fn insert_example_timeslots(&self) {
        const NUMBER_OF_EXAMPLES: i64 = 5;
        for i in 1..=NUMBER_OF_EXAMPLES {
            let start_time = Utc::now() + Duration::days(i);
            self.add_timeslot("10115", start_time);
        }
    }
}

impl TimeslotCatalog for LocalCatalog {
    fn resolve(&self, id: Uuid) -> Option<Timeslot> {
        self.timeslots.lock().unwrap().get(&id).cloned()
    }

    fn by_postcode(&self, postcode: &str) -> Vec<Timeslot> {
        let mut timeslots: Vec<Timeslot> = self
            .timeslots
            .lock()
            .unwrap()
            .values()
            .filter(|timeslot| timeslot.postcode == postcode)
            .cloned()
            .collect();
        timeslots.sort_by_key(|timeslot| timeslot.start_time);
        timeslots
    }
}
