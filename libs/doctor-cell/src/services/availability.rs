// libs/doctor-cell/src/services/availability.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use shared_database::{with_timeout, AppState, BookingStore, ScheduleStore};
use shared_models::scheduling::{day_of_week, FacilityRef, ScheduleTemplate};

use crate::models::ScheduleError;
use crate::services::slots::generate_slots;

/// Resolves bookable start times by subtracting active bookings from the
/// slots a doctor's templates offer. Read-only; safe to share and call
/// concurrently.
#[derive(Clone)]
pub struct AvailabilityService {
    schedules: Arc<dyn ScheduleStore>,
    bookings: Arc<dyn BookingStore>,
    timeout: Duration,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self::with_stores(state.schedules.clone(), state.bookings.clone(), state.config.store_timeout())
    }

    pub fn with_stores(
        schedules: Arc<dyn ScheduleStore>,
        bookings: Arc<dyn BookingStore>,
        timeout: Duration,
    ) -> Self {
        Self { schedules, bookings, timeout }
    }

    /// Calculate available start times for a doctor at a facility on a date.
    ///
    /// A date without a matching template yields an empty list.
    pub async fn get_available_slots(
        &self,
        doctor_id: Uuid,
        facility_ref: &FacilityRef,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, ScheduleError> {
        debug!("Calculating available slots for doctor {} at {} on {}", doctor_id, facility_ref, date);

        let weekday = day_of_week(date);

        // Templates and bookings are independent reads.
        let (templates, booked) = futures::try_join!(
            with_timeout(
                self.timeout,
                "load schedule templates",
                self.schedules.templates_for_day(doctor_id, facility_ref, weekday),
            ),
            with_timeout(
                self.timeout,
                "load active bookings",
                self.bookings.active_bookings(doctor_id, facility_ref, date),
            ),
        )?;

        if templates.is_empty() {
            debug!("No schedule for doctor {} at {} on weekday {}", doctor_id, facility_ref, weekday);
            return Ok(Vec::new());
        }

        let mut slots = merge_slots(&templates, date);

        let taken: HashSet<NaiveTime> = booked
            .iter()
            .filter(|booking| booking.status.is_active())
            .map(|booking| booking.start_time)
            .collect();
        slots.retain(|slot| !taken.contains(slot));

        debug!("Found {} available slots ({} booked)", slots.len(), taken.len());
        Ok(slots)
    }

    /// Start times the doctor's templates offer on `date`, booked or not.
    pub async fn scheduled_slots(
        &self,
        doctor_id: Uuid,
        facility_ref: &FacilityRef,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, ScheduleError> {
        let templates = with_timeout(
            self.timeout,
            "load schedule templates",
            self.schedules.templates_for_day(doctor_id, facility_ref, day_of_week(date)),
        )
        .await?;
        Ok(merge_slots(&templates, date))
    }

    /// Whether `start_time` is on the doctor's schedule for that date.
    pub async fn is_scheduled_slot(
        &self,
        doctor_id: Uuid,
        facility_ref: &FacilityRef,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<bool, ScheduleError> {
        let slots = self.scheduled_slots(doctor_id, facility_ref, date).await?;
        Ok(slots.binary_search(&start_time).is_ok())
    }

    /// Whether `start_time` is currently bookable for the given slot.
    pub async fn is_slot_available(
        &self,
        doctor_id: Uuid,
        facility_ref: &FacilityRef,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<bool, ScheduleError> {
        let slots = self.get_available_slots(doctor_id, facility_ref, date).await?;
        Ok(slots.binary_search(&start_time).is_ok())
    }
}

fn merge_slots(templates: &[ScheduleTemplate], date: NaiveDate) -> Vec<NaiveTime> {
    let mut slots: Vec<NaiveTime> = templates
        .iter()
        .flat_map(|template| generate_slots(template, date))
        .collect();
    slots.sort();
    slots.dedup();
    slots
}
