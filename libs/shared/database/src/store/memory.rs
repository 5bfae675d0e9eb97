use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::scheduling::{
    Booking, BookingStatus, FacilityRef, ScheduleTemplate, SlotKey,
};

use super::{BookingStore, ScheduleStore, StoreError};

/// Process-local schedule store, used for development and tests.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    templates: RwLock<HashMap<Uuid, ScheduleTemplate>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_templates(templates: &mut [ScheduleTemplate]) {
    templates.sort_by(|a, b| {
        a.day_of_week
            .cmp(&b.day_of_week)
            .then(a.start_time.cmp(&b.start_time))
    });
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn insert_template(&self, template: ScheduleTemplate) -> Result<ScheduleTemplate, StoreError> {
        let mut templates = self.templates.write().await;
        if templates.contains_key(&template.id) {
            return Err(StoreError::UniqueViolation(format!("template {} already exists", template.id)));
        }
        // Same rule as the exclusion constraint on `schedule_templates`.
        if let Some(clash) = templates
            .values()
            .find(|other| other.doctor_id == template.doctor_id && other.overlaps(&template))
        {
            debug!("Template {} overlaps template {}", template.id, clash.id);
            return Err(StoreError::UniqueViolation(format!(
                "template overlaps {} on day {}",
                clash.id, clash.day_of_week
            )));
        }
        templates.insert(template.id, template.clone());
        Ok(template)
    }

    async fn get_template(&self, template_id: Uuid) -> Result<Option<ScheduleTemplate>, StoreError> {
        Ok(self.templates.read().await.get(&template_id).cloned())
    }

    async fn templates_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<ScheduleTemplate>, StoreError> {
        let mut found: Vec<ScheduleTemplate> = self
            .templates
            .read()
            .await
            .values()
            .filter(|t| t.doctor_id == doctor_id)
            .cloned()
            .collect();
        sort_templates(&mut found);
        Ok(found)
    }

    async fn templates_for_day(
        &self,
        doctor_id: Uuid,
        facility_ref: &FacilityRef,
        day_of_week: i32,
    ) -> Result<Vec<ScheduleTemplate>, StoreError> {
        let mut found: Vec<ScheduleTemplate> = self
            .templates
            .read()
            .await
            .values()
            .filter(|t| {
                t.doctor_id == doctor_id
                    && t.facility_ref == *facility_ref
                    && t.day_of_week == day_of_week
            })
            .cloned()
            .collect();
        sort_templates(&mut found);
        Ok(found)
    }

    async fn delete_template(&self, template_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.templates.write().await.remove(&template_id).is_some())
    }
}

#[derive(Default)]
struct BookingTable {
    bookings: HashMap<Uuid, Booking>,
    // slot key -> id of the booking currently holding it
    active: HashMap<SlotKey, Uuid>,
}

/// Process-local booking store. Every write runs inside one critical section
/// over both the rows and the active-slot index.
#[derive(Default)]
pub struct InMemoryBookingStore {
    table: RwLock<BookingTable>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_bookings(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| a.date.cmp(&b.date).then(a.start_time.cmp(&b.start_time)));
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError> {
        let mut table = self.table.write().await;
        let key = booking.slot_key();

        if booking.status.is_active() {
            if let Some(holder) = table.active.get(&key) {
                debug!("Slot {} already held by booking {}", key, holder);
                return Err(StoreError::UniqueViolation(format!("slot {} is already booked", key)));
            }
            table.active.insert(key, booking.id);
        }

        table.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.table.read().await.bookings.get(&booking_id).cloned())
    }

    async fn active_bookings(
        &self,
        doctor_id: Uuid,
        facility_ref: &FacilityRef,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut found: Vec<Booking> = self
            .table
            .read()
            .await
            .bookings
            .values()
            .filter(|b| {
                b.status.is_active()
                    && b.doctor_id == doctor_id
                    && b.facility_ref == *facility_ref
                    && b.date == date
            })
            .cloned()
            .collect();
        sort_bookings(&mut found);
        Ok(found)
    }

    async fn compare_and_set_status(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        new_status: BookingStatus,
    ) -> Result<Option<Booking>, StoreError> {
        let mut table = self.table.write().await;

        let (key, current) = match table.bookings.get(&booking_id) {
            Some(booking) => (booking.slot_key(), booking.status),
            None => return Ok(None),
        };
        if current != expected {
            return Ok(None);
        }

        if !current.is_active() && new_status.is_active() {
            // Re-activating must respect the same uniqueness rule as insert.
            if table.active.contains_key(&key) {
                return Err(StoreError::UniqueViolation(format!("slot {} is already booked", key)));
            }
            table.active.insert(key, booking_id);
        } else if current.is_active() && !new_status.is_active() {
            table.active.remove(&key);
        }

        let booking = match table.bookings.get_mut(&booking_id) {
            Some(booking) => booking,
            None => return Ok(None),
        };
        booking.status = new_status;
        booking.updated_at = Utc::now();
        Ok(Some(booking.clone()))
    }

    async fn bookings_for_patient(&self, patient_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let mut found: Vec<Booking> = self
            .table
            .read()
            .await
            .bookings
            .values()
            .filter(|b| b.patient_id == patient_id)
            .cloned()
            .collect();
        sort_bookings(&mut found);
        Ok(found)
    }

    async fn bookings_for_doctor(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut found: Vec<Booking> = self
            .table
            .read()
            .await
            .bookings
            .values()
            .filter(|b| b.doctor_id == doctor_id && date.map_or(true, |d| b.date == d))
            .cloned()
            .collect();
        sort_bookings(&mut found);
        Ok(found)
    }
}
