use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_models::scheduling::{
    Booking, BookingStatus, FacilityRef, FacilityType, ScheduleTemplate,
};

use super::{BookingStore, ScheduleStore, StoreError};
use crate::supabase::SupabaseClient;

const TEMPLATES_PATH: &str = "/rest/v1/schedule_templates";
const BOOKINGS_PATH: &str = "/rest/v1/bookings";

// Row shapes mirror the table columns; facility refs are flattened and
// clock times use the database's `HH:MM:SS` form.

#[derive(Debug, Serialize, Deserialize)]
struct ScheduleTemplateRow {
    id: Uuid,
    doctor_id: Uuid,
    facility_type: FacilityType,
    facility_id: Uuid,
    day_of_week: i32,
    start_time: NaiveTime,
    end_time: NaiveTime,
    slot_duration_minutes: i32,
    break_start: Option<NaiveTime>,
    break_end: Option<NaiveTime>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ScheduleTemplateRow> for ScheduleTemplate {
    fn from(row: ScheduleTemplateRow) -> Self {
        Self {
            id: row.id,
            doctor_id: row.doctor_id,
            facility_ref: FacilityRef { facility_type: row.facility_type, id: row.facility_id },
            day_of_week: row.day_of_week,
            start_time: row.start_time,
            end_time: row.end_time,
            slot_duration_minutes: row.slot_duration_minutes,
            break_start: row.break_start,
            break_end: row.break_end,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&ScheduleTemplate> for ScheduleTemplateRow {
    fn from(template: &ScheduleTemplate) -> Self {
        Self {
            id: template.id,
            doctor_id: template.doctor_id,
            facility_type: template.facility_ref.facility_type,
            facility_id: template.facility_ref.id,
            day_of_week: template.day_of_week,
            start_time: template.start_time,
            end_time: template.end_time,
            slot_duration_minutes: template.slot_duration_minutes,
            break_start: template.break_start,
            break_end: template.break_end,
            created_at: template.created_at,
            updated_at: template.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BookingRow {
    id: Uuid,
    doctor_id: Uuid,
    facility_type: FacilityType,
    facility_id: Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    patient_id: Uuid,
    reason: Option<String>,
    status: BookingStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            doctor_id: row.doctor_id,
            facility_ref: FacilityRef { facility_type: row.facility_type, id: row.facility_id },
            date: row.date,
            start_time: row.start_time,
            patient_id: row.patient_id,
            reason: row.reason,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Booking> for BookingRow {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            doctor_id: booking.doctor_id,
            facility_type: booking.facility_ref.facility_type,
            facility_id: booking.facility_ref.id,
            date: booking.date,
            start_time: booking.start_time,
            patient_id: booking.patient_id,
            reason: booking.reason.clone(),
            status: booking.status,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

fn to_body<T: Serialize>(row: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(row).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn facility_filter(facility_ref: &FacilityRef) -> String {
    format!("facility_type=eq.{}&facility_id=eq.{}", facility_ref.facility_type, facility_ref.id)
}

/// Schedule templates in the `schedule_templates` table.
///
/// Overlap between a doctor's templates on one weekday is excluded by a
/// constraint on `(doctor_id WITH =, day_of_week WITH =,
/// tsrange('2000-01-01'::date + start_time, '2000-01-01'::date + end_time) WITH &&)`
/// (btree_gist); PostgREST reports the violation as 409.
pub struct SupabaseScheduleStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseScheduleStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<ScheduleTemplate>, StoreError> {
        let rows: Vec<ScheduleTemplateRow> = self.supabase.request(Method::GET, path, None).await?;
        Ok(rows.into_iter().map(ScheduleTemplate::from).collect())
    }
}

#[async_trait]
impl ScheduleStore for SupabaseScheduleStore {
    async fn insert_template(&self, template: ScheduleTemplate) -> Result<ScheduleTemplate, StoreError> {
        let body = to_body(&ScheduleTemplateRow::from(&template))?;
        let rows: Vec<ScheduleTemplateRow> = self
            .supabase
            .request_with_headers(
                Method::POST,
                TEMPLATES_PATH,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        rows.into_iter()
            .next()
            .map(ScheduleTemplate::from)
            .ok_or_else(|| StoreError::Backend("Failed to create schedule template".to_string()))
    }

    async fn get_template(&self, template_id: Uuid) -> Result<Option<ScheduleTemplate>, StoreError> {
        let path = format!("{}?id=eq.{}", TEMPLATES_PATH, template_id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn templates_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<ScheduleTemplate>, StoreError> {
        let path = format!(
            "{}?doctor_id=eq.{}&order=day_of_week.asc,start_time.asc",
            TEMPLATES_PATH, doctor_id
        );
        self.fetch(&path).await
    }

    async fn templates_for_day(
        &self,
        doctor_id: Uuid,
        facility_ref: &FacilityRef,
        day_of_week: i32,
    ) -> Result<Vec<ScheduleTemplate>, StoreError> {
        let path = format!(
            "{}?doctor_id=eq.{}&{}&day_of_week=eq.{}&order=start_time.asc",
            TEMPLATES_PATH,
            doctor_id,
            facility_filter(facility_ref),
            day_of_week
        );
        self.fetch(&path).await
    }

    async fn delete_template(&self, template_id: Uuid) -> Result<bool, StoreError> {
        let path = format!("{}?id=eq.{}", TEMPLATES_PATH, template_id);
        let deleted: Vec<ScheduleTemplateRow> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(SupabaseClient::return_representation()),
            )
            .await?;
        Ok(!deleted.is_empty())
    }
}

/// Bookings in the `bookings` table.
///
/// Slot uniqueness relies on a partial unique index over
/// `(doctor_id, facility_type, facility_id, date, start_time)` restricted to
/// `status in ('pending', 'confirmed')`; PostgREST reports violations as 409.
pub struct SupabaseBookingStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseBookingStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = self.supabase.request(Method::GET, path, None).await?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }
}

#[async_trait]
impl BookingStore for SupabaseBookingStore {
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError> {
        let body = to_body(&BookingRow::from(&booking))?;
        let rows: Vec<BookingRow> = self
            .supabase
            .request_with_headers(
                Method::POST,
                BOOKINGS_PATH,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        rows.into_iter()
            .next()
            .map(Booking::from)
            .ok_or_else(|| StoreError::Backend("Failed to create booking".to_string()))
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let path = format!("{}?id=eq.{}", BOOKINGS_PATH, booking_id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn active_bookings(
        &self,
        doctor_id: Uuid,
        facility_ref: &FacilityRef,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let path = format!(
            "{}?doctor_id=eq.{}&{}&date=eq.{}&status=in.(pending,confirmed)&order=start_time.asc",
            BOOKINGS_PATH,
            doctor_id,
            facility_filter(facility_ref),
            date
        );
        self.fetch(&path).await
    }

    async fn compare_and_set_status(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        new_status: BookingStatus,
    ) -> Result<Option<Booking>, StoreError> {
        debug!("Updating booking {} status {} -> {}", booking_id, expected, new_status);

        let path = format!("{}?id=eq.{}&status=eq.{}", BOOKINGS_PATH, booking_id, expected);
        let body = json!({
            "status": new_status,
            "updated_at": Utc::now().to_rfc3339()
        });

        let rows: Vec<BookingRow> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        Ok(rows.into_iter().next().map(Booking::from))
    }

    async fn bookings_for_patient(&self, patient_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let path = format!(
            "{}?patient_id=eq.{}&order=date.asc,start_time.asc",
            BOOKINGS_PATH, patient_id
        );
        self.fetch(&path).await
    }

    async fn bookings_for_doctor(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut path = format!("{}?doctor_id=eq.{}", BOOKINGS_PATH, doctor_id);
        if let Some(date) = date {
            path.push_str(&format!("&date=eq.{}", date));
        }
        path.push_str("&order=date.asc,start_time.asc");
        self.fetch(&path).await
    }
}
