use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use shared_models::scheduling::{Booking, BookingStatus, FacilityRef, ScheduleTemplate};

pub mod memory;
pub mod supabase;

pub use memory::{InMemoryBookingStore, InMemoryScheduleStore};
pub use supabase::{SupabaseBookingStore, SupabaseScheduleStore};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store error: {0}")]
    Backend(String),
}

/// Persistence for doctors' recurring weekly schedule templates.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn insert_template(&self, template: ScheduleTemplate) -> Result<ScheduleTemplate, StoreError>;

    async fn get_template(&self, template_id: Uuid) -> Result<Option<ScheduleTemplate>, StoreError>;

    /// All templates of a doctor, across facilities, ordered by weekday then start time.
    async fn templates_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<ScheduleTemplate>, StoreError>;

    /// Templates of a doctor at one facility for one weekday, ordered by start time.
    async fn templates_for_day(
        &self,
        doctor_id: Uuid,
        facility_ref: &FacilityRef,
        day_of_week: i32,
    ) -> Result<Vec<ScheduleTemplate>, StoreError>;

    /// Returns false when no template had that id.
    async fn delete_template(&self, template_id: Uuid) -> Result<bool, StoreError>;
}

/// Persistence for bookings.
///
/// Implementations must guarantee that at most one booking in an active
/// status (`pending` or `confirmed`) exists per slot key.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts the booking unless an active booking already holds its slot key,
    /// in which case `StoreError::UniqueViolation` is returned. The check and
    /// the insert happen as one atomic step.
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError>;

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Active bookings for one doctor, facility and date.
    async fn active_bookings(
        &self,
        doctor_id: Uuid,
        facility_ref: &FacilityRef,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Sets the status only if it still equals `expected`. `Ok(None)` means the
    /// booking is missing or its status changed in the meantime.
    async fn compare_and_set_status(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        new_status: BookingStatus,
    ) -> Result<Option<Booking>, StoreError>;

    async fn bookings_for_patient(&self, patient_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    async fn bookings_for_doctor(
        &self,
        doctor_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Booking>, StoreError>;
}

/// Bounds a store call; expiry surfaces as `StoreError::Unavailable`.
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Store operation '{}' timed out after {}ms", operation, limit.as_millis());
            Err(StoreError::Unavailable(format!(
                "{} timed out after {}ms",
                operation,
                limit.as_millis()
            )))
        }
    }
}
