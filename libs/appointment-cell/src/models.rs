// libs/appointment-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::models::ScheduleError;
use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::scheduling::{clock, BookingStatus, FacilityRef, SlotKey};

/// Longest free-text reason accepted on a booking.
pub const MAX_REASON_LENGTH: usize = 1000;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub doctor_id: Uuid,
    pub facility_ref: FacilityRef,
    pub date: NaiveDate,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(default)]
    pub reason: Option<String>,
}

impl CreateBookingRequest {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            doctor_id: self.doctor_id,
            facility_ref: self.facility_ref,
            date: self.date,
            start_time: self.start_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    pub date: Option<NaiveDate>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("Slot {0} is not available")]
    SlotUnavailable(String),

    #[error("Slot {0} was booked by another request")]
    SlotConflict(String),

    #[error("Booking cannot move from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    #[error("Booking not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Booking store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Booking store error: {0}")]
    Store(String),
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(msg) => BookingError::StoreUnavailable(msg),
            StoreError::UniqueViolation(msg) => BookingError::SlotConflict(msg),
            StoreError::NotFound(_) => BookingError::NotFound,
            other => BookingError::Store(other.to_string()),
        }
    }
}

impl From<ScheduleError> for BookingError {
    fn from(error: ScheduleError) -> Self {
        match error {
            ScheduleError::StoreUnavailable(msg) => BookingError::StoreUnavailable(msg),
            ScheduleError::Validation(msg) => BookingError::ValidationError(msg),
            other => BookingError::Store(other.to_string()),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(error: BookingError) -> Self {
        match error {
            BookingError::SlotUnavailable(_) => AppError::SlotUnavailable(error.to_string()),
            BookingError::SlotConflict(_) => AppError::SlotConflict(error.to_string()),
            BookingError::InvalidTransition { .. } => AppError::InvalidTransition(error.to_string()),
            BookingError::NotFound => AppError::NotFound("Booking not found".to_string()),
            BookingError::ValidationError(msg) => AppError::ValidationError(msg),
            BookingError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
            BookingError::Store(msg) => AppError::Internal(msg),
        }
    }
}
