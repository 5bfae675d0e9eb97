use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_models::scheduling::{clock, FacilityRef, FacilityType};

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub facility_ref: FacilityRef,
    pub day_of_week: i32,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
    #[serde(default, with = "clock::option")]
    pub break_start: Option<NaiveTime>,
    #[serde(default, with = "clock::option")]
    pub break_end: Option<NaiveTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub doctor_id: Uuid,
    pub facility_type: FacilityType,
    pub facility_id: Uuid,
    pub date: NaiveDate,
}

impl AvailabilityQuery {
    pub fn facility_ref(&self) -> FacilityRef {
        FacilityRef { facility_type: self.facility_type, id: self.facility_id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub doctor_id: Uuid,
    pub facility_ref: FacilityRef,
    pub date: NaiveDate,
    pub available_slots: Vec<String>,
    pub total_slots: usize,
}

impl AvailabilityResponse {
    pub fn new(doctor_id: Uuid, facility_ref: FacilityRef, date: NaiveDate, slots: &[NaiveTime]) -> Self {
        Self {
            doctor_id,
            facility_ref,
            date,
            available_slots: slots.iter().map(clock::format).collect(),
            total_slots: slots.len(),
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid schedule: {0}")]
    Validation(String),

    #[error("Schedule overlaps an existing template: {0}")]
    Overlap(String),

    #[error("Schedule template not found")]
    NotFound,

    #[error("Schedule store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Schedule store error: {0}")]
    Store(String),
}

impl From<StoreError> for ScheduleError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(msg) => ScheduleError::StoreUnavailable(msg),
            StoreError::NotFound(_) => ScheduleError::NotFound,
            StoreError::UniqueViolation(msg) => ScheduleError::Overlap(msg),
            other => ScheduleError::Store(other.to_string()),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(error: ScheduleError) -> Self {
        match error {
            ScheduleError::Validation(msg) => AppError::ValidationError(msg),
            ScheduleError::Overlap(msg) => AppError::Conflict(msg),
            ScheduleError::NotFound => AppError::NotFound("Schedule template not found".to_string()),
            ScheduleError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
            ScheduleError::Store(msg) => AppError::Internal(msg),
        }
    }
}
