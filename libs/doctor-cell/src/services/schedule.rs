// libs/doctor-cell/src/services/schedule.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{with_timeout, AppState, ScheduleStore};
use shared_models::scheduling::ScheduleTemplate;

use crate::models::{CreateScheduleRequest, ScheduleError};
use crate::services::slots::validate_template;

/// Management of doctors' recurring weekly templates.
pub struct ScheduleService {
    schedules: Arc<dyn ScheduleStore>,
    timeout: Duration,
}

impl ScheduleService {
    pub fn new(state: &AppState) -> Self {
        Self::with_store(state.schedules.clone(), state.config.store_timeout())
    }

    pub fn with_store(schedules: Arc<dyn ScheduleStore>, timeout: Duration) -> Self {
        Self { schedules, timeout }
    }

    /// Create a template after checking its invariants and that it does not
    /// overlap another template of the same doctor on that weekday, at any facility.
    pub async fn create_template(
        &self,
        doctor_id: Uuid,
        request: CreateScheduleRequest,
    ) -> Result<ScheduleTemplate, ScheduleError> {
        debug!("Creating schedule template for doctor {} on day {}", doctor_id, request.day_of_week);

        let now = Utc::now();
        let template = ScheduleTemplate {
            id: Uuid::new_v4(),
            doctor_id,
            facility_ref: request.facility_ref,
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
            slot_duration_minutes: request.slot_duration_minutes,
            break_start: request.break_start,
            break_end: request.break_end,
            created_at: now,
            updated_at: now,
        };

        validate_template(&template)?;

        let existing = self.list_templates(doctor_id).await?;
        if let Some(clash) = existing.iter().find(|other| other.overlaps(&template)) {
            warn!("Template for doctor {} overlaps existing template {}", doctor_id, clash.id);
            return Err(ScheduleError::Overlap(format!(
                "doctor already works {}-{} on day {} at {}",
                clash.start_time.format("%H:%M"),
                clash.end_time.format("%H:%M"),
                clash.day_of_week,
                clash.facility_ref
            )));
        }

        let created = with_timeout(
            self.timeout,
            "insert schedule template",
            self.schedules.insert_template(template),
        )
        .await?;

        info!("Schedule template {} created for doctor {}", created.id, doctor_id);
        Ok(created)
    }

    pub async fn list_templates(&self, doctor_id: Uuid) -> Result<Vec<ScheduleTemplate>, ScheduleError> {
        let templates = with_timeout(
            self.timeout,
            "list schedule templates",
            self.schedules.templates_for_doctor(doctor_id),
        )
        .await?;
        Ok(templates)
    }

    /// Delete a template owned by `doctor_id`. Templates of other doctors are
    /// reported as not found.
    pub async fn delete_template(&self, doctor_id: Uuid, template_id: Uuid) -> Result<(), ScheduleError> {
        let template = with_timeout(
            self.timeout,
            "get schedule template",
            self.schedules.get_template(template_id),
        )
        .await?
        .filter(|t| t.doctor_id == doctor_id)
        .ok_or(ScheduleError::NotFound)?;

        let deleted = with_timeout(
            self.timeout,
            "delete schedule template",
            self.schedules.delete_template(template.id),
        )
        .await?;

        if !deleted {
            return Err(ScheduleError::NotFound);
        }

        info!("Schedule template {} deleted for doctor {}", template_id, doctor_id);
        Ok(())
    }
}
