use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AvailabilityQuery, AvailabilityResponse, CreateScheduleRequest};
use crate::services::{AvailabilityService, ScheduleService};

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let availability_service = AvailabilityService::new(&state);
    let facility_ref = query.facility_ref();

    let slots = availability_service
        .get_available_slots(query.doctor_id, &facility_ref, query.date)
        .await?;

    Ok(Json(AvailabilityResponse::new(query.doctor_id, facility_ref, query.date, &slots)))
}

#[axum::debug_handler]
pub async fn list_schedules(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let templates = schedule_service.list_templates(doctor_id).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "schedules": templates,
        "total": templates.len()
    })))
}

// ==============================================================================
// PROTECTED SCHEDULE MANAGEMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // Only the doctor themselves or an admin can manage schedules
    if !user.is_self_or_admin(&doctor_id.to_string()) {
        return Err(AppError::Forbidden("Not authorized to manage this doctor's schedule".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);
    let template = schedule_service.create_template(doctor_id, request).await?;

    Ok((StatusCode::CREATED, Json(json!(template))))
}

#[axum::debug_handler]
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path((doctor_id, template_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    if !user.is_self_or_admin(&doctor_id.to_string()) {
        return Err(AppError::Forbidden("Not authorized to manage this doctor's schedule".to_string()));
    }

    let schedule_service = ScheduleService::new(&state);
    schedule_service.delete_template(doctor_id, template_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
